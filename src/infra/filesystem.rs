//! Filesystem operations
//!
//! Thin wrappers over `std::fs` that attach the offending path to errors.

use std::path::{Path, PathBuf};

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory and all its contents
pub fn remove_dir_all(path: &Path) -> Result<(), FilesystemError> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| FilesystemError::RemoveDir {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Remove a file or symlink if present
pub fn remove_file(path: &Path) -> Result<(), FilesystemError> {
    if path.symlink_metadata().is_ok() {
        std::fs::remove_file(path).map_err(|e| FilesystemError::Operation {
            operation: "remove",
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    write_bytes(path, content.as_bytes())
}

/// Write raw bytes to a file
pub fn write_bytes(path: &Path, content: &[u8]) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Read content from a file
pub fn read_file(path: &Path) -> Result<String, FilesystemError> {
    std::fs::read_to_string(path).map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Read raw bytes from a file
pub fn read_bytes(path: &Path) -> Result<Vec<u8>, FilesystemError> {
    std::fs::read(path).map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Check whether a directory has no entries (a missing directory counts as empty)
pub fn is_empty_dir(path: &Path) -> Result<bool, FilesystemError> {
    match std::fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(FilesystemError::Operation {
            operation: "list",
            path: path.to_path_buf(),
            error: e.to_string(),
        }),
    }
}

/// Entries of a directory, sorted by path
pub fn list_dir(path: &Path) -> Result<Vec<PathBuf>, FilesystemError> {
    let op_error = |e: std::io::Error| FilesystemError::Operation {
        operation: "list",
        path: path.to_path_buf(),
        error: e.to_string(),
    };
    let mut entries = std::fs::read_dir(path)
        .map_err(op_error)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(op_error)?;
    entries.sort();
    Ok(entries)
}

/// Move a file or directory
pub fn rename(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    std::fs::rename(from, to).map_err(|e| FilesystemError::Operation {
        operation: "move",
        path: from.to_path_buf(),
        error: format!("to {}: {e}", to.display()),
    })
}

/// Copy a single file, preserving permissions
pub fn copy_file(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| FilesystemError::Operation {
            operation: "copy",
            path: from.to_path_buf(),
            error: format!("to {}: {e}", to.display()),
        })
}

/// Create (or replace) a symbolic link at `link` pointing to `target`
#[cfg(unix)]
pub fn symlink(target: &Path, link: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = link.parent() {
        create_dir_all(parent)?;
    }
    remove_file(link)?;
    std::os::unix::fs::symlink(target, link).map_err(|e| FilesystemError::Operation {
        operation: "symlink",
        path: link.to_path_buf(),
        error: e.to_string(),
    })
}

/// Mark a file executable by everyone who can read it
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<(), FilesystemError> {
    use std::os::unix::fs::PermissionsExt;

    let op_error = |e: std::io::Error| FilesystemError::Operation {
        operation: "chmod",
        path: path.to_path_buf(),
        error: e.to_string(),
    };
    let mut perms = std::fs::metadata(path).map_err(op_error)?.permissions();
    let mode = perms.mode();
    perms.set_mode(mode | ((mode & 0o444) >> 2));
    std::fs::set_permissions(path, perms).map_err(op_error)
}

/// Write an executable script
#[cfg(unix)]
pub fn write_executable(path: &Path, content: &str) -> Result<(), FilesystemError> {
    write_file(path, content)?;
    make_executable(path)
}
