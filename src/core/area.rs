//! Development area layout
//!
//! ```text
//! <base>/
//! ├── srcs/                  package sources and the generated CMakeLists.txt
//! ├── build/                 superbuild binary tree, build/<pkg> per package
//! ├── install/               install prefixes, install/<pkg> per package
//! ├── tmp/                   superbuild stamp and scratch directories
//! └── spackdev-aux/
//!     ├── packages.sd        requested / additional / external package lists
//!     ├── specs/             one graph fragment per package
//!     ├── bin/               links to build tools from the graph
//!     ├── env/               area environment (env.txt, env.sh, env.bin)
//!     ├── tmp/               package manager stage directories
//!     └── packages/<pkg>/    per-package bin/ wrappers and env/
//! ```

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, PartialStateError, SpackdevError};
use crate::infra::filesystem;

/// Auxiliary directory name
pub const AUX_DIR: &str = "spackdev-aux";
/// Environment variable naming the current area
pub const ENV_BASE: &str = "SPACKDEV_BASE";
/// Prefix shared by all variables owned by spackdev
pub const ENV_PREFIX: &str = "SPACKDEV_";

/// Paths of a development area rooted at `base`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaLayout {
    base: PathBuf,
}

impl AreaLayout {
    /// Layout rooted at `base` (no filesystem access)
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Area root
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Source tree
    pub fn srcs_dir(&self) -> PathBuf {
        self.base.join("srcs")
    }

    /// Sources of one package
    pub fn package_src_dir(&self, package: &str) -> PathBuf {
        self.srcs_dir().join(package)
    }

    /// Generated superbuild description
    pub fn cmakelists_path(&self) -> PathBuf {
        self.srcs_dir().join("CMakeLists.txt")
    }

    /// Superbuild binary tree
    pub fn build_dir(&self) -> PathBuf {
        self.base.join("build")
    }

    /// Build directory of one package
    pub fn package_build_dir(&self, package: &str) -> PathBuf {
        self.build_dir().join(package)
    }

    /// Install prefixes
    pub fn install_dir(&self) -> PathBuf {
        self.base.join("install")
    }

    /// Superbuild scratch directory
    pub fn tmp_dir(&self) -> PathBuf {
        self.base.join("tmp")
    }

    /// Auxiliary directory
    pub fn aux_dir(&self) -> PathBuf {
        self.base.join(AUX_DIR)
    }

    /// Persisted package lists
    pub fn packages_file(&self) -> PathBuf {
        self.aux_dir().join("packages.sd")
    }

    /// Graph fragments
    pub fn specs_dir(&self) -> PathBuf {
        self.aux_dir().join("specs")
    }

    /// Links to build tools
    pub fn aux_bin_dir(&self) -> PathBuf {
        self.aux_dir().join("bin")
    }

    /// Area environment artifacts
    pub fn aux_env_dir(&self) -> PathBuf {
        self.aux_dir().join("env")
    }

    /// Script users source to enter the area
    pub fn env_script(&self) -> PathBuf {
        self.aux_env_dir().join(crate::core::environment::ENV_SHELL_FILE)
    }

    /// Package manager stage root
    pub fn stage_root(&self) -> PathBuf {
        self.aux_dir().join("tmp")
    }

    /// Stage directory of one package
    pub fn package_stage_dir(&self, package: &str) -> PathBuf {
        self.stage_root().join(package)
    }

    /// Per-package auxiliary directories
    pub fn aux_packages_dir(&self) -> PathBuf {
        self.aux_dir().join("packages")
    }

    /// Command shims of one package
    pub fn package_bin_dir(&self, package: &str) -> PathBuf {
        self.aux_packages_dir().join(package).join("bin")
    }

    /// Environment artifacts of one package
    pub fn package_env_dir(&self, package: &str) -> PathBuf {
        self.aux_packages_dir().join(package).join("env")
    }

    /// Check for the auxiliary directory
    pub fn exists(&self) -> bool {
        self.aux_dir().is_dir()
    }

    /// Locate an area
    ///
    /// An explicit path must itself be an area. Otherwise `env_base` (the
    /// value of `SPACKDEV_BASE`) wins, and failing that `cwd` and its parents
    /// are searched for an auxiliary directory.
    pub fn locate(
        explicit: Option<&Path>,
        env_base: Option<&Path>,
        cwd: &Path,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let layout = Self::new(absolute(path, cwd));
            return if layout.exists() {
                Ok(layout)
            } else {
                Err(ConfigError::AreaNotFound {
                    path: Some(path.to_path_buf()),
                })
            };
        }

        if let Some(base) = env_base {
            let layout = Self::new(absolute(base, cwd));
            if layout.exists() {
                return Ok(layout);
            }
            tracing::warn!("{ENV_BASE}={} is not a development area", base.display());
        }

        cwd.ancestors()
            .map(Self::new)
            .find(Self::exists)
            .ok_or(ConfigError::AreaNotFound { path: None })
    }

    /// Locate an area from the process environment and working directory
    pub fn discover(explicit: Option<&Path>) -> Result<Self, SpackdevError> {
        let cwd = std::env::current_dir().map_err(|e| crate::error::FilesystemError::Operation {
            operation: "resolve",
            path: PathBuf::from("."),
            error: e.to_string(),
        })?;
        let env_base = std::env::var_os(ENV_BASE).map(PathBuf::from);
        Ok(Self::locate(explicit, env_base.as_deref(), &cwd)?)
    }
}

fn absolute(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// How an area is prepared for initialization
#[derive(Debug, Clone, Default)]
pub struct PrepareOptions {
    /// Requested base directory (defaults to the working directory)
    pub base_dir: Option<PathBuf>,
    /// Accept non-empty directories, clearing previous area state
    pub force: bool,
    /// Continue an interrupted initialization
    pub resume: bool,
}

/// Create or reuse the area directory according to `options`
///
/// `ambient_base` is the `SPACKDEV_BASE` value already in the environment,
/// if any; initialization from inside an area requires `force`.
pub fn prepare_area(
    options: &PrepareOptions,
    ambient_base: Option<&str>,
    cwd: &Path,
) -> Result<AreaLayout, SpackdevError> {
    if let Some(existing) = ambient_base {
        if options.force {
            tracing::info!("(force) ignoring {ENV_PREFIX}* variables from the current environment");
        } else {
            return Err(ConfigError::AlreadyInArea {
                base: existing.to_string(),
            }
            .into());
        }
    }

    let base = match &options.base_dir {
        Some(dir) => {
            let dir = absolute(dir, cwd);
            let parent_exists = dir.parent().map_or(false, Path::is_dir);
            if !dir.is_dir() && !parent_exists {
                return Err(ConfigError::InvalidBaseDir { path: dir }.into());
            }
            dir
        }
        None => cwd.to_path_buf(),
    };
    filesystem::create_dir_all(&base)
        .map_err(|_| ConfigError::InvalidBaseDir { path: base.clone() })?;
    let layout = AreaLayout::new(base);

    if options.resume {
        let mut missing = Vec::new();
        if !layout.packages_file().is_file() {
            missing.push("packages.sd");
        }
        if !layout.specs_dir().is_dir() {
            missing.push("spec files");
        }
        if !missing.is_empty() {
            let verb = if missing.len() > 1 { "are" } else { "is" };
            return Err(PartialStateError::MissingArtifacts {
                missing: format!("{} {verb}", missing.join(" and ")),
            }
            .into());
        }
        tracing::debug!("Cleaning incomplete development area files");
        for dir in [
            layout.build_dir(),
            layout.install_dir(),
            layout.tmp_dir(),
            layout.aux_bin_dir(),
            layout.aux_env_dir(),
            layout.aux_packages_dir(),
        ] {
            filesystem::remove_dir_all(&dir)?;
        }
    } else if !filesystem::is_empty_dir(layout.base())? {
        if !options.force {
            return Err(ConfigError::DirectoryNotEmpty {
                path: layout.base().to_path_buf(),
            }
            .into());
        }
        tracing::info!("(force) using non-empty directory {}", layout.base().display());
        for dir in [
            layout.aux_dir(),
            layout.build_dir(),
            layout.install_dir(),
            layout.tmp_dir(),
        ] {
            if dir.exists() {
                tracing::info!("(force) removing {}", dir.display());
                filesystem::remove_dir_all(&dir)?;
            }
        }
    }

    filesystem::create_dir_all(&layout.aux_dir())?;
    filesystem::create_dir_all(&layout.srcs_dir())?;
    Ok(layout)
}
