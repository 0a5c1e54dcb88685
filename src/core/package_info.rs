//! Persisted package information
//!
//! The package lists live in `spackdev-aux/packages.sd`, three lines of
//! space-separated names: requested descriptors, additional descriptors, and
//! external dependency names. Every package of the dependency graph gets one
//! JSON fragment in `spackdev-aux/specs/`, and a SHA-256 fingerprint of the
//! fragments is kept in `spackdev-aux/specs.sha256`.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::core::area::AreaLayout;
use crate::core::graph::{DependencyGraph, PackageNode};
use crate::core::package_ref::{format_descriptor_list, parse_descriptor_list, PackageRef};
use crate::error::{ConfigError, GraphError, PartialStateError, Result};
use crate::infra::filesystem;

const FRAGMENT_EXTENSION: &str = "json";
const FINGERPRINT_FILE: &str = "specs.sha256";

/// The three package lists of an area
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageLists {
    /// Explicitly requested packages
    pub requested: Vec<PackageRef>,
    /// Packages pulled in for consistency
    pub additional: Vec<PackageRef>,
    /// Prebuilt dependencies
    pub external: Vec<String>,
}

impl PackageLists {
    /// Names of all development packages, requested first
    pub fn dev_package_names(&self) -> Vec<String> {
        self.requested
            .iter()
            .chain(&self.additional)
            .map(|r| r.name().to_string())
            .collect()
    }

    /// All development package descriptors, requested first
    pub fn dev_packages(&self) -> impl Iterator<Item = &PackageRef> {
        self.requested.iter().chain(&self.additional)
    }

    /// Render the `packages.sd` contents
    pub fn to_file_contents(&self) -> String {
        format!(
            "{}\n{}\n{}\n",
            format_descriptor_list(&self.requested),
            format_descriptor_list(&self.additional),
            self.external.join(" ")
        )
    }

    /// Parse `packages.sd` contents read from `path`
    pub fn parse(content: &str, path: &Path) -> std::result::Result<Self, ConfigError> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.first().is_some_and(|line| line.contains('[')) {
            return Err(ConfigError::ObsoletePackageList {
                path: path.to_path_buf(),
            });
        }
        if lines.len() < 3 {
            return Err(ConfigError::InvalidPackageList {
                path: path.to_path_buf(),
                reason: format!("expected 3 lines, found {}", lines.len()),
            });
        }

        let invalid = |e: crate::error::PackageRefError| ConfigError::InvalidPackageList {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        Ok(Self {
            requested: parse_descriptor_list(lines[0]).map_err(invalid)?,
            additional: parse_descriptor_list(lines[1]).map_err(invalid)?,
            external: lines[2].split_whitespace().map(str::to_string).collect(),
        })
    }

    /// Read the package lists of an area
    pub fn load(layout: &AreaLayout) -> Result<Self> {
        let path = layout.packages_file();
        if !path.is_file() {
            return Err(ConfigError::InvalidPackageList {
                path,
                reason: "file not found".to_string(),
            }
            .into());
        }
        let content = filesystem::read_file(&path)?;
        Ok(Self::parse(&content, &path)?)
    }
}

/// Everything needed to resume initialization
#[derive(Debug, Clone)]
pub struct PersistedState {
    /// Package lists
    pub lists: PackageLists,
    /// Concretized dependency graph
    pub graph: DependencyGraph,
}

impl PersistedState {
    /// Write package lists, graph fragments and their fingerprint
    pub fn save(&self, layout: &AreaLayout) -> Result<()> {
        let specs_dir = layout.specs_dir();
        filesystem::remove_dir_all(&specs_dir)?;
        filesystem::create_dir_all(&specs_dir)?;

        for node in self.graph.nodes() {
            let path = fragment_path(&specs_dir, &node.name);
            let json = serde_json::to_string_pretty(node).map_err(|e| GraphError::Fragment {
                path: path.clone(),
                error: e.to_string(),
            })?;
            filesystem::write_file(&path, &json)?;
        }

        let fingerprint = fingerprint_fragments(&specs_dir)?;
        filesystem::write_file(&fingerprint_path(layout), &format!("{fingerprint}\n"))?;
        filesystem::write_file(&layout.packages_file(), &self.lists.to_file_contents())?;
        tracing::debug!(
            "Saved package information for {} packages to {}",
            self.graph.len(),
            layout.aux_dir().display()
        );
        Ok(())
    }

    /// Read everything back, verifying the fragments
    pub fn load(layout: &AreaLayout) -> Result<Self> {
        let lists = PackageLists::load(layout)?;
        let specs_dir = layout.specs_dir();
        if !specs_dir.is_dir() {
            return Err(PartialStateError::MissingArtifacts {
                missing: "spec files are".to_string(),
            }
            .into());
        }

        let recorded_path = fingerprint_path(layout);
        if !recorded_path.is_file() {
            return Err(PartialStateError::MissingArtifacts {
                missing: format!("{FINGERPRINT_FILE} is"),
            }
            .into());
        }
        let recorded = filesystem::read_file(&recorded_path)?;
        if recorded.trim() != fingerprint_fragments(&specs_dir)? {
            return Err(PartialStateError::FingerprintMismatch { path: specs_dir }.into());
        }

        let mut nodes = Vec::new();
        for path in fragment_files(&specs_dir)? {
            let content = filesystem::read_file(&path)?;
            let node: PackageNode =
                serde_json::from_str(&content).map_err(|e| GraphError::Fragment {
                    path: path.clone(),
                    error: e.to_string(),
                })?;
            nodes.push(node);
        }
        let graph = DependencyGraph::from_nodes(nodes)?;

        let named = lists
            .dev_packages()
            .map(PackageRef::name)
            .chain(lists.external.iter().map(String::as_str));
        for name in named {
            if !graph.contains(name) {
                return Err(PartialStateError::MissingFragment {
                    package: name.to_string(),
                }
                .into());
            }
        }

        Ok(Self { lists, graph })
    }
}

fn fragment_path(specs_dir: &Path, package: &str) -> PathBuf {
    specs_dir.join(format!("{package}.{FRAGMENT_EXTENSION}"))
}

fn fingerprint_path(layout: &AreaLayout) -> PathBuf {
    layout.aux_dir().join(FINGERPRINT_FILE)
}

/// Fragment files, sorted by name
fn fragment_files(specs_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(specs_dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| crate::error::FilesystemError::Operation {
            operation: "list",
            path: specs_dir.to_path_buf(),
            error: e.to_string(),
        })?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().is_some_and(|ext| ext == FRAGMENT_EXTENSION)
        {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// SHA-256 over the names and contents of all fragments
fn fingerprint_fragments(specs_dir: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    for path in fragment_files(specs_dir)? {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(filesystem::read_bytes(&path)?);
        hasher.update([0u8]);
    }
    Ok(hex::encode(hasher.finalize()))
}
