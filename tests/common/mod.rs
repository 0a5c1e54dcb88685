//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use spackdev::core::area::AreaLayout;
use spackdev::core::environment::{Environment, EnvironmentArtifacts};
use spackdev::core::graph::{DependencyGraph, PackageNode};
use spackdev::core::package_info::{PackageLists, PersistedState};
use spackdev::core::package_ref::PackageRef;
use tempfile::TempDir;

/// Development area in a temporary directory
///
/// The default area develops `art` and `canvas` (requested `art^feature`,
/// additional `canvas`) on top of the external `boost`.
pub struct TestArea {
    /// Temporary directory holding the area
    pub dir: TempDir,
    /// Separate config directory so the user's config is never read
    pub config_dir: TempDir,
}

impl TestArea {
    /// Create an empty directory that is not yet an area
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
            config_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create a fully recorded area
    pub fn new() -> Self {
        let area = Self::empty();
        sample_state()
            .save(&area.layout())
            .expect("Failed to save package information");
        area
    }

    /// Get the path to the area directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Layout of the area
    pub fn layout(&self) -> AreaLayout {
        AreaLayout::new(self.dir.path())
    }

    /// Create a file in the area
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Persist an environment for `package`
    pub fn write_package_env(&self, package: &str, pairs: &[(&str, &str)]) {
        EnvironmentArtifacts::new(self.layout().package_env_dir(package))
            .write(&env(pairs))
            .expect("Failed to write environment");
    }

    /// Write the global config file
    pub fn write_config(&self, content: &str) {
        std::fs::write(self.config_dir.path().join("config.toml"), content)
            .expect("Failed to write config");
    }

    /// Command running the spackdev binary in `cwd`, isolated from any
    /// enclosing area and from the user's configuration
    pub fn command_in(&self, cwd: &Path) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_spackdev"));
        cmd.current_dir(cwd)
            .env_remove("SPACKDEV_BASE")
            .env("SPACKDEV_CONFIG_DIR", self.config_dir.path());
        cmd
    }

    /// Run spackdev with `args` from the area directory
    pub fn run(&self, args: &[&str]) -> Output {
        self.command_in(self.dir.path())
            .args(args)
            .output()
            .expect("Failed to execute spackdev")
    }
}

impl Default for TestArea {
    fn default() -> Self {
        Self::new()
    }
}

/// Build an environment from pairs
pub fn env(pairs: &[(&str, &str)]) -> Environment {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Graph of the sample area
pub fn sample_graph() -> DependencyGraph {
    DependencyGraph::from_nodes([
        PackageNode::new("art", "3.1", &["canvas", "boost"]),
        PackageNode::new("canvas", "2.0", &["boost"]),
        PackageNode::new("boost", "1.75", &[]),
    ])
    .expect("Failed to build graph")
}

/// Recorded state of the sample area
pub fn sample_state() -> PersistedState {
    PersistedState {
        lists: PackageLists {
            requested: vec!["art^feature".parse::<PackageRef>().expect("valid descriptor")],
            additional: vec![PackageRef::new("canvas")],
            external: vec!["boost".to_string()],
        },
        graph: sample_graph(),
    }
}

/// Lossy stdout of a finished command
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Lossy stderr of a finished command
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
