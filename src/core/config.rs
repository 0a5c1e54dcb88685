//! Global configuration
//!
//! Optional `config.toml` in the config directory:
//!
//! ```toml
//! spack = "/opt/spack/bin/spack"
//! cmake = "cmake"
//! generator = "Ninja"
//! default_branch = "develop"
//! # default_tag = "v1_00_00"
//! ```
//!
//! Command-line flags take precedence over every value here.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::build_system::DEFAULT_GENERATOR;
use crate::core::package_ref::VersionSelector;
use crate::error::ConfigError;
use crate::infra::dirs::SpackdevDirs;

/// Branch checked out when nothing else is requested
pub const DEFAULT_BRANCH: &str = "develop";

/// Global configuration for spackdev
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Package manager executable
    pub spack: Option<String>,
    /// CMake executable used to bootstrap the superbuild
    pub cmake: Option<String>,
    /// Default CMake generator
    pub generator: Option<String>,
    /// Default branch for packages without a selector
    pub default_branch: Option<String>,
    /// Default tag for packages without a selector (wins over the branch)
    pub default_tag: Option<String>,
}

impl GlobalConfig {
    /// Load from the config directory; a missing file yields defaults
    pub fn load(dirs: &SpackdevDirs) -> Result<Self, ConfigError> {
        Self::load_from_path(&dirs.global_config_path())
    }

    /// Load from a specific path; a missing file yields defaults
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Package manager executable
    pub fn spack(&self) -> &str {
        self.spack.as_deref().unwrap_or("spack")
    }

    /// CMake executable
    pub fn cmake(&self) -> &str {
        self.cmake.as_deref().unwrap_or("cmake")
    }

    /// Default generator
    pub fn generator(&self) -> &str {
        self.generator.as_deref().unwrap_or(DEFAULT_GENERATOR)
    }

    /// Default selector from command-line values, falling back to the config
    ///
    /// A tag from either source wins over a branch from the config.
    pub fn default_selector(
        &self,
        cli_branch: Option<&str>,
        cli_tag: Option<&str>,
    ) -> VersionSelector {
        if let Some(tag) = cli_tag {
            return VersionSelector::Tag(tag.to_string());
        }
        if let Some(branch) = cli_branch {
            return VersionSelector::Branch(branch.to_string());
        }
        match (&self.default_tag, &self.default_branch) {
            (Some(tag), _) => VersionSelector::Tag(tag.clone()),
            (None, Some(branch)) => VersionSelector::Branch(branch.clone()),
            (None, None) => VersionSelector::Branch(DEFAULT_BRANCH.to_string()),
        }
    }
}
