//! Platform-specific directory management
//!
//! Follows the XDG Base Directory Specification on Linux and standard
//! locations on macOS. `SPACKDEV_CONFIG_DIR` overrides the config directory.

use std::env;
use std::path::PathBuf;

/// Environment variable overriding the config directory
pub const ENV_CONFIG_DIR: &str = "SPACKDEV_CONFIG_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "spackdev";

/// Platform-specific directory provider for spackdev
#[derive(Debug, Clone)]
pub struct SpackdevDirs {
    config_dir: PathBuf,
}

impl SpackdevDirs {
    /// Resolve directories from the environment, then platform defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve_config_dir(),
        }
    }

    /// Use an explicit config directory
    #[must_use]
    pub fn with_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Get the config directory path
    ///
    /// - Linux: `$XDG_CONFIG_HOME/spackdev` or `~/.config/spackdev`
    /// - macOS: `~/Library/Application Support/spackdev`
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Path of `config.toml` in the config directory
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    fn resolve_config_dir() -> PathBuf {
        if let Some(path) = env::var_os(ENV_CONFIG_DIR) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join(APP_NAME))
            })
    }
}

impl Default for SpackdevDirs {
    fn default() -> Self {
        Self::new()
    }
}
