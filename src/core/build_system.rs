//! Build tool selection
//!
//! The superbuild is driven by CMake with either the "Unix Makefiles" or the
//! "Ninja" primary generator. Extra generators may be prefixed in the usual
//! CMake way (e.g., "Eclipse CDT4 - Ninja").

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ConfigError;

/// Makefile generator
pub const MAKE_GENERATOR: &str = "Unix Makefiles";
/// Ninja generator
pub const NINJA_GENERATOR: &str = "Ninja";
/// Default generator when none is configured
pub const DEFAULT_GENERATOR: &str = MAKE_GENERATOR;

fn generator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:.*?-\s+)?(Ninja|Unix Makefiles)").expect("valid generator pattern")
    })
}

/// Primary generator family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    /// Unix Makefiles
    Make,
    /// Ninja
    Ninja,
}

impl GeneratorKind {
    /// Parse the primary generator out of a CMake generator string
    pub fn from_generator(generator: &str) -> Result<Self, ConfigError> {
        let caps = generator_pattern()
            .captures(generator)
            .ok_or_else(|| ConfigError::InvalidGenerator {
                generator: generator.to_string(),
            })?;
        match &caps[1] {
            "Ninja" => Ok(Self::Ninja),
            _ => Ok(Self::Make),
        }
    }

    /// Tool label, also the name of the per-package wrapper
    pub fn label(&self) -> &'static str {
        match self {
            Self::Make => "make",
            Self::Ninja => "ninja",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Generator and build tool chosen for one superbuild node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSelection {
    /// CMake generator string passed to the package configuration
    pub generator: String,
    /// Primary generator family
    pub kind: GeneratorKind,
}

/// Build system configuration for the whole development area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSystem {
    generator: String,
    kind: GeneratorKind,
    build_command: String,
    override_generator: bool,
}

impl BuildSystem {
    /// Validate `generator` and locate its build tool on `PATH`
    ///
    /// Ninja resolves to `ninja`, then `ninja-build`; a warning is logged
    /// when neither can be found.
    pub fn new(generator: &str, override_generator: bool) -> Result<Self, ConfigError> {
        let kind = GeneratorKind::from_generator(generator)?;
        let build_command = match kind {
            GeneratorKind::Make => "make".to_string(),
            GeneratorKind::Ninja => ["ninja", "ninja-build"]
                .into_iter()
                .find(|candidate| which::which(candidate).is_ok())
                .unwrap_or_else(|| {
                    tracing::warn!(
                        "ninja build selected, but neither \"ninja\" nor \"ninja-build\" are available"
                    );
                    "ninja"
                })
                .to_string(),
        };
        Self::with_build_command(generator, override_generator, build_command)
    }

    /// Validate `generator` using an explicit build command
    pub fn with_build_command(
        generator: &str,
        override_generator: bool,
        build_command: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            generator: generator.to_string(),
            kind: GeneratorKind::from_generator(generator)?,
            build_command: build_command.into(),
            override_generator,
        })
    }

    /// Selected CMake generator string
    pub fn generator(&self) -> &str {
        &self.generator
    }

    /// Selected primary generator family
    pub fn kind(&self) -> GeneratorKind {
        self.kind
    }

    /// Executable that drives builds for the selected family
    pub fn build_command(&self) -> &str {
        &self.build_command
    }

    /// Whether packages' own generator choices are ignored
    pub fn overrides_packages(&self) -> bool {
        self.override_generator
    }

    /// Tool selection for a node whose arguments requested `package_generator`
    pub fn select_for(
        &self,
        package_generator: Option<&str>,
    ) -> Result<ToolSelection, ConfigError> {
        match package_generator {
            Some(generator) if !self.override_generator && generator != self.generator => {
                Ok(ToolSelection {
                    generator: generator.to_string(),
                    kind: GeneratorKind::from_generator(generator)?,
                })
            }
            _ => Ok(ToolSelection {
                generator: self.generator.clone(),
                kind: self.kind,
            }),
        }
    }
}
