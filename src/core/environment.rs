//! Build environments
//!
//! Each development package gets the environment the package manager would
//! set up to build it, minus session noise, persisted in three equivalent
//! forms under `<dir>/`:
//!
//! - `env.txt` - `NAME=value` per line, sorted, line breaks and backslashes escaped
//! - `env.sh` - `export NAME='value'` statements for `source`
//! - `env.bin` - bincode-encoded mapping, the form tools load back

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{EnvironmentError, FilesystemError};
use crate::infra::filesystem;

/// Human-readable listing
pub const ENV_TEXT_FILE: &str = "env.txt";
/// Shell-sourceable script
pub const ENV_SHELL_FILE: &str = "env.sh";
/// Binary mapping
pub const ENV_BINARY_FILE: &str = "env.bin";

/// Variables in our own namespace, always kept
fn allow_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^SPACK(?:DEV)?_").expect("valid allow pattern"))
}

/// Session, authentication, terminal and identity variables, always dropped
fn deny_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?:.*AUTH.*|.*SESSION.*|DISPLAY$|HOME$|KONSOLE_|PROMPT_COMMAND$|PS\d|(?:OLD)?PWD$|SHLVL$|SSH_|TERM$|USER$|WINDOWID$|XDG_|_$)",
        )
        .expect("valid deny pattern")
    })
}

/// Mapping of environment variable names to values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment(BTreeMap<String, String>);

impl Environment {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment (non-UTF-8 entries skipped)
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    /// Parse NUL-separated `NAME=value` records as printed by `env -0`
    pub fn from_env_dump(dump: &[u8]) -> Self {
        dump.split(|b| *b == 0)
            .filter(|record| !record.is_empty())
            .filter_map(|record| {
                let record = String::from_utf8_lossy(record);
                let (name, value) = record.split_once('=')?;
                (!name.is_empty()).then(|| (name.to_string(), value.to_string()))
            })
            .collect()
    }

    /// Look up a variable
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Set a variable
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Remove a variable
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no variables
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` on top of this environment
    pub fn extend(&mut self, other: &Environment) {
        for (k, v) in other.iter() {
            self.insert(k, v);
        }
    }

    /// Apply `f` to every value
    #[must_use]
    pub fn map_values(self, mut f: impl FnMut(&str) -> String) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|(k, v)| {
                    let mapped = f(&v);
                    (k, mapped)
                })
                .collect(),
        )
    }

    /// Drop session noise
    ///
    /// Names in the allow pattern are always kept. Otherwise names matching the
    /// deny pattern are dropped, as are (with `drop_unchanged`) variables whose
    /// value equals the one in `ambient`.
    pub fn sanitize(&self, drop_unchanged: bool, ambient: &Environment) -> Environment {
        self.0
            .iter()
            .filter(|(name, value)| {
                if allow_pattern().is_match(name) {
                    return true;
                }
                if deny_pattern().is_match(name) {
                    return false;
                }
                !(drop_unchanged && ambient.get(name) == Some(value.as_str()))
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Render the human-readable listing
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.0 {
            out.push_str(name);
            out.push('=');
            out.push_str(&escape_text_value(value));
            out.push('\n');
        }
        out
    }

    /// Parse the human-readable listing
    pub fn from_text(text: &str) -> Self {
        text.split('\n')
            .filter_map(|line| {
                let (name, value) = line.split_once('=')?;
                Some((name.to_string(), unescape_text_value(value)))
            })
            .collect()
    }

    /// Render a script that exports every variable
    pub fn to_shell_script(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.0 {
            out.push_str("export ");
            out.push_str(name);
            out.push('=');
            out.push_str(&shell_quote(value));
            out.push_str(";\n");
        }
        out
    }

    /// Parse a script produced by [`Environment::to_shell_script`]
    pub fn from_shell_script(script: &str) -> Self {
        let mut env = Self::new();
        let mut rest = script;
        while let Some(pos) = rest.find("export ") {
            rest = &rest[pos + "export ".len()..];
            let Some(eq) = rest.find('=') else { break };
            let name = rest[..eq].trim().to_string();
            rest = &rest[eq + 1..];
            let (value, remaining) = parse_single_quoted(rest);
            env.insert(name, value);
            rest = remaining;
        }
        env
    }

    /// Encode as bincode
    pub fn to_binary(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Decode from bincode
    pub fn from_binary(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

impl FromIterator<(String, String)> for Environment {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn escape_text_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

fn unescape_text_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Quote a value for POSIX shells
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Read `'...'` segments joined by `\'` until the statement ends
fn parse_single_quoted(input: &str) -> (String, &str) {
    let mut value = String::new();
    let mut rest = input;
    loop {
        if let Some(after_open) = rest.strip_prefix('\'') {
            match after_open.find('\'') {
                Some(close) => {
                    value.push_str(&after_open[..close]);
                    rest = &after_open[close + 1..];
                }
                None => {
                    value.push_str(after_open);
                    return (value, "");
                }
            }
        } else if let Some(after_escape) = rest.strip_prefix("\\'") {
            value.push('\'');
            rest = after_escape;
        } else {
            let end = rest.find(['\n', ';']).unwrap_or(rest.len());
            value.push_str(&rest[..end]);
            return (value, &rest[end..]);
        }
    }
}

/// Locations of the three artifact files in one directory
#[derive(Debug, Clone)]
pub struct EnvironmentArtifacts {
    dir: PathBuf,
}

impl EnvironmentArtifacts {
    /// Artifacts stored in `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the artifacts
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the human-readable listing
    pub fn text_path(&self) -> PathBuf {
        self.dir.join(ENV_TEXT_FILE)
    }

    /// Path of the shell script
    pub fn shell_path(&self) -> PathBuf {
        self.dir.join(ENV_SHELL_FILE)
    }

    /// Path of the binary mapping
    pub fn binary_path(&self) -> PathBuf {
        self.dir.join(ENV_BINARY_FILE)
    }

    /// Check if the binary mapping exists
    pub fn exists(&self) -> bool {
        self.binary_path().is_file()
    }

    /// Write all three forms
    pub fn write(&self, env: &Environment) -> Result<(), EnvironmentError> {
        let io = |e: FilesystemError| EnvironmentError::Serialize {
            path: self.dir.clone(),
            error: e.to_string(),
        };
        filesystem::create_dir_all(&self.dir).map_err(io)?;
        filesystem::write_file(&self.text_path(), &env.to_text()).map_err(io)?;
        filesystem::write_file(&self.shell_path(), &env.to_shell_script()).map_err(io)?;
        let bytes = env.to_binary().map_err(|e| EnvironmentError::Serialize {
            path: self.binary_path(),
            error: e.to_string(),
        })?;
        filesystem::write_bytes(&self.binary_path(), &bytes).map_err(io)
    }

    /// Load the binary mapping
    pub fn read(&self) -> Result<Environment, EnvironmentError> {
        let path = self.binary_path();
        let bytes = filesystem::read_bytes(&path).map_err(|e| EnvironmentError::Serialize {
            path: path.clone(),
            error: e.to_string(),
        })?;
        Environment::from_binary(&bytes).map_err(|e| EnvironmentError::Serialize {
            path,
            error: e.to_string(),
        })
    }
}
