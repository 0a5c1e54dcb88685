//! External process invocation
//!
//! Subprocess environments are described by an [`EnvOverlay`] handed to each
//! invocation; the environment of this process is never modified.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::core::environment::{shell_quote, Environment};
use crate::error::ExternalToolError;

/// Environment changes applied to one subprocess
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
    replace: bool,
    set: BTreeMap<String, String>,
    unset: Vec<String>,
}

impl EnvOverlay {
    /// Inherit the current environment unchanged
    pub fn new() -> Self {
        Self::default()
    }

    /// Run with exactly `env`, nothing inherited
    pub fn replacing(env: &Environment) -> Self {
        Self {
            replace: true,
            set: env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            unset: Vec::new(),
        }
    }

    /// Set a variable
    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.unset.retain(|n| n != &name);
        self.set.insert(name, value.into());
        self
    }

    /// Remove a variable
    #[must_use]
    pub fn without_var(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.set.remove(&name);
        self.unset.push(name);
        self
    }

    /// Value the overlay sets for `name`, if any
    pub fn get(&self, name: &str) -> Option<&str> {
        self.set.get(name).map(String::as_str)
    }

    /// Apply to a command about to be spawned
    pub fn apply(&self, command: &mut Command) {
        if self.replace {
            command.env_clear();
        }
        for name in &self.unset {
            command.env_remove(name);
        }
        command.envs(&self.set);
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit status (-1 when killed by a signal)
    pub status: i32,
    /// Raw standard output
    pub stdout: Vec<u8>,
    /// Standard error, lossily decoded
    pub stderr: String,
}

impl ProcessOutput {
    /// Whether the process exited with status zero
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Standard output, lossily decoded
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// A subprocess to run
#[derive(Debug, Clone)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    overlay: EnvOverlay,
    cwd: Option<PathBuf>,
    allow_failure: bool,
}

impl Invocation {
    /// Invoke `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            overlay: EnvOverlay::new(),
            cwd: None,
            allow_failure: false,
        }
    }

    /// Append an argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Use `overlay` for the subprocess environment
    #[must_use]
    pub fn overlay(mut self, overlay: EnvOverlay) -> Self {
        self.overlay = overlay;
        self
    }

    /// Run in `dir`
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Report non-zero exits through [`ProcessOutput::status`] instead of an error
    #[must_use]
    pub fn allow_failure(mut self) -> Self {
        self.allow_failure = true;
        self
    }

    /// Program name
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Working directory, if set
    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Shell-quoted command line
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|word| quote_word(word))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        self.overlay.apply(&mut command);
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }
        command
    }

    fn spawn_error(&self, error: &std::io::Error) -> ExternalToolError {
        ExternalToolError::SpawnFailed {
            program: self.program.clone(),
            error: error.to_string(),
        }
    }

    /// Run capturing stdout and stderr
    pub fn output(&self) -> Result<ProcessOutput, ExternalToolError> {
        tracing::debug!("Running {}", self.display());
        let output = self
            .command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(&e))?;
        let result = ProcessOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.success() && !self.allow_failure {
            return Err(ExternalToolError::CommandFailed {
                command: self.display(),
                status: result.status,
                stderr: result.stderr,
            });
        }
        Ok(result)
    }

    /// Run with inherited stdio, returning the exit status
    pub fn status(&self) -> Result<i32, ExternalToolError> {
        tracing::debug!("Running {}", self.display());
        let status = self
            .command()
            .status()
            .map_err(|e| self.spawn_error(&e))?
            .code()
            .unwrap_or(-1);
        if status != 0 && !self.allow_failure {
            return Err(ExternalToolError::CommandFailed {
                command: self.display(),
                status,
                stderr: String::new(),
            });
        }
        Ok(status)
    }

    /// Replace the current process
    ///
    /// Only returns on failure.
    #[cfg(unix)]
    pub fn exec(&self) -> ExternalToolError {
        use std::os::unix::process::CommandExt;

        tracing::debug!("Executing {}", self.display());
        let error = self.command().exec();
        self.spawn_error(&error)
    }
}

fn quote_word(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%^".contains(c));
    if plain {
        word.to_string()
    } else {
        shell_quote(word)
    }
}
