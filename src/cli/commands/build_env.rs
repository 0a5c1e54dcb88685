//! CLI implementation for `spackdev build-env`

use std::process::ExitCode;

use anyhow::{Context, Result};

use crate::core::area::AreaLayout;
use crate::core::build_env::{prepare_command, BuildEnvOptions};
use crate::core::environment::Environment;

/// Execute the build-env command
///
/// On Unix the current process is replaced by the command; elsewhere the
/// command's exit status is passed through.
pub fn execute(package: String, command: Vec<String>, cd: bool, prompt: bool) -> Result<ExitCode> {
    let layout = AreaLayout::discover(None).context("Unable to find a development area")?;
    let options = BuildEnvOptions {
        package,
        command,
        cd,
        prompt,
    };
    let invocation = prepare_command(
        &layout,
        &options,
        &Environment::from_process(),
        &std::env::temp_dir(),
    )
    .with_context(|| format!("Failed to set up the build environment of {}", options.package))?;

    #[cfg(unix)]
    {
        Err(invocation.exec()).with_context(|| format!("Failed to run {}", invocation.program()))
    }
    #[cfg(not(unix))]
    {
        let status = invocation
            .clone()
            .allow_failure()
            .status()
            .with_context(|| format!("Failed to run {}", invocation.program()))?;
        Ok(ExitCode::from(u8::try_from(status).unwrap_or(1)))
    }
}
