//! Running commands in a package's build environment
//!
//! The environment of a command is the caller's environment, plus the area
//! environment when the caller has not entered the area yet, plus the
//! persisted environment of the package.

use std::path::{Path, PathBuf};

use crate::core::area::{AreaLayout, ENV_BASE};
use crate::core::environment::{Environment, EnvironmentArtifacts};
use crate::error::{EnvironmentError, Result};
use crate::infra::filesystem;
use crate::infra::process::{EnvOverlay, Invocation};

/// Options for `build-env`
#[derive(Debug, Clone, Default)]
pub struct BuildEnvOptions {
    /// Package whose environment is used
    pub package: String,
    /// Command and arguments; empty starts a shell
    pub command: Vec<String>,
    /// Run in `build/<package>`
    pub cd: bool,
    /// Show the package in the prompt of an interactive bash
    pub prompt: bool,
}

/// Environment for commands run on behalf of `package`
pub fn load_package_environment(
    layout: &AreaLayout,
    package: &str,
    ambient: &Environment,
) -> Result<Environment> {
    let artifacts = EnvironmentArtifacts::new(layout.package_env_dir(package));
    if !artifacts.exists() {
        return Err(EnvironmentError::NotFound {
            package: package.to_string(),
        }
        .into());
    }

    let mut env = ambient.clone();
    if ambient.get(ENV_BASE).is_none() {
        let area = EnvironmentArtifacts::new(layout.aux_env_dir());
        if area.exists() {
            env.extend(&area.read()?.sanitize(false, &Environment::new()));
        }
    }
    env.extend(&artifacts.read()?.sanitize(false, &Environment::new()));
    Ok(env)
}

/// Interactive shell to start when no command is given
pub fn default_shell(ambient: &Environment) -> String {
    ["SPACK_SHELL", "SHELL"]
        .into_iter()
        .filter_map(|name| ambient.get(name))
        .find(|shell| !shell.is_empty())
        .unwrap_or("/bin/sh")
        .to_string()
}

/// bash startup file that tags the prompt with `package` and removes itself
pub fn prompt_rcfile(package: &str, rcfile: &Path) -> String {
    format!(
        r#"if [ -r ~/.bashrc ]; then . ~/.bashrc; fi
if [[ "${{PS1}}" =~ ^(.*)([\#\$%][ 	]*)$ ]]; then
  PS1="${{BASH_REMATCH[1]}}\[\e[1;95m\]{package}\[\e[m\] ${{BASH_REMATCH[2]}}"
fi
rm -f "{rcfile}"
"#,
        rcfile = rcfile.display()
    )
}

/// Build the invocation for `options`
///
/// `scratch_dir` receives the prompt startup file when one is needed.
pub fn prepare_command(
    layout: &AreaLayout,
    options: &BuildEnvOptions,
    ambient: &Environment,
    scratch_dir: &Path,
) -> Result<Invocation> {
    let env = load_package_environment(layout, &options.package, ambient)?;

    let mut command = options.command.clone();
    if command.is_empty() {
        let shell = default_shell(&env);
        command.push(shell.clone());
        if options.prompt {
            if shell.ends_with("bash") {
                let rcfile = rcfile_path(scratch_dir, &options.package);
                filesystem::write_file(&rcfile, &prompt_rcfile(&options.package, &rcfile))?;
                command.push("--rcfile".to_string());
                command.push(rcfile.to_string_lossy().into_owned());
            } else {
                tracing::warn!("--prompt is only honored for bash at this time");
            }
        }
    } else if options.prompt {
        tracing::warn!("--prompt ignored when a command is specified");
    }

    let mut args = command.into_iter();
    let program = args.next().unwrap_or_default();
    let mut invocation = Invocation::new(program)
        .args(args)
        .overlay(EnvOverlay::replacing(&env));
    if options.cd {
        invocation = invocation.current_dir(layout.package_build_dir(&options.package));
    }
    Ok(invocation)
}

fn rcfile_path(scratch_dir: &Path, package: &str) -> PathBuf {
    scratch_dir.join(format!("spackdev-prompt-{package}-{}.rc", std::process::id()))
}
