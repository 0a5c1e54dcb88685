//! Package manager collaborator
//!
//! Everything spackdev needs from the package manager goes through
//! [`PackageManager`]; [`SpackCli`] implements it by running `spack`.

use std::path::{Path, PathBuf};

use crate::core::environment::Environment;
use crate::core::graph::DependencyGraph;
use crate::error::{ExternalToolError, Result};
use crate::infra::process::{EnvOverlay, Invocation};

/// Operations provided by the host package manager
pub trait PackageManager {
    /// Concretize `specs` and return the combined dependency graph
    fn concretize(&self, specs: &[String]) -> Result<DependencyGraph>;

    /// Root of the canonical install tree
    fn install_root(&self) -> Result<PathBuf>;

    /// Install prefix of a concretized package
    fn install_prefix(&self, spec: &str) -> Result<PathBuf>;

    /// Install the given specs (each element one spec or `^dep` constraint)
    fn install(&self, install_args: &[String]) -> Result<()>;

    /// Fetch and expand the sources of `spec` into `path`
    fn stage(&self, spec: &str, path: &Path) -> Result<()>;

    /// Environment the package manager sets up to build `spec`
    fn build_environment(&self, spec: &str) -> Result<Environment>;

    /// CMake arguments the package recipe would pass for `spec`
    fn cmake_args(&self, spec: &str, environment: &Environment) -> Result<Vec<String>>;
}

const INSTALL_ROOT_SCRIPT: &str = "\
import spack.store
store = getattr(spack.store, 'STORE', None)
print(store.root if store is not None else spack.store.root)
";

const CMAKE_ARGS_SCRIPT: &str = "\
import json, sys
import spack.spec
spec = spack.spec.Spec(sys.argv[1]).concretized()
pkg = spec.package
print(json.dumps(list(pkg.std_cmake_args) + list(pkg.cmake_args())))
";

/// [`PackageManager`] backed by the `spack` command line
#[derive(Debug, Clone)]
pub struct SpackCli {
    executable: String,
    overlay: EnvOverlay,
}

impl SpackCli {
    /// Use `executable`, with `overlay` applied to every invocation
    pub fn new(executable: impl Into<String>, overlay: EnvOverlay) -> Self {
        Self {
            executable: executable.into(),
            overlay,
        }
    }

    fn invocation(&self) -> Invocation {
        Invocation::new(&self.executable).overlay(self.overlay.clone())
    }

    fn python(&self, script: &str) -> Invocation {
        self.invocation().args(["python", "-c", script])
    }

    fn single_line(&self, invocation: &Invocation) -> Result<String> {
        let output = invocation.output()?;
        let text = output.stdout_lossy();
        let line = text.lines().map(str::trim).rfind(|l| !l.is_empty()).unwrap_or_default();
        if line.is_empty() {
            return Err(ExternalToolError::BadOutput {
                command: invocation.display(),
                error: "no output".to_string(),
            }
            .into());
        }
        Ok(line.to_string())
    }
}

impl PackageManager for SpackCli {
    fn concretize(&self, specs: &[String]) -> Result<DependencyGraph> {
        let invocation = self
            .invocation()
            .args(["spec", "--json"])
            .args(specs.iter().cloned());
        let output = invocation.output()?;
        Ok(DependencyGraph::from_spack_json(&output.stdout_lossy())?)
    }

    fn install_root(&self) -> Result<PathBuf> {
        let invocation = self.python(INSTALL_ROOT_SCRIPT);
        self.single_line(&invocation).map(PathBuf::from)
    }

    fn install_prefix(&self, spec: &str) -> Result<PathBuf> {
        let invocation = self.invocation().args(["location", "--install-dir", spec]);
        self.single_line(&invocation).map(PathBuf::from)
    }

    fn install(&self, install_args: &[String]) -> Result<()> {
        self.invocation()
            .arg("install")
            .args(install_args.iter().cloned())
            .status()?;
        Ok(())
    }

    fn stage(&self, spec: &str, path: &Path) -> Result<()> {
        self.invocation()
            .args(["stage", "--path"])
            .arg(path.to_string_lossy())
            .arg(spec)
            .status()?;
        Ok(())
    }

    fn build_environment(&self, spec: &str) -> Result<Environment> {
        let output = self
            .invocation()
            .args(["build-env", spec, "--", "env", "-0"])
            .output()?;
        Ok(Environment::from_env_dump(&output.stdout))
    }

    fn cmake_args(&self, spec: &str, environment: &Environment) -> Result<Vec<String>> {
        let invocation = Invocation::new(&self.executable)
            .overlay(EnvOverlay::replacing(environment))
            .args(["python", "-c", CMAKE_ARGS_SCRIPT, spec]);
        let line = self.single_line(&invocation)?;
        serde_json::from_str(&line).map_err(|e| {
            ExternalToolError::BadOutput {
                command: invocation.display(),
                error: e.to_string(),
            }
            .into()
        })
    }
}
