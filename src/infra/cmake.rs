//! Superbuild bootstrap
//!
//! Runs CMake once in `build/` to configure the generated superbuild.

use crate::core::area::AreaLayout;
use crate::core::environment::shell_quote;
use crate::error::{ExternalToolError, Result};
use crate::infra::filesystem;
use crate::infra::process::{EnvOverlay, Invocation, ProcessOutput};

/// Marker CMake prints when a package's source directory is empty
const MISSING_SOURCES_MARKER: &str = "No download info given";

/// Configure the superbuild in the area's build directory
///
/// On failure the error carries the captured output together with the
/// commands needed to retry by hand. With `sources_skipped`, a hint is added
/// when the output shows that sources are missing.
pub fn bootstrap(
    cmake: &str,
    layout: &AreaLayout,
    generator: &str,
    overlay: EnvOverlay,
    sources_skipped: bool,
) -> Result<ProcessOutput> {
    let build_dir = layout.build_dir();
    filesystem::create_dir_all(&build_dir)?;

    let invocation = Invocation::new(cmake)
        .args(["../srcs", "-G", generator])
        .overlay(overlay)
        .current_dir(&build_dir)
        .allow_failure();
    let output = invocation.output()?;
    if output.success() {
        return Ok(output);
    }

    let combined = format!("{}{}", output.stdout_lossy(), output.stderr);
    let mut diagnostics = format!(
        "{}\nThe development area has been initialized, but the initial CMake command failed. \
         Check the output above for details and run:\n  . {}\n  cd {}\n  {}\nwhen you have addressed any problems.",
        combined.trim_end(),
        shell_quote(&layout.env_script().to_string_lossy()),
        shell_quote(&build_dir.to_string_lossy()),
        invocation.display(),
    );
    if sources_skipped && combined.contains(MISSING_SOURCES_MARKER) {
        diagnostics
            .push_str("\nOutput indicates that sources are missing: please rectify and retry.");
    }

    Err(ExternalToolError::CommandFailed {
        command: invocation.display(),
        status: output.status,
        stderr: diagnostics,
    }
    .into())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::SpackdevError;
    use tempfile::TempDir;

    fn fake_cmake(dir: &TempDir, body: &str) -> String {
        let path = dir.path().join("fake-cmake");
        filesystem::write_executable(&path, &format!("#!/bin/sh\n{body}\n")).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_bootstrap_runs_in_build_dir() {
        let tools = TempDir::new().unwrap();
        let area = TempDir::new().unwrap();
        let layout = AreaLayout::new(area.path());
        let cmake = fake_cmake(&tools, "pwd; echo \"$@\"");

        let output = bootstrap(&cmake, &layout, "Ninja", EnvOverlay::new(), false).unwrap();
        let stdout = output.stdout_lossy();
        assert!(stdout.contains("build"));
        assert!(stdout.contains("../srcs -G Ninja"));
        assert!(layout.build_dir().is_dir());
    }

    #[test]
    fn test_bootstrap_failure_diagnostics() {
        let tools = TempDir::new().unwrap();
        let area = TempDir::new().unwrap();
        let layout = AreaLayout::new(area.path());
        let cmake = fake_cmake(&tools, "echo 'No download info given for art' >&2; exit 1");

        let err =
            bootstrap(&cmake, &layout, "Unix Makefiles", EnvOverlay::new(), true).unwrap_err();
        match err {
            SpackdevError::ExternalTool(ExternalToolError::CommandFailed {
                status, stderr, ..
            }) => {
                assert_eq!(status, 1);
                assert!(stderr.contains("env.sh"));
                assert!(stderr.contains("'Unix Makefiles'"));
                assert!(stderr.contains("sources are missing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_sources_hint_needs_skipped_stage() {
        let tools = TempDir::new().unwrap();
        let area = TempDir::new().unwrap();
        let layout = AreaLayout::new(area.path());
        let cmake = fake_cmake(&tools, "echo 'No download info given' >&2; exit 2");

        let err = bootstrap(&cmake, &layout, "Ninja", EnvOverlay::new(), false).unwrap_err();
        assert!(!err.to_string().contains("sources are missing"));
    }
}
