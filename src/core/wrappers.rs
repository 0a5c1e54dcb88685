//! Tool and compiler wrappers
//!
//! Three kinds of wrappers make builds in the area use the right tools:
//!
//! - global links in `spackdev-aux/bin` to the build tools of the graph
//! - per-package command shims that run a tool inside the package's build
//!   environment
//! - per-package copies of the compiler wrapper scripts with the package's
//!   variables injected after the interpreter line

use std::path::PathBuf;

use crate::core::area::AreaLayout;
use crate::core::environment::{shell_quote, Environment};
use crate::core::graph::DependencyGraph;
use crate::core::install_args::install_args_for_package;
use crate::error::Result;
use crate::infra::filesystem;
use crate::infra::spack::PackageManager;

/// Tools shimmed for every development package
pub const SHIMMED_TOOLS: [&str; 4] = ["cmake", "ctest", "make", "ninja"];

/// Global tool links and the package providing each
const GLOBAL_TOOLS: [(&str, &str); 4] = [
    ("cmake", "cmake"),
    ("ctest", "cmake"),
    ("make", "make"),
    ("ninja", "ninja"),
];

/// Variables naming compiler wrapper scripts
const COMPILER_VARIABLES: [&str; 4] = ["CC", "CXX", "F77", "FC"];

const BEGIN_MARKER: &str = "# begin SpackDev variables";
const END_MARKER: &str = "# end SpackDev variables";

/// Link the build tools found in `graph` into `spackdev-aux/bin`
///
/// Tools whose package is not in the graph are left to `PATH`.
/// Returns the tools that were linked.
pub fn link_global_tools(
    layout: &AreaLayout,
    graph: &DependencyGraph,
    pm: &dyn PackageManager,
) -> Result<Vec<String>> {
    let bin_dir = layout.aux_bin_dir();
    filesystem::create_dir_all(&bin_dir)?;

    let mut linked = Vec::new();
    for (tool, package) in GLOBAL_TOOLS {
        let Some(node) = graph.node(package) else {
            tracing::info!(
                "Unable to find tool {tool} from package {package} in current dependencies: expect to find in PATH instead"
            );
            continue;
        };
        let prefix = pm.install_prefix(&install_args_for_package(node))?;
        let target = prefix.join("bin").join(tool);
        let link = bin_dir.join(tool);
        tracing::debug!("Link: {} -> {}", link.display(), target.display());
        filesystem::symlink(&target, &link)?;
        linked.push(tool.to_string());
    }
    Ok(linked)
}

/// Contents of the shim running `tool` in the build environment of `package`
pub fn command_shim(launcher: &str, package: &str, tool: &str) -> String {
    format!(
        "#!/bin/bash\nexec {} build-env -- {package} {} \"$@\"\n",
        shell_quote(launcher),
        shell_quote(tool)
    )
}

/// Write the command shims of `package`
///
/// A shim runs the globally linked tool when one exists and otherwise the
/// tool found on `PATH` inside the package environment, `ninja_command`
/// standing in for `ninja`.
pub fn write_command_shims(
    layout: &AreaLayout,
    package: &str,
    launcher: &str,
    ninja_command: &str,
) -> Result<()> {
    let bin_dir = layout.package_bin_dir(package);
    filesystem::create_dir_all(&bin_dir)?;
    for tool in SHIMMED_TOOLS {
        let global = layout.aux_bin_dir().join(tool);
        let target = if global.exists() {
            global.to_string_lossy().into_owned()
        } else if tool == "ninja" {
            ninja_command.to_string()
        } else {
            tool.to_string()
        };
        let shim = command_shim(launcher, package, &target);
        filesystem::write_executable(&bin_dir.join(tool), &shim)?;
    }
    Ok(())
}

/// Copy `script` with the variables of `env` the compiler wrappers read
///
/// `PATH`, `CMAKE_PREFIX_PATH` and every `SPACK_*` variable are exported
/// between marker comments right after the interpreter line.
pub fn inject_variables(script: &str, env: &Environment) -> String {
    let (first, rest) = match script.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (script, ""),
    };

    let mut out = format!("{first}\n\n{BEGIN_MARKER}\n");
    for (name, value) in env.iter() {
        if matches!(name, "CMAKE_PREFIX_PATH" | "PATH") || name.starts_with("SPACK_") {
            out.push_str(&format!("export {name}={}\n", shell_quote(value)));
        }
    }
    out.push_str(END_MARKER);
    out.push_str("\n\n");
    out.push_str(rest);
    out
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
}

/// Copy the compiler wrappers named in `env` into the package's bin dir
///
/// Each compiler variable is pointed at the copy. Returns the new paths.
pub fn write_compiler_wrappers(
    layout: &AreaLayout,
    package: &str,
    env: &mut Environment,
) -> Result<Vec<PathBuf>> {
    let bin_dir = layout.package_bin_dir(package);
    filesystem::create_dir_all(&bin_dir)?;

    let mut written = Vec::new();
    for variable in COMPILER_VARIABLES {
        let Some(value) = env.get(variable) else {
            continue;
        };
        let source = PathBuf::from(unquote(value));
        let Some(file_name) = source.file_name() else {
            tracing::warn!("{variable}={value} does not name a compiler wrapper: leaving it alone");
            continue;
        };
        let dest = bin_dir.join(file_name);
        let script = filesystem::read_file(&source)?;
        env.insert(variable, dest.to_string_lossy());
        filesystem::write_executable(&dest, &inject_variables(&script, env))?;
        tracing::debug!("Compiler wrapper {variable}: {}", dest.display());
        written.push(dest);
    }
    Ok(written)
}
