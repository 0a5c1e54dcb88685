//! Superbuild plan generation
//!
//! Development packages are emitted by repeated leaf removal: a package is
//! emitted once none of the packages still pending are among its direct
//! dependencies. Each emitted [`BuildNode`] depends on the development
//! packages it directly depends on, so every edge target is emitted first.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::core::area::AreaLayout;
use crate::core::build_system::{BuildSystem, ToolSelection};
use crate::core::graph::DependencyGraph;
use crate::core::path_rewrite::PathRewriter;
use crate::error::PlanError;

/// Project name of the generated superbuild
pub const SUPERBUILD_PROJECT: &str = "spackdev";

/// One package of the superbuild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildNode {
    /// Package name
    pub package: String,
    /// Configuration arguments, generator flags removed and paths redirected
    pub args: Vec<String>,
    /// Development packages this package directly depends on
    pub dependencies: Vec<String>,
    /// Generator and build tool for this node
    pub tool: ToolSelection,
}

/// Complete superbuild description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDescription {
    /// Superbuild project name
    pub project: String,
    /// Install prefix root (`<base>/install`)
    pub prefix: PathBuf,
    /// Source root (`<base>/srcs`)
    pub source_dir: PathBuf,
    /// Scratch root (`<base>/tmp`)
    pub tmp_dir: PathBuf,
    /// Root of the per-package command shims
    pub wrappers_dir: PathBuf,
    /// Nodes in emission order
    pub nodes: Vec<BuildNode>,
}

impl BuildDescription {
    /// Path of the shim for `tool` of `package`
    pub fn wrapper(&self, package: &str, tool: &str) -> PathBuf {
        self.wrappers_dir.join(package).join("bin").join(tool)
    }
}

/// Remove generator selections from configuration arguments
///
/// Returns the remaining arguments and the last generator named by a
/// `-G<generator>` or `-G <generator>` argument.
pub fn filter_generator_args(args: &[String]) -> (Vec<String>, Option<String>) {
    let mut filtered = Vec::with_capacity(args.len());
    let mut generator = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.strip_prefix("-G") {
            Some("") => {
                if let Some(value) = iter.next() {
                    generator = Some(value.clone());
                }
            }
            Some(inline) => generator = Some(inline.to_string()),
            None => filtered.push(arg.clone()),
        }
    }
    (filtered, generator)
}

/// Build the superbuild description for `dev_packages`
///
/// `args_by_package` holds the raw configuration arguments of each package;
/// packages without an entry are configured with no extra arguments.
pub fn write_plan(
    dev_packages: &[String],
    graph: &DependencyGraph,
    build_system: &BuildSystem,
    rewriter: &mut PathRewriter,
    args_by_package: &BTreeMap<String, Vec<String>>,
    layout: &AreaLayout,
) -> Result<BuildDescription, PlanError> {
    if let Some(unknown) = dev_packages.iter().find(|p| !graph.contains(p)) {
        return Err(PlanError::UnknownPackage {
            package: unknown.clone(),
        });
    }
    for (index, package) in dev_packages.iter().enumerate() {
        if dev_packages[..index].contains(package) {
            return Err(PlanError::DuplicatePackage {
                package: package.clone(),
            });
        }
    }

    let mut remaining: Vec<&String> = dev_packages.iter().collect();
    let mut nodes = Vec::with_capacity(dev_packages.len());

    while !remaining.is_empty() {
        let leaf_index = remaining.iter().position(|candidate| {
            graph
                .dependencies(candidate)
                .iter()
                .all(|dep| dep == *candidate || !remaining.contains(&dep))
        });
        let Some(index) = leaf_index else {
            return Err(PlanError::CircularDependency {
                remaining: remaining.iter().map(|s| (*s).clone()).collect(),
            });
        };
        let package = remaining.remove(index);

        let dependencies: Vec<String> = graph
            .dependencies(package)
            .iter()
            .filter(|dep| dev_packages.contains(dep))
            .cloned()
            .collect();

        let raw_args = args_by_package.get(package).map_or(&[][..], Vec::as_slice);
        let (filtered, package_generator) = filter_generator_args(raw_args);
        let tool = build_system.select_for(package_generator.as_deref())?;

        let mut active = Vec::with_capacity(dependencies.len() + 1);
        active.push(package.as_str());
        active.extend(dependencies.iter().map(String::as_str));
        rewriter.set_active_packages(&active);
        let args = filtered.iter().map(|arg| rewriter.rewrite(arg)).collect();

        tracing::debug!("Superbuild node '{package}' depends on {dependencies:?}");
        nodes.push(BuildNode {
            package: package.clone(),
            args,
            dependencies,
            tool,
        });
    }

    Ok(BuildDescription {
        project: SUPERBUILD_PROJECT.to_string(),
        prefix: layout.install_dir(),
        source_dir: layout.srcs_dir(),
        tmp_dir: layout.tmp_dir(),
        wrappers_dir: layout.aux_packages_dir(),
        nodes,
    })
}
