//! Install argument formatting
//!
//! Dependencies are installed with fully pinned specs so the package manager
//! reproduces exactly the concretization recorded in the area:
//! `name@version%compiler@version+flag~flag key=value ^dep...`.

use std::collections::HashSet;

use crate::core::graph::{DependencyGraph, PackageNode, VariantValue};

/// One install command: a root spec followed by `^dep` constraints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Package installed by this request
    pub package: String,
    /// Arguments for the package manager's install command
    pub args: Vec<String>,
}

/// Render a variant, or `None` when it contributes nothing
fn format_variant(name: &str, value: &VariantValue) -> Option<String> {
    match value {
        VariantValue::Bool(true) => Some(format!("+{name}")),
        VariantValue::Bool(false) => Some(format!("~{name}")),
        VariantValue::List(items) if items.is_empty() => None,
        VariantValue::List(items) => Some(format!(" {name}={}", items.join(","))),
        VariantValue::Single(value) => Some(format!(" {name}={value}")),
    }
}

/// Fully pinned spec of one package
pub fn install_args_for_package(node: &PackageNode) -> String {
    let mut spec = format!("{}@{}", node.name, node.version);
    if let Some(compiler) = &node.compiler {
        spec.push_str(&format!("%{}@{}", compiler.name, compiler.version));
    }

    let (flags, settings): (Vec<String>, Vec<String>) = node
        .variants
        .iter()
        .filter_map(|(name, value)| format_variant(name, value))
        .partition(|s| s.starts_with(['+', '~']));
    for part in flags.iter().chain(&settings) {
        spec.push_str(part);
    }
    spec
}

/// Install requests for everything the development packages need
///
/// Starting from `dev_packages` and `extra_roots`, packages that are under
/// development or depend on one are never installed; their dependencies are
/// examined instead. Every other package is installed with its full
/// dependency closure pinned.
pub fn format_dependencies_for_install(
    dev_packages: &[String],
    extra_roots: &[String],
    graph: &DependencyGraph,
) -> Vec<InstallRequest> {
    let mut to_examine: Vec<String> = dev_packages.iter().chain(extra_roots).cloned().collect();
    let mut queued: HashSet<String> = to_examine.iter().cloned().collect();
    let mut covered: HashSet<String> = HashSet::new();
    let mut requests = Vec::new();

    let mut index = 0;
    while index < to_examine.len() {
        let package = to_examine[index].clone();
        index += 1;
        if covered.contains(&package) {
            continue;
        }

        if dev_packages.contains(&package) || graph.depends_on_any(&package, dev_packages) {
            for dep in graph.dependencies(&package) {
                if !dev_packages.contains(dep) && queued.insert(dep.clone()) {
                    to_examine.push(dep.clone());
                }
            }
            continue;
        }

        let Some(node) = graph.node(&package) else {
            tracing::warn!("No concretized spec for '{package}': not installing it");
            continue;
        };
        let deps = graph.flat_dependencies(&package);
        let mut args = vec![install_args_for_package(node)];
        args.extend(
            deps.iter()
                .filter_map(|dep| graph.node(dep))
                .map(|dep| format!("^{}", install_args_for_package(dep))),
        );
        covered.insert(package.clone());
        covered.extend(deps);
        requests.push(InstallRequest { package, args });
    }
    requests
}
