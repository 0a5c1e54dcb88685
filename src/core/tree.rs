//! Dependency tree display
//!
//! Prints the smallest set of dependency trees, rooted at development
//! packages, in which every development package appears at least once.

use std::collections::HashSet;

use crate::core::graph::DependencyGraph;
use crate::core::install_args::install_args_for_package;

/// Development packages whose trees cover all the others
///
/// A package already shown in an earlier tree starts no tree of its own, and
/// a later tree swallows earlier roots it contains.
pub fn covering_roots(dev_packages: &[String], graph: &DependencyGraph) -> Vec<String> {
    let mut roots: Vec<String> = Vec::new();
    let mut shown: HashSet<String> = HashSet::new();

    for package in dev_packages {
        if shown.contains(package) || !graph.contains(package) {
            continue;
        }
        let mut covered = graph.flat_dependencies(package);
        covered.push(package.clone());
        roots.retain(|root| !covered.contains(root));
        shown.extend(covered);
        roots.push(package.clone());
    }
    roots
}

/// Format the tree below `root`, each node shown once
pub fn format_tree(root: &str, graph: &DependencyGraph) -> String {
    let mut output = String::new();
    let mut visited = HashSet::new();
    output.push_str(&label(root, graph));
    output.push('\n');
    visited.insert(root.to_string());
    format_children(&mut output, root, "", graph, &mut visited);
    output
}

/// Format the covering trees of `dev_packages`, separated by blank lines
pub fn format_spec_trees(dev_packages: &[String], graph: &DependencyGraph) -> String {
    covering_roots(dev_packages, graph)
        .iter()
        .map(|root| format_tree(root, graph))
        .collect::<Vec<_>>()
        .join("\n")
}

fn label(package: &str, graph: &DependencyGraph) -> String {
    graph
        .node(package)
        .map_or_else(|| package.to_string(), install_args_for_package)
}

fn format_children(
    output: &mut String,
    node: &str,
    prefix: &str,
    graph: &DependencyGraph,
    visited: &mut HashSet<String>,
) {
    let children: Vec<&String> = graph
        .dependencies(node)
        .iter()
        .filter(|dep| !visited.contains(*dep))
        .collect();
    for dep in &children {
        visited.insert((*dep).clone());
    }

    for (i, dep) in children.iter().enumerate() {
        let is_last = i == children.len() - 1;
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", label(dep, graph)));

        let child_prefix = if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };
        format_children(output, dep, &child_prefix, graph, visited);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::tests::graph;

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_covering_roots_drop_contained_trees() {
        let g = graph(&[
            ("art", &["canvas"]),
            ("canvas", &["cetlib"]),
            ("cetlib", &[]),
            ("larsoft", &["cetlib"]),
        ]);
        assert_eq!(covering_roots(&strings(&["cetlib", "art"]), &g), ["art"]);
        assert_eq!(covering_roots(&strings(&["art", "cetlib"]), &g), ["art"]);
        assert_eq!(
            covering_roots(&strings(&["art", "larsoft"]), &g),
            ["art", "larsoft"]
        );
    }

    #[test]
    fn test_format_tree() {
        let g = graph(&[
            ("art", &["canvas", "boost"]),
            ("canvas", &["boost", "root"]),
            ("boost", &[]),
            ("root", &[]),
        ]);
        let expected = "\
art@1.0
├── canvas@1.0
│   └── root@1.0
└── boost@1.0
";
        assert_eq!(format_tree("art", &g), expected);
    }

    #[test]
    fn test_format_spec_trees_joins_roots() {
        let g = graph(&[("a", &[]), ("b", &[])]);
        assert_eq!(format_spec_trees(&strings(&["a", "b"]), &g), "a@1.0\n\nb@1.0\n");
    }
}
