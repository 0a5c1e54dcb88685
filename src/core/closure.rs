//! Development closure computation
//!
//! Given the packages a developer asked for, find every package that sits
//! strictly between two of them in the dependency graph. Such packages link
//! against one selected package and are linked by another, so they must be
//! rebuilt from source as well for the result to be consistent.

use std::collections::{HashSet, VecDeque};

use crate::core::graph::DependencyGraph;
use crate::error::ConfigError;

/// Result of closure computation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closure {
    /// Packages pulled in from source, in discovery order
    pub additional: Vec<String>,
    /// Packages consumed prebuilt, in discovery order
    pub external: Vec<String>,
}

/// Insertion-ordered set of package names
#[derive(Debug, Default)]
struct OrderedSet {
    order: Vec<String>,
    members: HashSet<String>,
}

impl OrderedSet {
    fn insert(&mut self, name: &str) -> bool {
        if self.members.insert(name.to_string()) {
            self.order.push(name.to_string());
            true
        } else {
            false
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.order.retain(|name| keep(name.as_str()));
        self.members.retain(|name| keep(name.as_str()));
    }
}

/// Compute the additional and external package sets
///
/// Fixed point over the graph: a package `p` joins the selection when it is a
/// direct dependent of a selected package and also appears in the flattened
/// dependencies of the selection.
pub fn compute_closure(
    requested: &[String],
    graph: &DependencyGraph,
) -> Result<Closure, ConfigError> {
    if let Some(missing) = requested.iter().find(|name| !graph.contains(name)) {
        return Err(ConfigError::UnknownPackage {
            name: missing.clone(),
        });
    }

    let mut done = OrderedSet::default();
    for name in requested {
        done.insert(name);
    }

    let mut deps = OrderedSet::default();
    for name in requested {
        for dep in graph.flat_dependencies(name) {
            deps.insert(&dep);
        }
    }

    let mut queue: VecDeque<String> = done.order.iter().cloned().collect();
    while let Some(package) = queue.pop_front() {
        let found: Vec<String> = graph
            .dependents(&package)
            .iter()
            .filter(|dependent| deps.contains(dependent) && !done.contains(dependent))
            .cloned()
            .collect();

        for name in &found {
            tracing::debug!("'{name}' depends on '{package}' and is needed by the selection");
            done.insert(name);
            for dep in graph.flat_dependencies(name) {
                deps.insert(&dep);
            }
            queue.push_back(name.clone());
        }
        deps.retain(|name| !done.contains(name));
    }
    deps.retain(|name| !done.contains(name));

    let additional: Vec<String> = done
        .order
        .into_iter()
        .filter(|name| !requested.contains(name))
        .collect();
    tracing::debug!("Full list of additional packages: {additional:?}");

    Ok(Closure {
        additional,
        external: deps.order,
    })
}

/// Graph roots that reach no development package at all
///
/// These come from a DAG file naming unrelated specs; they are installed
/// as ordinary prebuilt dependencies.
pub fn unrelated_roots(dev_packages: &[String], graph: &DependencyGraph) -> Vec<String> {
    graph
        .roots()
        .iter()
        .filter(|root| !dev_packages.contains(root) && !graph.depends_on_any(root, dev_packages))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::tests::graph;
    use crate::core::graph::PackageNode;
    use proptest::prelude::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_single_request_has_no_additional() {
        let g = graph(&[("A", &["B"]), ("B", &["C"]), ("C", &[])]);
        let closure = compute_closure(&names(&["A"]), &g).unwrap();
        assert!(closure.additional.is_empty());
        assert_eq!(closure.external, ["B", "C"]);
    }

    #[test]
    fn test_package_between_requests_is_additional() {
        let g = graph(&[("A", &["B"]), ("B", &["C"]), ("C", &[])]);
        let closure = compute_closure(&names(&["A", "C"]), &g).unwrap();
        assert_eq!(closure.additional, ["B"]);
        assert!(closure.external.is_empty());
    }

    #[test]
    fn test_requested_dependency_is_not_external() {
        let g = graph(&[("A", &["B", "D"]), ("B", &["D"]), ("D", &["E"]), ("E", &[])]);
        let closure = compute_closure(&names(&["A", "B"]), &g).unwrap();
        assert!(closure.additional.is_empty());
        assert_eq!(closure.external, ["D", "E"]);
    }

    #[test]
    fn test_disconnected_requests() {
        let g = graph(&[("A", &["X"]), ("B", &["Y"]), ("X", &[]), ("Y", &[])]);
        let closure = compute_closure(&names(&["A", "B"]), &g).unwrap();
        assert!(closure.additional.is_empty());
        assert_eq!(closure.external, ["X", "Y"]);
    }

    #[test]
    fn test_long_chain_pulls_in_every_intermediate() {
        let g = graph(&[
            ("top", &["m1", "side"]),
            ("m1", &["m2"]),
            ("m2", &["bottom"]),
            ("side", &[]),
            ("bottom", &["base"]),
            ("base", &[]),
        ]);
        let closure = compute_closure(&names(&["top", "bottom"]), &g).unwrap();
        assert_eq!(closure.additional, ["m2", "m1"]);
        assert_eq!(closure.external, ["side", "base"]);
    }

    #[test]
    fn test_unknown_requested_package() {
        let g = graph(&[("A", &[])]);
        assert!(matches!(
            compute_closure(&names(&["A", "nope"]), &g),
            Err(ConfigError::UnknownPackage { ref name }) if name == "nope"
        ));
    }

    #[test]
    fn test_unrelated_roots() {
        let g = graph(&[("A", &["B"]), ("B", &[]), ("tool", &[]), ("app", &["A"])]);
        assert_eq!(unrelated_roots(&names(&["B"]), &g), ["tool"]);
    }

    /// Random DAG where node i may depend only on nodes j > i
    fn dag_strategy() -> impl Strategy<Value = (DependencyGraph, Vec<String>)> {
        (2usize..9)
            .prop_flat_map(|n| {
                (
                    Just(n),
                    proptest::collection::vec(any::<bool>(), n * n),
                    proptest::collection::vec(any::<bool>(), n),
                )
            })
            .prop_map(|(n, edges, picks)| {
                let nodes = (0..n).map(|i| {
                    let deps: Vec<String> = ((i + 1)..n)
                        .filter(|j| edges[i * n + j])
                        .map(|j| format!("p{j}"))
                        .collect();
                    PackageNode {
                        dependencies: deps,
                        ..PackageNode::new(&format!("p{i}"), "1", &[])
                    }
                });
                let g = DependencyGraph::from_nodes(nodes).unwrap();
                let mut requested: Vec<String> = (0..n)
                    .filter(|i| picks[*i])
                    .map(|i| format!("p{i}"))
                    .collect();
                if requested.is_empty() {
                    requested.push("p0".to_string());
                }
                (g, requested)
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_additional_disjoint_from_requested((g, requested) in dag_strategy()) {
            let closure = compute_closure(&requested, &g).unwrap();
            for name in &closure.additional {
                prop_assert!(!requested.contains(name));
            }
            for name in &closure.external {
                prop_assert!(!requested.contains(name));
                prop_assert!(!closure.additional.contains(name));
            }
        }

        #[test]
        fn prop_selection_is_closed((g, requested) in dag_strategy()) {
            let closure = compute_closure(&requested, &g).unwrap();
            let selected: Vec<String> = requested
                .iter()
                .chain(closure.additional.iter())
                .cloned()
                .collect();
            for node in g.nodes() {
                if selected.contains(&node.name) {
                    continue;
                }
                let reaches_selected = g.depends_on_any(&node.name, &selected);
                let reached_by_selected = selected
                    .iter()
                    .any(|s| g.flat_dependencies(s).contains(&node.name));
                prop_assert!(
                    !(reaches_selected && reached_by_selected),
                    "{} lies between selected packages {:?}",
                    node.name,
                    selected
                );
            }
        }
    }
}
