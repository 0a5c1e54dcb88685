//! Concretized dependency graph
//!
//! The graph is produced by the package manager and is read-only here.
//! Nodes are keyed by package name; each concretized package appears once.

use std::collections::{BTreeMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Compiler a package was concretized with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compiler {
    /// Compiler name (e.g., "gcc")
    pub name: String,
    /// Compiler version (e.g., "9.3.0")
    pub version: String,
}

/// Value of a build variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantValue {
    /// Boolean variant (`+name` / `~name`)
    Bool(bool),
    /// Multi-valued variant or flag list
    List(Vec<String>),
    /// Single-valued variant
    Single(String),
}

impl VariantValue {
    fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::String(s) => Some(Self::Single(s.clone())),
            serde_json::Value::Number(n) => Some(Self::Single(n.to_string())),
            serde_json::Value::Array(items) => Some(Self::List(
                items
                    .iter()
                    .map(|item| match item {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            )),
            _ => None,
        }
    }
}

/// A concretized package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageNode {
    /// Package name
    pub name: String,
    /// Concretized version
    pub version: String,
    /// Compiler, when the package manager reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<Compiler>,
    /// Build variants and flags
    #[serde(default)]
    pub variants: BTreeMap<String, VariantValue>,
    /// Direct dependency names
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Package manager hash identifying this concretization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl PackageNode {
    /// Create a node with no attributes beyond name, version and dependencies
    pub fn new(name: &str, version: &str, dependencies: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            compiler: None,
            variants: BTreeMap::new(),
            dependencies: dependencies.iter().map(ToString::to_string).collect(),
            hash: None,
        }
    }
}

/// Immutable dependency graph
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, PackageNode>,
    dependents: BTreeMap<String, Vec<String>>,
    roots: Vec<String>,
}

impl DependencyGraph {
    /// Build a graph from nodes, verifying every edge has a target
    pub fn from_nodes(nodes: impl IntoIterator<Item = PackageNode>) -> Result<Self, GraphError> {
        let mut by_name = BTreeMap::new();
        for node in nodes {
            if let Some(existing) = by_name.get(&node.name) {
                if existing != &node {
                    tracing::debug!("Ignoring duplicate node for '{}'", node.name);
                }
                continue;
            }
            by_name.insert(node.name.clone(), node);
        }

        let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for node in by_name.values() {
            for dep in &node.dependencies {
                if !by_name.contains_key(dep) {
                    return Err(GraphError::MissingDependency {
                        package: node.name.clone(),
                        dependency: dep.clone(),
                    });
                }
                let entry = dependents.entry(dep.clone()).or_default();
                if !entry.contains(&node.name) {
                    entry.push(node.name.clone());
                }
            }
        }

        let roots = by_name
            .keys()
            .filter(|name| !dependents.contains_key(*name))
            .cloned()
            .collect();

        Ok(Self {
            nodes: by_name,
            dependents,
            roots,
        })
    }

    /// Parse `spack spec --json` output (one JSON document per root spec)
    pub fn from_spack_json(text: &str) -> Result<Self, GraphError> {
        let mut nodes = Vec::new();
        let stream = serde_json::Deserializer::from_str(text).into_iter::<SpackDocument>();
        for document in stream {
            let document = document.map_err(|e| GraphError::Parse(e.to_string()))?;
            nodes.extend(document.spec.nodes.into_iter().map(SpackNode::into_node));
        }
        if nodes.is_empty() {
            return Err(GraphError::Parse("no concretized specs in output".to_string()));
        }
        Self::from_nodes(nodes)
    }

    /// Look up a node
    pub fn node(&self, name: &str) -> Option<&PackageNode> {
        self.nodes.get(name)
    }

    /// Check whether a package is part of the graph
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// All nodes, ordered by name
    pub fn nodes(&self) -> impl Iterator<Item = &PackageNode> {
        self.nodes.values()
    }

    /// Number of packages
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no packages
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Packages nothing else depends on
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Direct dependencies of a package
    pub fn dependencies(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map_or(&[][..], |node| node.dependencies.as_slice())
    }

    /// Direct dependents of a package
    pub fn dependents(&self, name: &str) -> &[String] {
        self.dependents.get(name).map_or(&[][..], Vec::as_slice)
    }

    /// All transitive dependencies of a package, breadth-first, excluding itself
    pub fn flat_dependencies(&self, name: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<&str> =
            self.dependencies(name).iter().map(String::as_str).collect();

        while let Some(current) = queue.pop_front() {
            if current == name || !seen.insert(current) {
                continue;
            }
            order.push(current.to_string());
            queue.extend(self.dependencies(current).iter().map(String::as_str));
        }

        order
    }

    /// Whether `package` depends, directly or not, on any of `targets`
    pub fn depends_on_any(&self, package: &str, targets: &[String]) -> bool {
        self.flat_dependencies(package)
            .iter()
            .any(|dep| targets.contains(dep))
    }
}

#[derive(Deserialize)]
struct SpackDocument {
    spec: SpackSpec,
}

#[derive(Deserialize)]
struct SpackSpec {
    nodes: Vec<SpackNode>,
}

#[derive(Deserialize)]
struct SpackNode {
    name: String,
    version: serde_json::Value,
    #[serde(default)]
    compiler: Option<Compiler>,
    #[serde(default)]
    parameters: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    dependencies: Vec<SpackEdge>,
    #[serde(default)]
    hash: Option<String>,
}

#[derive(Deserialize)]
struct SpackEdge {
    name: String,
}

impl SpackNode {
    fn into_node(self) -> PackageNode {
        let version = match self.version {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        let variants = self
            .parameters
            .iter()
            .filter_map(|(key, value)| VariantValue::from_json(value).map(|v| (key.clone(), v)))
            .collect();
        PackageNode {
            name: self.name,
            version,
            compiler: self.compiler,
            variants,
            dependencies: self.dependencies.into_iter().map(|edge| edge.name).collect(),
            hash: self.hash,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a graph from `(name, deps)` pairs
    pub(crate) fn graph(edges: &[(&str, &[&str])]) -> DependencyGraph {
        DependencyGraph::from_nodes(
            edges
                .iter()
                .map(|(name, deps)| PackageNode::new(name, "1.0", deps)),
        )
        .unwrap()
    }

    #[test]
    fn test_dependents_are_inverse_of_dependencies() {
        let g = graph(&[("a", &["b", "c"]), ("b", &["c"]), ("c", &[])]);
        assert_eq!(g.dependents("c"), ["a", "b"]);
        assert_eq!(g.dependents("b"), ["a"]);
        assert!(g.dependents("a").is_empty());
        assert_eq!(g.roots(), ["a"]);
    }

    #[test]
    fn test_flat_dependencies_breadth_first() {
        let g = graph(&[("a", &["b", "d"]), ("b", &["c"]), ("c", &[]), ("d", &["c"])]);
        assert_eq!(g.flat_dependencies("a"), ["b", "d", "c"]);
        assert!(g.flat_dependencies("c").is_empty());
        assert!(g.depends_on_any("a", &["c".to_string()]));
        assert!(!g.depends_on_any("c", &["a".to_string()]));
    }

    #[test]
    fn test_missing_edge_target_rejected() {
        let result = DependencyGraph::from_nodes(vec![PackageNode::new("a", "1", &["zzz"])]);
        assert!(matches!(
            result,
            Err(GraphError::MissingDependency { ref dependency, .. }) if dependency == "zzz"
        ));
    }

    #[test]
    fn test_from_spack_json_stream() {
        let json = r#"
{"spec": {"_meta": {"version": 4}, "nodes": [
  {"name": "art", "version": "3.02.00", "compiler": {"name": "gcc", "version": "9.3.0"},
   "parameters": {"cxxstd": "17", "shared": true, "cflags": []},
   "dependencies": [{"name": "canvas", "hash": "abc", "type": ["build", "link"]}],
   "hash": "h1"},
  {"name": "canvas", "version": "3.01.00", "hash": "abc"}
]}}
{"spec": {"nodes": [{"name": "cetmodules", "version": 2}]}}
"#;
        let g = DependencyGraph::from_spack_json(json).unwrap();
        assert_eq!(g.len(), 3);
        let art = g.node("art").unwrap();
        assert_eq!(art.dependencies, ["canvas"]);
        assert_eq!(art.compiler.as_ref().unwrap().name, "gcc");
        assert_eq!(art.variants.get("shared"), Some(&VariantValue::Bool(true)));
        assert_eq!(
            art.variants.get("cxxstd"),
            Some(&VariantValue::Single("17".to_string()))
        );
        assert_eq!(g.node("cetmodules").unwrap().version, "2");
    }

    #[test]
    fn test_from_spack_json_rejects_empty() {
        assert!(DependencyGraph::from_spack_json("").is_err());
        assert!(DependencyGraph::from_spack_json("{\"spec\": 3}").is_err());
    }
}
