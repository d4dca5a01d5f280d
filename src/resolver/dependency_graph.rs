//! Graph of pinned packages and their direct dependencies.
//!
//! Used after solving to compute which pins belong to a category: exactly the
//! packages reachable from that category's requirements. Cycles are allowed.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::{BTreeSet, HashMap};

/// Directed graph, edge `a → b` meaning "a depends on b".
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(name) {
            return index;
        }
        let index = self.graph.add_node(name.to_string());
        self.node_map.insert(name.to_string(), index);
        index
    }

    /// Add a package with no edges (no-op if present).
    pub fn add_package(&mut self, name: &str) {
        self.ensure_node(name);
    }

    /// Record that `from` depends on `to`.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from = self.ensure_node(from);
        let to = self.ensure_node(to);
        if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Every package reachable from `roots`, roots included. Unknown roots are ignored.
    #[must_use]
    pub fn closure<'a>(&self, roots: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        let mut reached = BTreeSet::new();
        for root in roots {
            let Some(&start) = self.node_map.get(root) else {
                continue;
            };
            let mut dfs = Dfs::new(&self.graph, start);
            while let Some(node) = dfs.next(&self.graph) {
                reached.insert(self.graph[node].clone());
            }
        }
        reached
    }

    /// Number of packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph has no packages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_follows_edges_only() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("requests", "idna");
        graph.add_dependency("requests", "certifi");
        graph.add_dependency("pytest", "pluggy");
        graph.add_package("unrelated");

        let reached = graph.closure(["requests"]);
        assert_eq!(reached.into_iter().collect::<Vec<_>>(), vec!["certifi", "idna", "requests"]);
        assert_eq!(graph.len(), 6);
    }

    #[test]
    fn test_closure_tolerates_cycles_and_unknown_roots() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "b");
        graph.add_dependency("b", "a");

        let reached = graph.closure(["a", "missing"]);
        assert_eq!(reached.len(), 2);
        assert!(DependencyGraph::new().is_empty());
    }
}
