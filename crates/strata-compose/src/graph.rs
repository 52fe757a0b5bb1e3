//! Service dependency graph management using `petgraph`.
//!
//! Builds a directed graph from `depends_on` declarations, extracts the
//! exact offending path when the graph is cyclic, and resolves the
//! topological startup order for the plan.

use std::collections::BTreeMap;

use strata_common::error::{Result, StrataError};

use crate::model::Manifest;

/// Node coloring for the cycle-finding depth-first search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// Not yet visited.
    White,
    /// On the current traversal stack.
    Gray,
    /// Fully explored.
    Black,
}

/// A dependency graph over the services of a merged manifest.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Internal petgraph representation; edges point from a dependent to
    /// its dependency.
    graph: petgraph::Graph<String, ()>,
    /// Service name to node lookup, iterated in name order for
    /// deterministic traversal roots.
    nodes: BTreeMap<String, petgraph::graph::NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: petgraph::Graph::new(),
            nodes: BTreeMap::new(),
        }
    }

    /// Builds the graph from a merged manifest.
    ///
    /// Services are inserted in name order. Dependencies on undefined
    /// services carry no edge; reference validation reports those before
    /// the graph is consulted.
    #[must_use]
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut built = Self::new();
        for name in manifest.services.keys() {
            let index = built.graph.add_node(name.clone());
            let _ = built.nodes.insert(name.clone(), index);
        }
        for (name, service) in &manifest.services {
            for dependency in &service.depends_on {
                if let (Some(&from), Some(&to)) =
                    (built.nodes.get(name), built.nodes.get(dependency))
                {
                    let _ = built.graph.add_edge(from, to, ());
                }
            }
        }
        built
    }

    /// Verifies the graph contains no dependency cycle.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::CyclicDependency`] carrying the services on
    /// the offending loop, in `depends_on` order starting from the
    /// alphabetically first service the search reached.
    pub fn ensure_acyclic(&self) -> Result<()> {
        match self.find_cycle() {
            Some(cycle) => Err(StrataError::CyclicDependency { cycle }),
            None => Ok(()),
        }
    }

    /// Returns the service startup order: dependencies before dependents.
    ///
    /// `petgraph::algo::toposort` orders dependents first under this edge
    /// orientation, so its output is reversed.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::CyclicDependency`] if the graph contains a
    /// cycle.
    pub fn startup_order(&self) -> Result<Vec<String>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(mut indices) => {
                indices.reverse();
                Ok(indices
                    .iter()
                    .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                    .collect())
            }
            Err(_) => Err(StrataError::CyclicDependency {
                cycle: self.find_cycle().unwrap_or_default(),
            }),
        }
    }

    /// Three-color depth-first search returning the first cycle found.
    ///
    /// Roots and neighbors are visited in name order, so the same manifest
    /// always reports the same cycle.
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks = vec![Mark::White; self.graph.node_count()];
        let mut stack = Vec::new();
        for &index in self.nodes.values() {
            if marks[index.index()] == Mark::White {
                if let Some(cycle) = self.visit(index, &mut marks, &mut stack) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn visit(
        &self,
        node: petgraph::graph::NodeIndex,
        marks: &mut [Mark],
        stack: &mut Vec<petgraph::graph::NodeIndex>,
    ) -> Option<Vec<String>> {
        marks[node.index()] = Mark::Gray;
        stack.push(node);
        let mut neighbors: Vec<_> = self.graph.neighbors(node).collect();
        neighbors.sort_by_key(|&next| self.graph.node_weight(next));
        for next in neighbors {
            match marks[next.index()] {
                Mark::Gray => {
                    // A gray neighbor is on the stack: the slice from its
                    // first occurrence is exactly the cycle, excluding any
                    // acyclic lead-in.
                    let start = stack.iter().position(|&held| held == next)?;
                    return Some(
                        stack[start..]
                            .iter()
                            .filter_map(|&held| self.graph.node_weight(held).cloned())
                            .collect(),
                    );
                }
                Mark::White => {
                    if let Some(cycle) = self.visit(next, marks, stack) {
                        return Some(cycle);
                    }
                }
                Mark::Black => {}
            }
        }
        let _ = stack.pop();
        marks[node.index()] = Mark::Black;
        None
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::loader;

    fn graph_of(source: &str) -> DependencyGraph {
        let manifest = loader::load_str(source, Path::new("test.yaml")).expect("should load");
        DependencyGraph::from_manifest(&manifest)
    }

    #[test]
    fn empty_graph_resolves_to_empty_order() {
        let graph = DependencyGraph::new();
        let order = graph.startup_order().expect("should resolve");
        assert!(order.is_empty());
    }

    #[test]
    fn dependencies_start_before_dependents() {
        let graph = graph_of(
            "services:\n  api:\n    depends_on: [db, cache]\n  web:\n    depends_on: [api]\n  db: {}\n  cache: {}\n",
        );
        let order = graph.startup_order().expect("should resolve");
        assert_eq!(order.len(), 4);
        let pos = |name: &str| order.iter().position(|n| n == name).expect(name);
        assert!(pos("db") < pos("api"));
        assert!(pos("cache") < pos("api"));
        assert!(pos("api") < pos("web"));
    }

    #[test]
    fn startup_order_is_stable_across_builds() {
        let source = "services:\n  a: {}\n  b:\n    depends_on: [a]\n  c: {}\n  d:\n    depends_on: [c]\n";
        let first = graph_of(source).startup_order().expect("should resolve");
        let second = graph_of(source).startup_order().expect("should resolve");
        assert_eq!(first, second);
    }

    #[test]
    fn two_node_cycle_reports_exact_loop() {
        let graph = graph_of("services:\n  a:\n    depends_on: [b]\n  b:\n    depends_on: [a]\n");
        let err = graph.ensure_acyclic().expect_err("should be cyclic");
        let StrataError::CyclicDependency { cycle } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(cycle, &["a", "b"]);
        assert_eq!(err.to_string(), "cyclic service dependency: a -> b -> a");
    }

    #[test]
    fn three_node_cycle_lists_traversal_order() {
        let graph = graph_of(
            "services:\n  a:\n    depends_on: [b]\n  b:\n    depends_on: [c]\n  c:\n    depends_on: [a]\n",
        );
        let err = graph.ensure_acyclic().expect_err("should be cyclic");
        assert!(matches!(
            err,
            StrataError::CyclicDependency { ref cycle } if cycle == &["a", "b", "c"]
        ));
    }

    #[test]
    fn cycle_excludes_acyclic_lead_in() {
        let graph = graph_of(
            "services:\n  frontend:\n    depends_on: [api]\n  api:\n    depends_on: [worker]\n  worker:\n    depends_on: [api]\n",
        );
        let err = graph.ensure_acyclic().expect_err("should be cyclic");
        assert!(matches!(
            err,
            StrataError::CyclicDependency { ref cycle } if cycle == &["api", "worker"]
        ));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let graph = graph_of("services:\n  loop:\n    depends_on: [loop]\n");
        let err = graph.ensure_acyclic().expect_err("should be cyclic");
        assert!(matches!(
            err,
            StrataError::CyclicDependency { ref cycle } if cycle == &["loop"]
        ));
    }

    #[test]
    fn cycle_in_later_component_is_found() {
        let graph = graph_of(
            "services:\n  app: {}\n  web:\n    depends_on: [worker]\n  worker:\n    depends_on: [web]\n",
        );
        assert!(graph.ensure_acyclic().is_err());
        assert!(graph.startup_order().is_err());
    }

    #[test]
    fn acyclic_graph_passes() {
        let graph = graph_of("services:\n  api:\n    depends_on: [db]\n  db: {}\n");
        graph.ensure_acyclic().expect("should be acyclic");
    }
}
