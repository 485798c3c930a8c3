//! Stack dependency graph using `petgraph`.
//!
//! Mirrors the dependency edges recorded while stacks build, and yields a
//! deployment order in which every stack follows its dependencies.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use serverstack_common::error::{Result, ServerstackError};

/// A dependency graph of stacks.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: petgraph::Graph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: petgraph::Graph::new(),
            nodes: HashMap::new(),
        }
    }

    /// Adds a stack node, returning the existing node if the name is known.
    pub fn add_stack(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        let _ = self.nodes.insert(name.to_string(), idx);
        idx
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// The graph edge points from `dependency` to `dependent`
    /// so that topological sort yields dependencies first.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) {
        let dependent = self.add_stack(dependent);
        let dependency = self.add_stack(dependency);
        let _ = self.graph.update_edge(dependency, dependent, ());
    }

    /// Returns whether `dependent` directly depends on `dependency`.
    #[must_use]
    pub fn depends_on(&self, dependent: &str, dependency: &str) -> bool {
        match (self.nodes.get(dependent), self.nodes.get(dependency)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(b, a),
            _ => false,
        }
    }

    /// Number of stacks in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns whether the graph has no stacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns a topological ordering of stacks for deployment.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph contains cycles.
    pub fn resolve_order(&self) -> Result<Vec<String>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => Err(ServerstackError::Config {
                message: format!(
                    "cyclic dependency detected in stack graph at \"{}\"",
                    self.graph[cycle.node_id()]
                ),
            }),
        }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
