//! Topological analysis and sorting of graphs.
//!
//! Provides:
//! - Execution order (Kahn's algorithm, lexicographic tie-break)
//! - Cycle detection
//! - Reachability from the sink

use crate::core::error::{GraphError, GraphResult};
use crate::graph::structure::Graph;
use std::collections::{BTreeMap, BTreeSet};

/// Analyzer for graph topology.
pub struct TopologyAnalyzer<'a> {
    graph: &'a Graph,
}

impl<'a> TopologyAnalyzer<'a> {
    /// Create a new analyzer for the given graph.
    pub fn new(graph: &'a Graph) -> Self {
        Self { graph }
    }

    /// Get the topological sort order (Kahn's algorithm).
    ///
    /// Every node appears exactly once, after all nodes it depends on. Among
    /// nodes that are ready at the same time the lexicographically smallest
    /// name goes first, so the order is a pure function of the node names
    /// and dependency edges.
    pub fn topological_sort(&self) -> GraphResult<Vec<String>> {
        let mut pending: BTreeMap<&str, usize> = self
            .graph
            .nodes()
            .map(|node| (node.name(), node.depends_on().len()))
            .collect();

        let mut ready: BTreeSet<&str> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(&name, _)| name)
            .collect();

        let mut result = Vec::with_capacity(self.graph.node_count());

        while let Some(name) = ready.pop_first() {
            pending.remove(name);
            result.push(name.to_string());

            let node = self.graph.node(name)?;
            for dependent in node.feeds() {
                if let Some(count) = pending.get_mut(dependent.as_str()) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent.as_str());
                    }
                }
            }
        }

        // Whatever is still pending sits on or behind a cycle
        if !pending.is_empty() {
            let nodes: Vec<String> = pending.keys().map(|s| s.to_string()).collect();
            return Err(GraphError::CyclicGraph { nodes });
        }

        Ok(result)
    }

    /// Check if the graph has any cycles.
    pub fn has_cycle(&self) -> bool {
        self.topological_sort().is_err()
    }

    /// Nodes that cannot reach the sink, sorted by name.
    ///
    /// Empty when there is no sink.
    pub fn unused_nodes(&self) -> Vec<String> {
        let Some(sink) = self.graph.sink() else {
            return Vec::new();
        };
        let upstream = match self.graph.get_upstream(sink.name()) {
            Ok(upstream) => upstream,
            Err(_) => return Vec::new(),
        };

        let mut unused: Vec<String> = self
            .graph
            .node_names()
            .filter(|name| *name != sink.name() && !upstream.contains(*name))
            .map(str::to_string)
            .collect();
        unused.sort();
        unused
    }
}

/// Compute the execution order of `graph`.
pub fn execution_order(graph: &Graph) -> GraphResult<Vec<String>> {
    TopologyAnalyzer::new(graph).topological_sort()
}
