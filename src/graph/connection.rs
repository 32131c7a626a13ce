//! Connection types for the graph.

use serde::{Deserialize, Serialize};

/// An endpoint of a connection (node + port).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// The node name.
    pub node: String,
    /// The port name on that node.
    pub port: String,
}

impl Endpoint {
    /// Create a new endpoint.
    pub fn new(node: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
        }
    }
}

/// A binding from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Source endpoint (output port).
    pub from: Endpoint,
    /// Target endpoint (input port).
    pub to: Endpoint,
}

impl Connection {
    /// Create a new connection.
    pub fn new(from: Endpoint, to: Endpoint) -> Self {
        Self { from, to }
    }

    /// Whether this connection runs between the two named nodes.
    pub fn links(&self, from_node: &str, to_node: &str) -> bool {
        self.from.node == from_node && self.to.node == to_node
    }
}
