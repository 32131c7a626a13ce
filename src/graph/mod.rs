//! Graph module for managing operator graphs.
//!
//! A graph is a directed acyclic graph of named operator nodes; edges are
//! bindings from an output port of one node to an input port of another.

pub mod structure;
pub mod connection;
pub mod topology;
pub mod serialization;

// Re-export commonly used types
pub use structure::{BindPolicy, Graph, GraphNode, GraphOptions, GraphState};
pub use connection::{Connection, Endpoint};
pub use topology::TopologyAnalyzer;
pub use serialization::{Position, SceneAttribute, SceneDescription, SceneLink, SceneNode};
