//! # pixgraph - Per-pixel Image Operator Graphs
//!
//! pixgraph evaluates a directed acyclic graph of image operators once for
//! every pixel of an output raster. Each node declares typed input and
//! output ports; bindings carry values from outputs to inputs; a single
//! sink node finalizes the color written at each pixel.
//!
//! ## Features
//!
//! - **Typed Ports**: Bindings are checked against declared port types
//! - **Deterministic Ordering**: Nodes run in a topological order with a
//!   lexicographic tie-break, computed once and replayed for every pixel
//! - **Parallel Rendering**: Optional row-parallel rendering with private
//!   per-worker port storage
//! - **Scene Files**: Graphs load from JSON scene descriptions
//! - **Extensible**: Add operators by implementing the [`Operator`](core::node::Operator) trait
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pixgraph::prelude::*;
//!
//! let mut graph = Graph::new();
//!
//! graph.register_node("tex", "texture", &[Attribute::named("texture", "input.png")])?;
//! graph.register_node("sampler", "sample_texture", &[])?;
//! graph.register_node("invert", "invert", &[])?;
//! graph.register_node("out", "output", &[
//!     Attribute::named("width", "640"),
//!     Attribute::named("height", "480"),
//! ])?;
//!
//! graph.bind("tex", "Tex", "sampler", "Tex")?;
//! graph.bind("sampler", "Out", "invert", "In")?;
//! graph.bind("invert", "Out", "out", "In")?;
//!
//! let image = graph.execute()?;
//! image.save("inverted.png")?;
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: Values, textures, ports, the operator trait and errors
//! - [`graph`]: Graph structure, ordering and scene files
//! - [`validation`]: Pre-flight validation pipeline
//! - [`execution`]: The per-pixel execution engine
//! - [`filters`]: Operator registry and built-in operators
//!
//! ## Creating Custom Operators
//!
//! ```rust,ignore
//! use pixgraph::prelude::*;
//!
//! struct Swizzle;
//!
//! impl Operator for Swizzle {
//!     fn metadata(&self) -> NodeMetadata {
//!         NodeMetadata::builder("swizzle", "Swizzle")
//!             .category(Category::Color)
//!             .input(PortDefinition::input("In", PortType::Vector4))
//!             .output(PortDefinition::output("Out", PortType::Vector4))
//!             .build()
//!     }
//!
//!     fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
//!         let [r, g, b, a] = ctx.input_vector4("In")?;
//!         ctx.set_output("Out", Value::Vector4([b, g, r, a]))
//!     }
//! }
//!
//! let mut registry = OperatorRegistry::with_builtins();
//! registry.register(|| Box::new(Swizzle));
//! ```

#![warn(clippy::all)]

pub mod core;
pub mod execution;
pub mod filters;
pub mod graph;
pub mod validation;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use pixgraph::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::texture::Texture;
    pub use crate::core::types::{Color, PortType, TextureRef, Value};

    // Operator trait and types
    pub use crate::core::node::{Category, NodeMetadata, Operator, Parameters, Sink};

    // Ports and attributes
    pub use crate::core::port::{
        Attribute, AttributeValue, Constraint, InputFallback, ParameterDefinition, PortDefinition,
    };

    // Contexts
    pub use crate::core::context::{NodeContext, RuntimeContext};

    // Errors
    pub use crate::core::error::{
        ExecutionError, GraphError, PixGraphError, ValidationError, ValidationReport,
        ValidationWarning,
    };

    // Graph
    pub use crate::graph::connection::{Connection, Endpoint};
    pub use crate::graph::serialization::{SceneDescription, SceneLink, SceneNode};
    pub use crate::graph::structure::{BindPolicy, Graph, GraphNode, GraphOptions, GraphState};
    pub use crate::graph::topology::TopologyAnalyzer;

    // Validation
    pub use crate::validation::pipeline::{validate, ValidationPipeline};

    // Execution
    pub use crate::execution::engine::{ExecutionEngine, ExecutionOptions, ExecutionStats};

    // Operators
    pub use crate::filters::registry::OperatorRegistry;
    pub use crate::filters::builtin::{OutputNode, TextureSource};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "pixgraph");
    }

    #[test]
    fn test_basic_graph_creation() {
        let mut graph = Graph::new();
        graph.register_node("a", "invert", &[]).unwrap();
        graph.register_node("b", "invert", &[]).unwrap();

        assert!(graph.bind("a", "Out", "b", "In").is_ok());
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_custom_operator_registration() {
        struct Swizzle;

        impl Operator for Swizzle {
            fn metadata(&self) -> NodeMetadata {
                NodeMetadata::builder("swizzle", "Swizzle")
                    .input(PortDefinition::input("In", PortType::Vector4))
                    .output(PortDefinition::output("Out", PortType::Vector4))
                    .build()
            }

            fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
                let [r, g, b, a] = ctx.input_vector4("In")?;
                ctx.set_output("Out", Value::Vector4([b, g, r, a]))
            }
        }

        let mut registry = OperatorRegistry::with_builtins();
        registry.register(|| Box::new(Swizzle));

        let mut graph = Graph::with_registry(std::sync::Arc::new(registry));
        let source = TextureSource::new(Texture::filled(1, 1, Color::rgb(1, 2, 3)));
        graph.add_node("tex", Box::new(source)).unwrap();
        graph.register_node("sampler", "sample_texture", &[]).unwrap();
        graph.register_node("swz", "swizzle", &[]).unwrap();
        graph.add_node("out", Box::new(OutputNode::new(1, 1))).unwrap();
        graph.bind("tex", "Tex", "sampler", "Tex").unwrap();
        graph.bind("sampler", "Out", "swz", "In").unwrap();
        graph.bind("swz", "Out", "out", "In").unwrap();

        let image = graph.execute().unwrap();
        assert_eq!(image.get(0, 0), Color::rgb(3, 2, 1));
    }
}
