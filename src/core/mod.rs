//! Core types and traits for pixgraph.
//!
//! This module contains the foundational pieces of the per-pixel pipeline:
//! - Value types (Texture, Float, Vector4, etc.)
//! - The texture image collaborator
//! - Port definitions, port tables and the per-evaluation value store
//! - The operator trait and metadata
//! - Error types
//! - Runtime and node contexts

pub mod types;
pub mod texture;
pub mod port;
pub mod error;
pub mod context;
pub mod node;

// Re-export commonly used types
pub use types::{Color, PortType, TextureRef, Value};
pub use texture::Texture;
pub use port::{Attribute, AttributeValue, InputFallback, PortDefinition, PortTable, PortValues};
pub use error::{ExecutionError, GraphError, PixGraphError, ValidationError};
pub use context::{NodeContext, RuntimeContext};
pub use node::{Category, NodeMetadata, Operator, Parameters, Sink};
