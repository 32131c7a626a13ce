//! Operator trait and node metadata.
//!
//! The [`Operator`] trait is the core abstraction for all per-pixel image
//! operations. It uses a three-phase design: declaration (metadata, read
//! once at construction), configuration (parameters applied once) and
//! computation (called once per pixel).

use crate::core::context::NodeContext;
use crate::core::error::{ExecutionError, GraphError, GraphResult};
use crate::core::port::{ParameterDefinition, PortDefinition, PortDirection};
use crate::core::types::{TextureRef, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Category for organizing operators in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Image sources
    Input,
    /// The sink that finalizes pixels
    Output,
    /// Coordinate and sampling operations
    Sample,
    /// Color adjustments
    Color,
    /// Neighborhood filters
    Filter,
    /// Noise operations
    Noise,
    /// Arithmetic and constants
    Math,
    /// Custom/user-defined
    #[default]
    Custom,
}

impl Category {
    /// Get the display name for this category.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Input => "Input",
            Category::Output => "Output",
            Category::Sample => "Sample",
            Category::Color => "Color",
            Category::Filter => "Filter",
            Category::Noise => "Noise",
            Category::Math => "Math",
            Category::Custom => "Custom",
        }
    }

    /// Get all categories in display order.
    pub fn all() -> &'static [Category] {
        &[
            Category::Input,
            Category::Output,
            Category::Sample,
            Category::Color,
            Category::Filter,
            Category::Noise,
            Category::Math,
            Category::Custom,
        ]
    }
}

/// Metadata describing an operator kind.
#[derive(Debug, Clone)]
pub struct NodeMetadata {
    /// Unique identifier for this kind (e.g., "sample_texture")
    pub id: String,
    /// Human-readable name, also accepted as a kind in scene files
    pub name: String,
    /// Category for listings
    pub category: Category,
    /// Detailed description
    pub description: String,
    /// Input port definitions
    pub inputs: Vec<PortDefinition>,
    /// Output port definitions
    pub outputs: Vec<PortDefinition>,
    /// Parameter definitions, in positional order
    pub parameters: Vec<ParameterDefinition>,
    /// Whether the same inputs always give the same outputs
    pub deterministic: bool,
}

impl NodeMetadata {
    /// Create a new metadata builder.
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> NodeMetadataBuilder {
        NodeMetadataBuilder::new(id, name)
    }

    /// Find a parameter by name, ignoring ASCII case.
    pub fn get_parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// Builder for NodeMetadata.
pub struct NodeMetadataBuilder {
    metadata: NodeMetadata,
}

impl NodeMetadataBuilder {
    /// Create a new builder with required fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: NodeMetadata {
                id: id.into(),
                name: name.into(),
                category: Category::Custom,
                description: String::new(),
                inputs: Vec::new(),
                outputs: Vec::new(),
                parameters: Vec::new(),
                deterministic: true,
            },
        }
    }

    /// Set the category.
    pub fn category(mut self, category: Category) -> Self {
        self.metadata.category = category;
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = description.into();
        self
    }

    /// Add an input port.
    pub fn input(mut self, port: PortDefinition) -> Self {
        debug_assert_eq!(port.direction, PortDirection::Input);
        self.metadata.inputs.push(port);
        self
    }

    /// Add an output port.
    pub fn output(mut self, port: PortDefinition) -> Self {
        debug_assert_eq!(port.direction, PortDirection::Output);
        self.metadata.outputs.push(port);
        self
    }

    /// Add a parameter.
    pub fn parameter(mut self, param: ParameterDefinition) -> Self {
        self.metadata.parameters.push(param);
        self
    }

    /// Mark as non-deterministic.
    pub fn non_deterministic(mut self) -> Self {
        self.metadata.deterministic = false;
        self
    }

    /// Build the metadata.
    pub fn build(self) -> NodeMetadata {
        self.metadata
    }
}

/// Resolved parameter values handed to [`Operator::configure`].
///
/// Every declared parameter is present: attribute values where given,
/// defaults otherwise.
#[derive(Debug, Clone)]
pub struct Parameters {
    node: String,
    values: IndexMap<String, Value>,
}

impl Parameters {
    /// Start from the declared defaults.
    pub fn from_defaults(node: impl Into<String>, definitions: &[ParameterDefinition]) -> Self {
        Self {
            node: node.into(),
            values: definitions
                .iter()
                .map(|p| (p.name.clone(), p.default_value.clone()))
                .collect(),
        }
    }

    /// Override one value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Name of the node being configured.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Get a parameter value by name.
    pub fn get(&self, name: &str) -> GraphResult<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| {
                GraphError::invalid_attribute(&self.node, name, "parameter not declared")
            })
    }

    fn typed<T>(&self, name: &str, extract: impl Fn(&Value) -> Option<T>) -> GraphResult<T> {
        let value = self.get(name)?;
        extract(value).ok_or_else(|| {
            GraphError::invalid_attribute(
                &self.node,
                name,
                format!("unexpected {} value", value.get_type()),
            )
        })
    }

    /// Get a parameter as a float.
    pub fn float(&self, name: &str) -> GraphResult<f32> {
        self.typed(name, Value::as_float)
    }

    /// Get a parameter as an integer.
    pub fn integer(&self, name: &str) -> GraphResult<i64> {
        self.typed(name, Value::as_integer)
    }

    /// Get a parameter as a 3x3 matrix.
    pub fn matrix3(&self, name: &str) -> GraphResult<[f32; 9]> {
        self.typed(name, Value::as_matrix3)
    }

    /// Get a parameter as a string.
    pub fn string(&self, name: &str) -> GraphResult<String> {
        self.typed(name, |v| v.as_string().map(str::to_string))
    }

    /// Get a parameter as a texture handle.
    pub fn texture(&self, name: &str) -> GraphResult<TextureRef> {
        self.typed(name, |v| v.as_texture().cloned())
    }
}

/// Capability of the node that finalizes pixels.
pub trait Sink {
    /// Output raster size `(width, height)`; both at least 1.
    fn raster_size(&self) -> (u32, u32);

    /// Name of the `Color` output carrying the finalized pixel.
    fn color_port(&self) -> &str {
        "Color"
    }
}

/// The core trait for per-pixel operators.
///
/// # Design
///
/// 1. **Declaration** (`metadata`): read once when the node is registered;
///    the node's ports are declared from it and never change afterwards.
///
/// 2. **Configuration** (`configure`): called once with the resolved
///    parameters, before any binding or compute call.
///
/// 3. **Computation** (`compute`): called once per pixel, in execution
///    order. Reads inputs and writes outputs through the [`NodeContext`]
///    and must not touch anything else; the operator itself is shared
///    immutably between workers.
///
/// # Example Implementation
///
/// ```ignore
/// struct Invert;
///
/// impl Operator for Invert {
///     fn metadata(&self) -> NodeMetadata {
///         NodeMetadata::builder("invert", "Inverse")
///             .category(Category::Color)
///             .input(PortDefinition::input("In", PortType::Vector4))
///             .output(PortDefinition::output("Out", PortType::Vector4))
///             .build()
///     }
///
///     fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
///         let [r, g, b, a] = ctx.input_vector4("In")?;
///         ctx.set_output("Out", Value::Vector4([255.0 - r, 255.0 - g, 255.0 - b, a]))
///     }
/// }
/// ```
pub trait Operator: Send + Sync {
    /// Get the metadata for this operator.
    fn metadata(&self) -> NodeMetadata;

    /// Apply parameter values.
    ///
    /// Default implementation accepts anything.
    fn configure(&mut self, _params: &Parameters) -> GraphResult<()> {
        Ok(())
    }

    /// Compute outputs for the current pixel.
    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError>;

    /// The sink capability, implemented only by the output node.
    fn as_sink(&self) -> Option<&dyn Sink> {
        None
    }
}
