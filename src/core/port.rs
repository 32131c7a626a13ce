//! Port definitions, port tables and the per-evaluation value store.
//!
//! Ports define the interface of a node - what data it reads and produces.
//! A node declares its ports once, at construction, from its metadata.
//! Output values do not live on the node: each output port owns a slot in a
//! [`PortValues`] store that the executor creates per run (or per worker) and
//! resets before every pixel.

use crate::core::error::{GraphError, GraphResult};
use crate::core::texture::Texture;
use crate::core::types::{Color, PortType, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Direction of a port (input or output).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

/// What an input port reads when nothing is bound to it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputFallback {
    /// Unbound reads fail with `UnboundInput`.
    #[default]
    Required,
    /// Unbound reads yield the pixel's normalized coordinate.
    AmbientUv,
    /// The operator reads the port through `input_opt` and substitutes a
    /// parameter of its own.
    Optional,
}

/// Definition of a node port (input or output).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDefinition {
    /// Unique name within the node
    pub name: String,
    /// Type of data this port accepts/produces
    pub port_type: PortType,
    /// Direction (input or output)
    pub direction: PortDirection,
    /// Behavior of an unbound input (ignored for outputs)
    pub fallback: InputFallback,
    /// Description for documentation
    pub description: String,
}

impl PortDefinition {
    /// Create a new input port definition.
    pub fn input(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            port_type,
            direction: PortDirection::Input,
            fallback: InputFallback::Required,
            description: String::new(),
        }
    }

    /// Create a new output port definition.
    pub fn output(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            direction: PortDirection::Output,
            ..Self::input(name, port_type)
        }
    }

    /// Unbound reads fall back to the pixel's normalized coordinate.
    pub fn ambient_uv(mut self) -> Self {
        self.fallback = InputFallback::AmbientUv;
        self
    }

    /// Unbound reads are handled by the operator.
    pub fn optional(mut self) -> Self {
        self.fallback = InputFallback::Optional;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// A raw attribute value as it arrives from a scene description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(String),
    List(Vec<String>),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Single(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Single(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        AttributeValue::List(values)
    }
}

impl AttributeValue {
    /// Split into numeric-ish items: lists as-is, single strings on commas
    /// and whitespace.
    fn items(&self) -> Vec<&str> {
        match self {
            AttributeValue::Single(s) => s
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|item| !item.is_empty())
                .collect(),
            AttributeValue::List(items) => items.iter().map(|s| s.trim()).collect(),
        }
    }

    fn single(&self) -> Result<&str, String> {
        match self {
            AttributeValue::Single(s) => Ok(s.trim()),
            AttributeValue::List(items) if items.len() == 1 => Ok(items[0].trim()),
            AttributeValue::List(items) => {
                Err(format!("expected a single value, got a list of {}", items.len()))
            }
        }
    }
}

/// A named attribute supplied at registration. Unnamed attributes bind
/// positionally.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: Option<String>,
    pub value: AttributeValue,
}

impl Attribute {
    /// An attribute matched by parameter name.
    pub fn named(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
        }
    }

    /// An attribute matched by position.
    pub fn positional(value: impl Into<AttributeValue>) -> Self {
        Self {
            name: None,
            value: value.into(),
        }
    }
}

/// Definition of a node parameter (constant configuration).
///
/// Parameters differ from inputs: they are set once at registration rather
/// than bound to other nodes, and stay constant during execution.
#[derive(Debug, Clone)]
pub struct ParameterDefinition {
    /// Unique name within the node
    pub name: String,
    /// Type of the parameter
    pub param_type: PortType,
    /// Default value
    pub default_value: Value,
    /// Description for documentation
    pub description: String,
    /// Constraints for validation
    pub constraints: Vec<Constraint>,
}

/// Constraints that can be applied to parameter values.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Numeric value must be within range [min, max]
    Range { min: f64, max: f64 },
    /// Numeric value must be >= min
    MinValue(f64),
    /// String must be one of the listed options
    OneOf(Vec<String>),
}

impl ParameterDefinition {
    /// Create a new parameter definition.
    pub fn new(name: impl Into<String>, param_type: PortType, default_value: Value) -> Self {
        Self {
            name: name.into(),
            param_type,
            default_value,
            description: String::new(),
            constraints: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a range constraint.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.constraints.push(Constraint::Range { min, max });
        self
    }

    /// Add a constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Parse a raw attribute into a value of this parameter's type.
    pub fn parse(&self, raw: &AttributeValue) -> Result<Value, String> {
        let value = match self.param_type {
            PortType::Float => Value::Float(parse_number(raw.single()?)?),
            PortType::Integer => {
                let s = raw.single()?;
                Value::Integer(s.parse::<i64>().map_err(|e| format!("'{}': {}", s, e))?)
            }
            PortType::String => Value::String(raw.single()?.to_string()),
            PortType::Vector2 => Value::Vector2(parse_array(raw)?),
            PortType::Vector4 => Value::Vector4(parse_array(raw)?),
            PortType::Matrix3 => Value::Matrix3(parse_array(raw)?),
            PortType::Color => Value::Color(parse_color(raw)?),
            PortType::Texture => {
                let path = raw.single()?;
                if path.is_empty() {
                    PortType::Texture.default_value()
                } else {
                    let texture =
                        Texture::open(path).map_err(|e| format!("cannot load '{}': {}", path, e))?;
                    Value::Texture(Arc::new(texture))
                }
            }
        };
        self.validate(&value)?;
        Ok(value)
    }

    /// Validate a value against this parameter's type and constraints.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        if !self.param_type.matches(value) {
            return Err(format!(
                "Type mismatch for parameter '{}': expected {}, got {}",
                self.name,
                self.param_type,
                value.get_type()
            ));
        }

        for constraint in &self.constraints {
            constraint.validate(value)?;
        }

        Ok(())
    }
}

impl Constraint {
    /// Validate a value against this constraint.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        match self {
            Constraint::Range { min, max } => {
                if let Some(num) = value.as_float() {
                    let num = num as f64;
                    if !(*min..=*max).contains(&num) {
                        return Err(format!("Value {} is out of range [{}, {}]", num, min, max));
                    }
                }
            }
            Constraint::MinValue(min) => {
                if let Some(num) = value.as_float() {
                    if num.is_nan() || (num as f64) < *min {
                        return Err(format!("Value {} is below minimum {}", num, min));
                    }
                }
            }
            Constraint::OneOf(options) => {
                if let Some(s) = value.as_string() {
                    if !options.iter().any(|o| o.eq_ignore_ascii_case(s)) {
                        return Err(format!("'{}' is not one of {:?}", s, options));
                    }
                }
            }
        }
        Ok(())
    }
}

fn parse_number(s: &str) -> Result<f32, String> {
    let value = s
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("'{}': {}", s, e))?;
    if !value.is_finite() {
        return Err(format!("'{}' is not a finite number", s));
    }
    Ok(value)
}

fn parse_array<const N: usize>(raw: &AttributeValue) -> Result<[f32; N], String> {
    let items = raw.items();
    if items.len() != N {
        return Err(format!("expected {} numbers, got {}", N, items.len()));
    }
    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = parse_number(item)?;
    }
    Ok(out)
}

fn parse_color(raw: &AttributeValue) -> Result<Color, String> {
    if let Ok(single) = raw.single() {
        if single.starts_with('#') {
            return Color::from_hex(single);
        }
    }
    let items = raw.items();
    let channel = |s: &str| s.parse::<u8>().map_err(|e| format!("'{}': {}", s, e));
    match items.as_slice() {
        [r, g, b] => Ok(Color::rgb(channel(*r)?, channel(*g)?, channel(*b)?)),
        [r, g, b, a] => Ok(Color::new(
            channel(*r)?,
            channel(*g)?,
            channel(*b)?,
            channel(*a)?,
        )),
        _ => Err(format!("expected 3 or 4 channels, got {}", items.len())),
    }
}

// ============================================================================
// Port Table
// ============================================================================

/// Index of an output value inside a [`PortValues`] store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

/// Where an input port reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSource {
    pub node: String,
    pub port: String,
    pub slot: SlotId,
}

/// A declared output port: a type and the slot its value lives in.
#[derive(Debug, Clone)]
pub struct OutputPort {
    port_type: PortType,
    slot: SlotId,
}

impl OutputPort {
    pub fn port_type(&self) -> PortType {
        self.port_type
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }
}

/// A declared input port: a type, a fallback policy and at most one source.
#[derive(Debug, Clone)]
pub struct InputPort {
    port_type: PortType,
    fallback: InputFallback,
    source: Option<PortSource>,
}

impl InputPort {
    pub fn port_type(&self) -> PortType {
        self.port_type
    }

    pub fn fallback(&self) -> InputFallback {
        self.fallback
    }

    /// The output this input reads from, if bound.
    pub fn source(&self) -> Option<&PortSource> {
        self.source.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.source.is_some()
    }
}

/// The fixed set of ports of one node.
///
/// Names are unique across inputs and outputs of the same node.
#[derive(Debug, Clone)]
pub struct PortTable {
    node: String,
    inputs: IndexMap<String, InputPort>,
    outputs: IndexMap<String, OutputPort>,
}

impl PortTable {
    /// Create an empty table for the named node.
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    fn check_free(&self, name: &str) -> GraphResult<()> {
        if self.inputs.contains_key(name) || self.outputs.contains_key(name) {
            return Err(GraphError::DuplicatePort {
                node: self.node.clone(),
                port: name.to_string(),
            });
        }
        Ok(())
    }

    /// Declare an output port backed by `slot`.
    pub fn declare_output(
        &mut self,
        name: impl Into<String>,
        port_type: PortType,
        slot: SlotId,
    ) -> GraphResult<()> {
        let name = name.into();
        self.check_free(&name)?;
        self.outputs.insert(name, OutputPort { port_type, slot });
        Ok(())
    }

    /// Declare an unbound input port.
    pub fn declare_input(
        &mut self,
        name: impl Into<String>,
        port_type: PortType,
        fallback: InputFallback,
    ) -> GraphResult<()> {
        let name = name.into();
        self.check_free(&name)?;
        self.inputs.insert(
            name,
            InputPort {
                port_type,
                fallback,
                source: None,
            },
        );
        Ok(())
    }

    /// Point an input at a source, checking types.
    ///
    /// Returns the previous source when one was replaced. Whether replacing
    /// is allowed is the caller's policy.
    pub fn bind_input(
        &mut self,
        name: &str,
        source: PortSource,
        source_type: PortType,
    ) -> GraphResult<Option<PortSource>> {
        let node = self.node.clone();
        let port = self
            .inputs
            .get_mut(name)
            .ok_or_else(|| GraphError::UnknownPort {
                node: node.clone(),
                port: name.to_string(),
            })?;

        if !source_type.compatible_with(&port.port_type) {
            return Err(GraphError::TypeMismatch {
                node,
                port: name.to_string(),
                expected: port.port_type,
                found: source_type,
            });
        }

        Ok(port.source.replace(source))
    }

    /// Whether the named input is bound. Unknown names report `false`.
    pub fn is_bound(&self, name: &str) -> bool {
        self.inputs.get(name).is_some_and(InputPort::is_bound)
    }

    pub fn input(&self, name: &str) -> Option<&InputPort> {
        self.inputs.get(name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputPort> {
        self.outputs.get(name)
    }

    /// Inputs in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = (&str, &InputPort)> {
        self.inputs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Outputs in declaration order.
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &OutputPort)> {
        self.outputs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Name of the owning node.
    pub fn node(&self) -> &str {
        &self.node
    }
}

// ============================================================================
// Per-evaluation value store
// ============================================================================

/// Output values for one evaluation.
///
/// Not shared between concurrent evaluations: each worker gets its own,
/// built from the same defaults.
#[derive(Debug, Clone)]
pub struct PortValues {
    values: Vec<Value>,
    defaults: Arc<[Value]>,
}

impl PortValues {
    /// Create a store holding `defaults`.
    pub fn new(defaults: Arc<[Value]>) -> Self {
        Self {
            values: defaults.to_vec(),
            defaults,
        }
    }

    /// Restore every slot to its type default.
    pub fn reset(&mut self) {
        self.values.clone_from_slice(&self.defaults);
    }

    pub fn read(&self, slot: SlotId) -> &Value {
        &self.values[slot.0]
    }

    /// Overwrite a slot. No history is kept.
    pub fn write(&mut self, slot: SlotId, value: Value) {
        self.values[slot.0] = value;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
