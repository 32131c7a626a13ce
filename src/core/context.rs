//! Per-pixel runtime context and the port accessor handed to operators.
//!
//! A [`RuntimeContext`] is created fresh for every pixel and discarded after
//! the node sequence has run. A [`NodeContext`] wraps it together with the
//! calling node's port table and the evaluation's value store, so an operator
//! can only read its own inputs and write its own outputs.

use crate::core::error::{ExecutionError, ExecutionResult};
use crate::core::port::{InputFallback, PortTable, PortValues};
use crate::core::types::{PortType, TextureRef, Value};
use rand::rngs::StdRng;

/// Ephemeral data for one pixel evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeContext {
    /// Pixel-center normalized coordinate `((x + 0.5) / w, (y + 0.5) / h)`.
    pub uv: [f32; 2],
    /// Integer screen coordinate.
    pub screen: (u32, u32),
}

impl RuntimeContext {
    /// Context for pixel `(x, y)` of a `width` x `height` raster.
    pub fn for_pixel(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            uv: [
                (x as f32 + 0.5) / width as f32,
                (y as f32 + 0.5) / height as f32,
            ],
            screen: (x, y),
        }
    }
}

/// Port access for one node during one pixel evaluation.
pub struct NodeContext<'a> {
    ports: &'a PortTable,
    values: &'a mut PortValues,
    runtime: RuntimeContext,
    rng: &'a mut StdRng,
}

impl<'a> NodeContext<'a> {
    /// Create a context for the node owning `ports`.
    pub fn new(
        ports: &'a PortTable,
        values: &'a mut PortValues,
        runtime: RuntimeContext,
        rng: &'a mut StdRng,
    ) -> Self {
        Self {
            ports,
            values,
            runtime,
            rng,
        }
    }

    /// Name of the node being computed.
    pub fn node(&self) -> &str {
        self.ports.node()
    }

    /// The current pixel's runtime context.
    pub fn runtime(&self) -> &RuntimeContext {
        &self.runtime
    }

    /// Random source private to this evaluation.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut *self.rng
    }

    fn unknown_port(&self, port: &str) -> ExecutionError {
        ExecutionError::UnknownPort {
            node: self.node().to_string(),
            port: port.to_string(),
        }
    }

    /// Whether the named input is bound.
    pub fn is_bound(&self, name: &str) -> bool {
        self.ports.is_bound(name)
    }

    // ========================================================================
    // Input Getters
    // ========================================================================

    /// Read an input.
    ///
    /// Unbound inputs resolve through their declared fallback: `AmbientUv`
    /// yields the pixel coordinate, anything else is `UnboundInput`.
    pub fn input(&self, name: &str) -> ExecutionResult<Value> {
        let port = self.ports.input(name).ok_or_else(|| self.unknown_port(name))?;
        match (port.source(), port.fallback()) {
            (Some(source), _) => Ok(self.values.read(source.slot).clone()),
            (None, InputFallback::AmbientUv) => Ok(Value::Vector2(self.runtime.uv)),
            (None, _) => Err(ExecutionError::UnboundInput {
                node: self.node().to_string(),
                port: name.to_string(),
            }),
        }
    }

    /// Read an `Optional` input, `None` when unbound.
    pub fn input_opt(&self, name: &str) -> ExecutionResult<Option<Value>> {
        if self.ports.input(name).is_none() {
            return Err(self.unknown_port(name));
        }
        if self.ports.is_bound(name) {
            self.input(name).map(Some)
        } else {
            Ok(None)
        }
    }

    fn mismatch(&self, name: &str, expected: PortType, found: &Value) -> ExecutionError {
        ExecutionError::TypeMismatch {
            node: self.node().to_string(),
            port: name.to_string(),
            expected,
            found: found.get_type(),
        }
    }

    /// Read an input as a float.
    pub fn input_float(&self, name: &str) -> ExecutionResult<f32> {
        let value = self.input(name)?;
        value
            .as_float()
            .ok_or_else(|| self.mismatch(name, PortType::Float, &value))
    }

    /// Read an input as a 2D vector.
    pub fn input_vector2(&self, name: &str) -> ExecutionResult<[f32; 2]> {
        let value = self.input(name)?;
        value
            .as_vector2()
            .ok_or_else(|| self.mismatch(name, PortType::Vector2, &value))
    }

    /// Read an input as a 4-channel color.
    pub fn input_vector4(&self, name: &str) -> ExecutionResult<[f32; 4]> {
        let value = self.input(name)?;
        value
            .as_vector4()
            .ok_or_else(|| self.mismatch(name, PortType::Vector4, &value))
    }

    /// Read an input as a texture handle.
    pub fn input_texture(&self, name: &str) -> ExecutionResult<TextureRef> {
        let value = self.input(name)?;
        value
            .as_texture()
            .cloned()
            .ok_or_else(|| self.mismatch(name, PortType::Texture, &value))
    }

    /// Read an optional input as a 3x3 matrix.
    pub fn input_matrix3_opt(&self, name: &str) -> ExecutionResult<Option<[f32; 9]>> {
        match self.input_opt(name)? {
            Some(value) => value
                .as_matrix3()
                .map(Some)
                .ok_or_else(|| self.mismatch(name, PortType::Matrix3, &value)),
            None => Ok(None),
        }
    }

    // ========================================================================
    // Output Setters
    // ========================================================================

    /// Overwrite an output value.
    pub fn set_output(&mut self, name: &str, value: Value) -> ExecutionResult<()> {
        let port = self.ports.output(name).ok_or_else(|| self.unknown_port(name))?;
        debug_assert!(
            port.port_type().matches(&value),
            "operator wrote {} to {} port '{}'",
            value.get_type(),
            port.port_type(),
            name
        );
        self.values.write(port.slot(), value);
        Ok(())
    }
}
