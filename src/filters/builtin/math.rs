//! Arithmetic on channel vectors.

use crate::core::context::NodeContext;
use crate::core::error::{ExecutionError, GraphError, GraphResult};
use crate::core::node::{Category, NodeMetadata, Operator, Parameters};
use crate::core::port::{Constraint, ParameterDefinition, PortDefinition};
use crate::core::types::{PortType, Value};
use crate::filters::registry::OperatorRegistry;

/// Register math nodes.
pub fn register(registry: &mut OperatorRegistry) {
    registry.register(|| Box::new(Math::default()));
}

/// Binary operation applied per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MathOp {
    #[default]
    Add,
    Subtract,
    Multiply,
    /// `a * (1 - factor) + b * factor`
    Mix,
}

impl MathOp {
    const NAMES: [&'static str; 4] = ["add", "subtract", "multiply", "mix"];

    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "add" => Some(MathOp::Add),
            "subtract" => Some(MathOp::Subtract),
            "multiply" => Some(MathOp::Multiply),
            "mix" => Some(MathOp::Mix),
            _ => None,
        }
    }

    fn apply(self, a: f32, b: f32, factor: f32) -> f32 {
        match self {
            MathOp::Add => a + b,
            MathOp::Subtract => a - b,
            MathOp::Multiply => a * b,
            MathOp::Mix => a * (1.0 - factor) + b * factor,
        }
    }
}

/// Combines inputs `A` and `B` channel by channel.
///
/// Results are not clamped.
#[derive(Debug, Clone)]
pub struct Math {
    op: MathOp,
    factor: f32,
}

impl Default for Math {
    fn default() -> Self {
        Self {
            op: MathOp::Add,
            factor: 0.5,
        }
    }
}

impl Operator for Math {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("math", "Math")
            .description("Per-channel add, subtract, multiply or mix of A and B")
            .category(Category::Math)
            .input(PortDefinition::input("A", PortType::Vector4))
            .input(PortDefinition::input("B", PortType::Vector4))
            .output(PortDefinition::output("Out", PortType::Vector4))
            .parameter(
                ParameterDefinition::new("op", PortType::String, Value::String("add".to_string()))
                    .with_constraint(Constraint::OneOf(
                        MathOp::NAMES.iter().map(|s| s.to_string()).collect(),
                    )),
            )
            .parameter(
                ParameterDefinition::new("factor", PortType::Float, Value::Float(0.5))
                    .with_description("Weight of B when mixing")
                    .with_range(0.0, 1.0),
            )
            .build()
    }

    fn configure(&mut self, params: &Parameters) -> GraphResult<()> {
        let name = params.string("op")?;
        self.op = MathOp::parse(&name).ok_or_else(|| {
            let reason = format!("unknown operation '{}'", name);
            GraphError::invalid_attribute(params.node(), "op", reason)
        })?;
        self.factor = params.float("factor")?;
        Ok(())
    }

    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
        let a = ctx.input_vector4("A")?;
        let b = ctx.input_vector4("B")?;
        let mut out = [0.0; 4];
        for (i, channel) in out.iter_mut().enumerate() {
            *channel = self.op.apply(a[i], b[i], self.factor);
        }
        ctx.set_output("Out", Value::Vector4(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::port::Attribute;

    #[test]
    fn test_operations() {
        assert_eq!(MathOp::Add.apply(2.0, 3.0, 0.0), 5.0);
        assert_eq!(MathOp::Subtract.apply(2.0, 3.0, 0.0), -1.0);
        assert_eq!(MathOp::Multiply.apply(2.0, 3.0, 0.0), 6.0);
        assert_eq!(MathOp::Mix.apply(0.0, 100.0, 0.25), 25.0);
    }

    #[test]
    fn test_op_attribute_is_case_insensitive() {
        let registry = OperatorRegistry::with_builtins();
        assert!(registry
            .create("math", "m", &[Attribute::named("op", "MULTIPLY")])
            .is_ok());

        let result = registry.create("math", "m", &[Attribute::named("op", "divide")]);
        assert!(matches!(result, Err(GraphError::InvalidAttribute { .. })));
    }
}
