//! Randomized noise nodes.

use crate::core::context::NodeContext;
use crate::core::error::{ExecutionError, GraphResult};
use crate::core::node::{Category, NodeMetadata, Operator, Parameters};
use crate::core::port::{ParameterDefinition, PortDefinition};
use crate::core::types::{PortType, Value};
use crate::filters::registry::OperatorRegistry;
use rand::Rng;

/// Register noise nodes.
pub fn register(registry: &mut OperatorRegistry) {
    registry.register(|| Box::new(SaltPepperNoise::default()));
}

/// Replaces RGB with black or white at random.
///
/// One uniform draw per pixel: below `probability / 2` is pepper (0), below
/// `probability` is salt (255), otherwise the input passes through.
#[derive(Debug, Clone)]
pub struct SaltPepperNoise {
    probability: f32,
}

impl Default for SaltPepperNoise {
    fn default() -> Self {
        Self { probability: 0.05 }
    }
}

impl SaltPepperNoise {
    fn apply(&self, draw: f32, [r, g, b, a]: [f32; 4]) -> [f32; 4] {
        if draw < self.probability / 2.0 {
            [0.0, 0.0, 0.0, a]
        } else if draw < self.probability {
            [255.0, 255.0, 255.0, a]
        } else {
            [r, g, b, a]
        }
    }
}

impl Operator for SaltPepperNoise {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("salt_pepper_noise", "Salt And Pepper Noise")
            .description("Randomly turn pixels black or white")
            .category(Category::Noise)
            .input(PortDefinition::input("In", PortType::Vector4))
            .output(PortDefinition::output("Out", PortType::Vector4))
            .parameter(
                ParameterDefinition::new("probability", PortType::Float, Value::Float(0.05))
                    .with_description("Chance that a pixel is replaced")
                    .with_range(0.0, 1.0),
            )
            .non_deterministic()
            .build()
    }

    fn configure(&mut self, params: &Parameters) -> GraphResult<()> {
        self.probability = params.float("probability")?;
        Ok(())
    }

    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
        let input = ctx.input_vector4("In")?;
        let draw: f32 = ctx.rng().gen();
        ctx.set_output("Out", Value::Vector4(self.apply(draw, input)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::GraphError;
    use crate::core::port::Attribute;

    #[test]
    fn test_probability_bands() {
        let noise = SaltPepperNoise { probability: 0.2 };
        let input = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(noise.apply(0.05, input), [0.0, 0.0, 0.0, 4.0]);
        assert_eq!(noise.apply(0.15, input), [255.0, 255.0, 255.0, 4.0]);
        assert_eq!(noise.apply(0.2, input), input);
        assert_eq!(noise.apply(0.99, input), input);
    }

    #[test]
    fn test_zero_probability_is_identity() {
        let noise = SaltPepperNoise { probability: 0.0 };
        assert_eq!(noise.apply(0.0, [9.0; 4]), [9.0; 4]);
    }

    #[test]
    fn test_marked_non_deterministic() {
        assert!(!SaltPepperNoise::default().metadata().deterministic);
    }

    #[test]
    fn test_probability_out_of_range() {
        let registry = OperatorRegistry::with_builtins();
        let result = registry.create(
            "Salt And Pepper Noise",
            "n",
            &[Attribute::named("probability", "1.5")],
        );
        assert!(matches!(result, Err(GraphError::InvalidAttribute { .. })));
    }
}
