//! Per-pixel color adjustments.
//!
//! Channel vectors carry values on the 0..=255 scale; nothing here clamps
//! unless stated, finalization happens at the sink.

use crate::core::context::NodeContext;
use crate::core::error::{ExecutionError, GraphError, GraphResult};
use crate::core::node::{Category, NodeMetadata, Operator, Parameters};
use crate::core::port::{Constraint, ParameterDefinition, PortDefinition};
use crate::core::types::{PortType, Value};
use crate::filters::registry::OperatorRegistry;

/// Register color nodes.
pub fn register(registry: &mut OperatorRegistry) {
    registry.register(|| Box::new(Invert));
    registry.register(|| Box::new(Grayscale));
    registry.register(|| Box::new(GrayToRgb));
    registry.register(|| Box::new(Binarize::default()));
    registry.register(|| Box::new(Clamp::default()));
    registry.register(|| Box::new(Contrast::default()));
}

/// Luma weights for RGB -> gray.
const LUMA: [f32; 3] = [0.299, 0.587, 0.114];

/// Inverts RGB, keeps alpha.
#[derive(Debug, Clone)]
pub struct Invert;

impl Operator for Invert {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("invert", "Inverse")
            .description("Invert the color channels: 255 - c")
            .category(Category::Color)
            .input(PortDefinition::input("In", PortType::Vector4))
            .output(PortDefinition::output("Out", PortType::Vector4))
            .build()
    }

    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
        let [r, g, b, a] = ctx.input_vector4("In")?;
        ctx.set_output("Out", Value::Vector4([255.0 - r, 255.0 - g, 255.0 - b, a]))
    }
}

/// Converts RGB to a single gray level.
#[derive(Debug, Clone)]
pub struct Grayscale;

impl Operator for Grayscale {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("grayscale", "RGB2Grayscale")
            .description("Gray level 0.299 r + 0.587 g + 0.114 b")
            .category(Category::Color)
            .input(PortDefinition::input("In", PortType::Vector4))
            .output(PortDefinition::output("Out", PortType::Float))
            .build()
    }

    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
        let [r, g, b, _] = ctx.input_vector4("In")?;
        let gray = LUMA[0] * r + LUMA[1] * g + LUMA[2] * b;
        ctx.set_output("Out", Value::Float(gray))
    }
}

/// Expands a gray level into an opaque color.
#[derive(Debug, Clone)]
pub struct GrayToRgb;

impl Operator for GrayToRgb {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("gray_to_rgb", "Gray2RGB")
            .description("Repeat a gray level over RGB with full alpha")
            .category(Category::Color)
            .input(PortDefinition::input("In", PortType::Float))
            .output(PortDefinition::output("Out", PortType::Vector4))
            .build()
    }

    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
        let t = ctx.input_float("In")?;
        ctx.set_output("Out", Value::Vector4([t, t, t, 255.0]))
    }
}

/// Thresholds a gray level to 0 or 255.
#[derive(Debug, Clone)]
pub struct Binarize {
    threshold: f32,
}

impl Default for Binarize {
    fn default() -> Self {
        Self { threshold: 127.0 }
    }
}

impl Operator for Binarize {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("binarize", "Binarization")
            .description("255 when the gray level exceeds the threshold, else 0")
            .category(Category::Color)
            .input(PortDefinition::input("In", PortType::Float))
            .output(PortDefinition::output("Out", PortType::Float))
            .parameter(ParameterDefinition::new("threshold", PortType::Float, Value::Float(127.0)))
            .build()
    }

    fn configure(&mut self, params: &Parameters) -> GraphResult<()> {
        self.threshold = params.float("threshold")?;
        Ok(())
    }

    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
        let v = ctx.input_float("In")?;
        let out = if v > self.threshold { 255.0 } else { 0.0 };
        ctx.set_output("Out", Value::Float(out))
    }
}

/// Clamps RGB into `[min, max]`.
#[derive(Debug, Clone)]
pub struct Clamp {
    min: f32,
    max: f32,
}

impl Default for Clamp {
    fn default() -> Self {
        Self { min: 0.0, max: 255.0 }
    }
}

impl Operator for Clamp {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("clamp", "Clamp")
            .description("Clamp the color channels between min and max; alpha kept")
            .category(Category::Color)
            .input(PortDefinition::input("In", PortType::Vector4))
            .output(PortDefinition::output("Out", PortType::Vector4))
            .parameter(ParameterDefinition::new("min", PortType::Float, Value::Float(0.0)))
            .parameter(ParameterDefinition::new("max", PortType::Float, Value::Float(255.0)))
            .build()
    }

    fn configure(&mut self, params: &Parameters) -> GraphResult<()> {
        let (min, max) = (params.float("min")?, params.float("max")?);
        if min.is_nan() || max.is_nan() || min > max {
            return Err(GraphError::invalid_attribute(
                params.node(),
                "min",
                format!("min {} exceeds max {}", min, max),
            ));
        }
        self.min = min;
        self.max = max;
        Ok(())
    }

    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
        let [r, g, b, a] = ctx.input_vector4("In")?;
        let clamp = |c: f32| c.clamp(self.min, self.max);
        ctx.set_output("Out", Value::Vector4([clamp(r), clamp(g), clamp(b), a]))
    }
}

/// Scales the distance of each channel from the texture's average color.
#[derive(Debug, Clone)]
pub struct Contrast {
    amount: f32,
}

impl Default for Contrast {
    fn default() -> Self {
        Self { amount: 1.0 }
    }
}

impl Operator for Contrast {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("contrast", "Contrast")
            .description("avg + (c - avg) * amount, avg being the texture's average color")
            .category(Category::Color)
            .input(
                PortDefinition::input("Tex", PortType::Texture)
                    .with_description("Texture supplying the average color"),
            )
            .input(PortDefinition::input("In", PortType::Vector4))
            .output(PortDefinition::output("Out", PortType::Vector4))
            .parameter(
                ParameterDefinition::new("amount", PortType::Float, Value::Float(1.0))
                    .with_description("Contrast multiplier (0.0 to 3.0)")
                    .with_constraint(Constraint::Range { min: 0.0, max: 3.0 }),
            )
            .build()
    }

    fn configure(&mut self, params: &Parameters) -> GraphResult<()> {
        self.amount = params.float("amount")?;
        Ok(())
    }

    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
        let average = ctx.input_texture("Tex")?.average_color();
        let [r, g, b, a] = ctx.input_vector4("In")?;
        let adjust = |c: f32, avg: f32| (avg + (c - avg) * self.amount).clamp(0.0, 255.0);
        let [avg_r, avg_g, avg_b, _] = average;
        ctx.set_output(
            "Out",
            Value::Vector4([adjust(r, avg_r), adjust(g, avg_g), adjust(b, avg_b), a]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::RuntimeContext;
    use crate::core::port::{PortSource, PortTable, PortValues, SlotId};
    use crate::core::texture::Texture;
    use crate::core::types::Color;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    /// Feed `inputs` (by port name) through `operator` and return its output.
    fn eval(operator: &dyn Operator, inputs: &[(&str, Value)]) -> Value {
        let metadata = operator.metadata();
        let mut ports = PortTable::new("node");
        let mut defaults = Vec::new();
        for input in &metadata.inputs {
            ports
                .declare_input(input.name.clone(), input.port_type, input.fallback)
                .unwrap();
        }
        for (name, value) in inputs {
            let slot = SlotId(defaults.len());
            ports
                .bind_input(
                    name,
                    PortSource {
                        node: "src".to_string(),
                        port: name.to_string(),
                        slot,
                    },
                    value.get_type(),
                )
                .unwrap();
            defaults.push(value.clone());
        }
        let out_slot = SlotId(defaults.len());
        ports
            .declare_output("Out", metadata.outputs[0].port_type, out_slot)
            .unwrap();
        defaults.push(metadata.outputs[0].port_type.default_value());

        let mut values = PortValues::new(Arc::from(defaults));
        let mut rng = StdRng::seed_from_u64(0);
        let runtime = RuntimeContext::for_pixel(0, 0, 1, 1);
        let mut ctx = NodeContext::new(&ports, &mut values, runtime, &mut rng);
        operator.compute(&mut ctx).unwrap();
        values.read(out_slot).clone()
    }

    #[test]
    fn test_invert_keeps_alpha() {
        let out = eval(&Invert, &[("In", Value::Vector4([0.0, 55.0, 255.0, 128.0]))]);
        assert_eq!(out, Value::Vector4([255.0, 200.0, 0.0, 128.0]));
    }

    #[test]
    fn test_grayscale_weights() {
        let out = eval(&Grayscale, &[("In", Value::Vector4([100.0, 100.0, 100.0, 0.0]))]);
        let gray = out.as_float().unwrap();
        assert!((gray - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_gray_to_rgb_is_opaque() {
        let out = eval(&GrayToRgb, &[("In", Value::Float(42.0))]);
        assert_eq!(out, Value::Vector4([42.0, 42.0, 42.0, 255.0]));
    }

    #[test]
    fn test_binarize_threshold_is_exclusive() {
        assert_eq!(eval(&Binarize::default(), &[("In", Value::Float(127.0))]), Value::Float(0.0));
        assert_eq!(eval(&Binarize::default(), &[("In", Value::Float(127.5))]), Value::Float(255.0));
    }

    #[test]
    fn test_clamp_range() {
        let clamp = Clamp { min: 10.0, max: 20.0 };
        let out = eval(&clamp, &[("In", Value::Vector4([0.0, 15.0, 300.0, 400.0]))]);
        assert_eq!(out, Value::Vector4([10.0, 15.0, 20.0, 400.0]));
    }

    #[test]
    fn test_clamp_rejects_inverted_range() {
        let registry = OperatorRegistry::with_builtins();
        let result = registry.create(
            "clamp",
            "c",
            &[
                crate::core::port::Attribute::named("min", "9"),
                crate::core::port::Attribute::named("max", "3"),
            ],
        );
        assert!(matches!(result, Err(GraphError::InvalidAttribute { .. })));
    }

    #[test]
    fn test_contrast_around_average() {
        let mut texture = Texture::filled(2, 1, Color::new(100, 100, 100, 255));
        texture.set(1, 0, Color::new(200, 200, 200, 255));
        let texture = Value::Texture(Arc::new(texture));

        let contrast = Contrast { amount: 2.0 };
        let out = eval(
            &contrast,
            &[("Tex", texture), ("In", Value::Vector4([200.0, 100.0, 150.0, 9.0]))],
        );
        assert_eq!(out, Value::Vector4([250.0, 50.0, 150.0, 9.0]));
    }
}
