//! Coordinate and sampling nodes.

use crate::core::context::NodeContext;
use crate::core::error::{ExecutionError, GraphResult};
use crate::core::node::{Category, NodeMetadata, Operator, Parameters};
use crate::core::port::{ParameterDefinition, PortDefinition};
use crate::core::texture::Texture;
use crate::core::types::{PortType, Value};
use crate::filters::registry::OperatorRegistry;

/// The 3x3 identity kernel, row-major.
pub const IDENTITY_3X3: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Register sampling nodes.
pub fn register(registry: &mut OperatorRegistry) {
    registry.register(|| Box::new(SampleTexture));
    registry.register(|| Box::new(Move::default()));
    registry.register(|| Box::new(Matrix3Constant::default()));
    registry.register(|| Box::new(MatrixSample::default()));
}

fn uv_input() -> PortDefinition {
    PortDefinition::input("UV", PortType::Vector2)
        .ambient_uv()
        .with_description("Sample coordinate; the pixel center when unbound")
}

/// Nearest-neighbor texture lookup.
#[derive(Debug, Clone)]
pub struct SampleTexture;

impl Operator for SampleTexture {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("sample_texture", "Sample Texture")
            .description("Read the texture pixel under a normalized coordinate")
            .category(Category::Sample)
            .input(PortDefinition::input("Tex", PortType::Texture))
            .input(uv_input())
            .output(PortDefinition::output("Out", PortType::Vector4))
            .build()
    }

    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
        let texture = ctx.input_texture("Tex")?;
        let uv = ctx.input_vector2("UV")?;
        let color = texture.sample(uv);
        ctx.set_output("Out", Value::Vector4(color.to_channels()))
    }
}

/// Shifts a coordinate by a constant offset.
#[derive(Debug, Clone)]
pub struct Move {
    x_offset: f32,
    y_offset: f32,
}

impl Default for Move {
    fn default() -> Self {
        Self {
            x_offset: 0.5,
            y_offset: 0.5,
        }
    }
}

impl Operator for Move {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("move", "Move")
            .description("Translate a coordinate: uv - (x_offset, y_offset)")
            .category(Category::Sample)
            .input(uv_input())
            .output(PortDefinition::output("Out", PortType::Vector2))
            .parameter(ParameterDefinition::new("x_offset", PortType::Float, Value::Float(0.5)))
            .parameter(ParameterDefinition::new("y_offset", PortType::Float, Value::Float(0.5)))
            .build()
    }

    fn configure(&mut self, params: &Parameters) -> GraphResult<()> {
        self.x_offset = params.float("x_offset")?;
        self.y_offset = params.float("y_offset")?;
        Ok(())
    }

    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
        let [u, v] = ctx.input_vector2("UV")?;
        ctx.set_output("Out", Value::Vector2([u - self.x_offset, v - self.y_offset]))
    }
}

/// Emits a constant 3x3 kernel.
#[derive(Debug, Clone)]
pub struct Matrix3Constant {
    mat: [f32; 9],
}

impl Default for Matrix3Constant {
    fn default() -> Self {
        Self { mat: IDENTITY_3X3 }
    }
}

impl Operator for Matrix3Constant {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("matrix3", "Matrix3")
            .description("A constant 3x3 matrix")
            .category(Category::Math)
            .output(PortDefinition::output("Out", PortType::Matrix3))
            .parameter(
                ParameterDefinition::new("mat", PortType::Matrix3, Value::Matrix3(IDENTITY_3X3))
                    .with_description("Nine numbers, row-major"),
            )
            .build()
    }

    fn configure(&mut self, params: &Parameters) -> GraphResult<()> {
        self.mat = params.matrix3("mat")?;
        Ok(())
    }

    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
        ctx.set_output("Out", Value::Matrix3(self.mat))
    }
}

/// 3x3 convolution around the sampled pixel.
///
/// Neighbors outside the texture read as transparent black. RGB is clamped
/// to [0, 255]; alpha is the center pixel's.
#[derive(Debug, Clone)]
pub struct MatrixSample {
    default_mat: [f32; 9],
}

impl Default for MatrixSample {
    fn default() -> Self {
        Self {
            default_mat: IDENTITY_3X3,
        }
    }
}

impl Operator for MatrixSample {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("matrix_sample", "Matrix Sample")
            .description("Convolve the 3x3 neighborhood of the sampled pixel with a kernel")
            .category(Category::Filter)
            .input(PortDefinition::input("Tex", PortType::Texture))
            .input(uv_input())
            .input(
                PortDefinition::input("Mat", PortType::Matrix3)
                    .optional()
                    .with_description("Kernel; default_mat when unbound"),
            )
            .output(PortDefinition::output("Out", PortType::Vector4))
            .parameter(ParameterDefinition::new(
                "default_mat",
                PortType::Matrix3,
                Value::Matrix3(IDENTITY_3X3),
            ))
            .build()
    }

    fn configure(&mut self, params: &Parameters) -> GraphResult<()> {
        self.default_mat = params.matrix3("default_mat")?;
        Ok(())
    }

    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
        let texture = ctx.input_texture("Tex")?;
        let uv = ctx.input_vector2("UV")?;
        let kernel = ctx.input_matrix3_opt("Mat")?.unwrap_or(self.default_mat);

        let center = texture.pixel_at(uv);
        ctx.set_output("Out", Value::Vector4(convolve(&texture, center, &kernel)))
    }
}

/// Weighted RGB sum of the 3x3 neighborhood, clamped; alpha from the center.
fn convolve(texture: &Texture, (cx, cy): (i64, i64), kernel: &[f32; 9]) -> [f32; 4] {
    let mut sum = [0.0f32; 3];
    for (i, weight) in kernel.iter().enumerate() {
        let dx = (i % 3) as i64 - 1;
        let dy = (i / 3) as i64 - 1;
        let neighbor = texture
            .get(cx.saturating_add(dx), cy.saturating_add(dy))
            .to_channels();
        for (acc, channel) in sum.iter_mut().zip(neighbor) {
            *acc += weight * channel;
        }
    }

    let alpha = f32::from(texture.get(cx, cy).a);
    let [r, g, b] = sum.map(|c| c.clamp(0.0, 255.0));
    [r, g, b, alpha]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::RuntimeContext;
    use crate::core::port::{PortSource, PortTable, PortValues, SlotId};
    use crate::core::types::Color;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    /// Texture slot 0 feeding `Tex`, result in slot 1.
    fn run(operator: &dyn Operator, texture: Texture, pixel: (u32, u32, u32, u32)) -> Value {
        let metadata = operator.metadata();
        let mut ports = PortTable::new("node");
        for input in &metadata.inputs {
            ports
                .declare_input(input.name.clone(), input.port_type, input.fallback)
                .unwrap();
        }
        let output = &metadata.outputs[0];
        ports
            .declare_output(output.name.clone(), output.port_type, SlotId(1))
            .unwrap();
        if ports.input("Tex").is_some() {
            ports
                .bind_input(
                    "Tex",
                    PortSource {
                        node: "tex".to_string(),
                        port: "Tex".to_string(),
                        slot: SlotId(0),
                    },
                    PortType::Texture,
                )
                .unwrap();
        }

        let defaults: Arc<[Value]> = Arc::from(vec![
            Value::Texture(Arc::new(texture)),
            metadata.outputs[0].port_type.default_value(),
        ]);
        let mut values = PortValues::new(defaults);
        let mut rng = StdRng::seed_from_u64(1);
        let (x, y, w, h) = pixel;
        let runtime = RuntimeContext::for_pixel(x, y, w, h);
        let mut ctx = NodeContext::new(&ports, &mut values, runtime, &mut rng);
        operator.compute(&mut ctx).unwrap();
        values.read(SlotId(1)).clone()
    }

    fn checker() -> Texture {
        let mut texture = Texture::new(3, 3);
        for y in 0..3 {
            for x in 0..3 {
                let v = (10 * (y * 3 + x + 1)) as u8;
                texture.set(x, y, Color::new(v, v, v, 200));
            }
        }
        texture
    }

    #[test]
    fn test_sample_texture_uses_pixel_center() {
        let out = run(&SampleTexture, checker(), (2, 1, 3, 3));
        assert_eq!(out, Value::Vector4([60.0, 60.0, 60.0, 200.0]));
    }

    #[test]
    fn test_move_offsets_ambient_coordinate() {
        let out = run(&Move::default(), Texture::empty(), (1, 1, 2, 2));
        assert_eq!(out, Value::Vector2([0.25, 0.25]));
    }

    #[test]
    fn test_identity_kernel_reproduces_center() {
        let out = run(&MatrixSample::default(), checker(), (1, 1, 3, 3));
        assert_eq!(out, Value::Vector4([50.0, 50.0, 50.0, 200.0]));
    }

    #[test]
    fn test_box_kernel_treats_outside_as_empty() {
        let operator = MatrixSample {
            default_mat: [1.0; 9],
        };
        // Corner (0,0): in-range neighbors are 10, 20, 40, 50
        let out = run(&operator, checker(), (0, 0, 3, 3));
        assert_eq!(out, Value::Vector4([120.0, 120.0, 120.0, 200.0]));

        // Center sums past 255 and clamps
        let out = run(&operator, checker(), (1, 1, 3, 3));
        assert_eq!(out, Value::Vector4([255.0, 255.0, 255.0, 200.0]));
    }

    #[test]
    fn test_far_off_center_reads_empty() {
        let texture = checker();
        for center in [(i64::MIN, i64::MIN), (i64::MAX, 0), (0, i64::MAX)] {
            assert_eq!(convolve(&texture, center, &[1.0; 9]), [0.0; 4]);
        }
    }

    #[test]
    fn test_matrix3_constant() {
        let out = run(&Matrix3Constant::default(), Texture::empty(), (0, 0, 1, 1));
        assert_eq!(out, Value::Matrix3(IDENTITY_3X3));
    }
}
