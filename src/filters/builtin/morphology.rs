//! Morphological neighborhood filters.

use crate::core::context::NodeContext;
use crate::core::error::{ExecutionError, GraphResult};
use crate::core::node::{Category, NodeMetadata, Operator, Parameters};
use crate::core::port::{Constraint, ParameterDefinition, PortDefinition};
use crate::core::texture::Texture;
use crate::core::types::{PortType, Value};
use crate::filters::registry::OperatorRegistry;

/// Register morphology nodes.
pub fn register(registry: &mut OperatorRegistry) {
    registry.register(|| Box::new(Dilate::default()));
    registry.register(|| Box::new(Erode::default()));
}

fn metadata(id: &str, name: &str, description: &str) -> NodeMetadata {
    NodeMetadata::builder(id, name)
        .description(description)
        .category(Category::Filter)
        .input(PortDefinition::input("Tex", PortType::Texture))
        .input(PortDefinition::input("UV", PortType::Vector2).ambient_uv())
        .output(PortDefinition::output("Out", PortType::Vector4))
        .parameter(
            ParameterDefinition::new("radius", PortType::Integer, Value::Integer(1))
                .with_description("Half-width of the square neighborhood")
                .with_constraint(Constraint::Range { min: 0.0, max: 64.0 }),
        )
        .build()
}

/// Fold every in-range pixel of the neighborhood with `pick`, per channel.
///
/// A neighborhood entirely outside the texture yields zeros.
fn fold_neighborhood(
    texture: &Texture,
    center: (i64, i64),
    radius: i64,
    pick: fn(f32, f32) -> f32,
) -> [f32; 4] {
    let (cx, cy) = center;
    let mut result: Option<[f32; 4]> = None;

    // Clip the window to the texture; saturating keeps far-off centers in range.
    let x_range = cx.saturating_sub(radius).max(0)
        ..=cx.saturating_add(radius).min(i64::from(texture.width()) - 1);
    let y_range = cy.saturating_sub(radius).max(0)
        ..=cy.saturating_add(radius).min(i64::from(texture.height()) - 1);

    for y in y_range {
        for x in x_range.clone() {
            let channels = texture.get(x, y).to_channels();
            result = Some(match result {
                None => channels,
                Some(acc) => [
                    pick(acc[0], channels[0]),
                    pick(acc[1], channels[1]),
                    pick(acc[2], channels[2]),
                    pick(acc[3], channels[3]),
                ],
            });
        }
    }

    result.unwrap_or([0.0; 4])
}

fn compute_with(
    ctx: &mut NodeContext<'_>,
    radius: i64,
    pick: fn(f32, f32) -> f32,
) -> Result<(), ExecutionError> {
    let texture = ctx.input_texture("Tex")?;
    let uv = ctx.input_vector2("UV")?;
    let center = texture.pixel_at(uv);
    ctx.set_output("Out", Value::Vector4(fold_neighborhood(&texture, center, radius, pick)))
}

/// Per-channel maximum over the neighborhood.
#[derive(Debug, Clone)]
pub struct Dilate {
    radius: i64,
}

impl Default for Dilate {
    fn default() -> Self {
        Self { radius: 1 }
    }
}

impl Operator for Dilate {
    fn metadata(&self) -> NodeMetadata {
        metadata("dilate", "Dilate", "Per-channel maximum over a square neighborhood")
    }

    fn configure(&mut self, params: &Parameters) -> GraphResult<()> {
        self.radius = params.integer("radius")?;
        Ok(())
    }

    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
        compute_with(ctx, self.radius, f32::max)
    }
}

/// Per-channel minimum over the neighborhood.
#[derive(Debug, Clone)]
pub struct Erode {
    radius: i64,
}

impl Default for Erode {
    fn default() -> Self {
        Self { radius: 1 }
    }
}

impl Operator for Erode {
    fn metadata(&self) -> NodeMetadata {
        metadata("erode", "Erode", "Per-channel minimum over a square neighborhood")
    }

    fn configure(&mut self, params: &Parameters) -> GraphResult<()> {
        self.radius = params.integer("radius")?;
        Ok(())
    }

    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
        compute_with(ctx, self.radius, f32::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Color;

    fn spot() -> Texture {
        let mut texture = Texture::filled(5, 5, Color::new(10, 10, 10, 255));
        texture.set(2, 2, Color::new(200, 100, 50, 255));
        texture
    }

    #[test]
    fn test_dilate_spreads_bright_pixel() {
        let texture = spot();
        assert_eq!(
            fold_neighborhood(&texture, (1, 1), 1, f32::max),
            [200.0, 100.0, 50.0, 255.0]
        );
        assert_eq!(
            fold_neighborhood(&texture, (0, 0), 1, f32::max),
            [10.0, 10.0, 10.0, 255.0]
        );
    }

    #[test]
    fn test_erode_removes_bright_pixel() {
        let texture = spot();
        assert_eq!(
            fold_neighborhood(&texture, (2, 2), 1, f32::min),
            [10.0, 10.0, 10.0, 255.0]
        );
        assert_eq!(
            fold_neighborhood(&texture, (2, 2), 0, f32::min),
            [200.0, 100.0, 50.0, 255.0]
        );
    }

    #[test]
    fn test_out_of_range_neighbors_are_skipped() {
        // Erosion at a corner must not pick up transparent black from outside
        let texture = Texture::filled(2, 2, Color::WHITE);
        assert_eq!(
            fold_neighborhood(&texture, (0, 0), 1, f32::min),
            [255.0, 255.0, 255.0, 255.0]
        );
        assert_eq!(fold_neighborhood(&Texture::empty(), (0, 0), 1, f32::min), [0.0; 4]);
    }

    #[test]
    fn test_far_off_center_yields_zeros() {
        let texture = spot();
        for center in [(i64::MIN, i64::MIN), (i64::MAX, 2), (2, i64::MAX)] {
            assert_eq!(fold_neighborhood(&texture, center, 64, f32::max), [0.0; 4]);
        }
        // A window that only grazes the texture still sees the edge
        assert_eq!(
            fold_neighborhood(&texture, (-1, 2), 1, f32::max),
            [10.0, 10.0, 10.0, 255.0]
        );
    }

    #[test]
    fn test_radius_attribute() {
        let registry = OperatorRegistry::with_builtins();
        assert!(registry
            .create("erode", "e", &[crate::core::port::Attribute::named("radius", "-1")])
            .is_err());
        assert!(registry
            .create("dilate", "d", &[crate::core::port::Attribute::named("radius", "3")])
            .is_ok());
    }
}
