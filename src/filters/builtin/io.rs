//! Image source and sink nodes.

use crate::core::context::NodeContext;
use crate::core::error::{ExecutionError, GraphError, GraphResult};
use crate::core::node::{Category, NodeMetadata, Operator, Parameters, Sink};
use crate::core::port::{Constraint, ParameterDefinition, PortDefinition};
use crate::core::texture::Texture;
use crate::core::types::{Color, PortType, TextureRef, Value};
use crate::filters::registry::OperatorRegistry;
use std::sync::Arc;

/// Default raster edge length of the output node.
pub const DEFAULT_RASTER_SIZE: u32 = 512;

/// Register source and sink nodes.
pub fn register(registry: &mut OperatorRegistry) {
    registry.register(|| Box::new(TextureSource::default()));
    registry.register(|| Box::new(OutputNode::default()));
}

/// Publishes an image on its `Tex` output.
#[derive(Debug, Clone, Default)]
pub struct TextureSource {
    texture: TextureRef,
}

impl TextureSource {
    /// A source serving an in-memory image.
    pub fn new(texture: Texture) -> Self {
        Self {
            texture: Arc::new(texture),
        }
    }

    pub fn texture(&self) -> &TextureRef {
        &self.texture
    }
}

impl Operator for TextureSource {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("texture", "Texture")
            .description("Provide an image to downstream samplers")
            .category(Category::Input)
            .output(PortDefinition::output("Tex", PortType::Texture).with_description("The image"))
            .parameter(
                ParameterDefinition::new(
                    "texture",
                    PortType::Texture,
                    PortType::Texture.default_value(),
                )
                .with_description("Path of the image file; empty for no image"),
            )
            .build()
    }

    fn configure(&mut self, params: &Parameters) -> GraphResult<()> {
        self.texture = params.texture("texture")?;
        log::debug!(
            "Texture node '{}' holds a {}x{} image",
            params.node(),
            self.texture.width(),
            self.texture.height()
        );
        Ok(())
    }

    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
        ctx.set_output("Tex", Value::Texture(Arc::clone(&self.texture)))
    }
}

/// The sink: finalizes the incoming channel vector into a pixel color.
#[derive(Debug, Clone)]
pub struct OutputNode {
    width: u32,
    height: u32,
}

impl OutputNode {
    /// A sink with the given raster size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for OutputNode {
    fn default() -> Self {
        Self::new(DEFAULT_RASTER_SIZE, DEFAULT_RASTER_SIZE)
    }
}

fn dimension(params: &Parameters, name: &str) -> GraphResult<u32> {
    let value = params.integer(name)?;
    u32::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| {
            let reason = format!("{} is not a valid size", value);
            GraphError::invalid_attribute(params.node(), name, reason)
        })
}

impl Operator for OutputNode {
    fn metadata(&self) -> NodeMetadata {
        let size = Value::Integer(i64::from(DEFAULT_RASTER_SIZE));
        NodeMetadata::builder("output", "Output")
            .description("Finalize each pixel of the rendered image")
            .category(Category::Output)
            .input(
                PortDefinition::input("In", PortType::Vector4).with_description("Pixel channels"),
            )
            .output(
                PortDefinition::output("Color", PortType::Color)
                    .with_description("Finalized pixel, channels clamped to [0, 255]"),
            )
            .parameter(
                ParameterDefinition::new("width", PortType::Integer, size.clone())
                    .with_description("Raster width in pixels")
                    .with_constraint(Constraint::MinValue(1.0)),
            )
            .parameter(
                ParameterDefinition::new("height", PortType::Integer, size)
                    .with_description("Raster height in pixels")
                    .with_constraint(Constraint::MinValue(1.0)),
            )
            .build()
    }

    fn configure(&mut self, params: &Parameters) -> GraphResult<()> {
        self.width = dimension(params, "width")?;
        self.height = dimension(params, "height")?;
        Ok(())
    }

    fn compute(&self, ctx: &mut NodeContext<'_>) -> Result<(), ExecutionError> {
        let channels = ctx.input_vector4("In")?;
        ctx.set_output("Color", Value::Color(Color::from_channels(channels)))
    }

    fn as_sink(&self) -> Option<&dyn Sink> {
        Some(self)
    }
}

impl Sink for OutputNode {
    fn raster_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::port::Attribute;

    #[test]
    fn test_output_defaults() {
        let registry = OperatorRegistry::with_builtins();
        let output = registry.create("Output", "out", &[]).unwrap();
        assert_eq!(output.as_sink().unwrap().raster_size(), (512, 512));
        assert_eq!(output.as_sink().unwrap().color_port(), "Color");
    }

    #[test]
    fn test_output_rejects_bad_size() {
        let registry = OperatorRegistry::with_builtins();
        for bad in ["0", "-3", "wide"] {
            let result = registry.create("output", "out", &[Attribute::named("width", bad)]);
            assert!(matches!(result, Err(GraphError::InvalidAttribute { .. })), "{}", bad);
        }
    }

    #[test]
    fn test_texture_source_without_path_is_empty() {
        let registry = OperatorRegistry::with_builtins();
        let source = registry
            .create("Texture", "tex", &[Attribute::named("Texture", "")])
            .unwrap();
        assert!(source.as_sink().is_none());
        assert_eq!(source.metadata().outputs[0].name, "Tex");
    }

    #[test]
    fn test_missing_texture_file_is_invalid() {
        let registry = OperatorRegistry::with_builtins();
        let result = registry.create(
            "texture",
            "tex",
            &[Attribute::named("texture", "/definitely/not/here.png")],
        );
        assert!(matches!(result, Err(GraphError::InvalidAttribute { .. })));
    }
}
