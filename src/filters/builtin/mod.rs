//! Built-in operator implementations.
//!
//! This module contains the standard operators that ship with pixgraph.

mod io;
mod sample;
mod color;
mod morphology;
mod noise;
mod math;

use crate::filters::registry::OperatorRegistry;

/// Register all built-in operators.
pub fn register_all(registry: &mut OperatorRegistry) {
    io::register(registry);
    sample::register(registry);
    color::register(registry);
    morphology::register(registry);
    noise::register(registry);
    math::register(registry);
}

// Re-export for direct access
pub use io::{OutputNode, TextureSource, DEFAULT_RASTER_SIZE};
pub use sample::{Matrix3Constant, MatrixSample, Move, SampleTexture, IDENTITY_3X3};
pub use color::{Binarize, Clamp, Contrast, GrayToRgb, Grayscale, Invert};
pub use morphology::{Dilate, Erode};
pub use noise::SaltPepperNoise;
pub use math::{Math, MathOp};
