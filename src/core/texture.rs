//! RGBA raster used both as operator input and as render target.
//!
//! Reads outside the raster never fail: they return [`Color::TRANSPARENT`].

use crate::core::types::Color;
use image::{DynamicImage, RgbaImage};
use std::path::Path;
use std::sync::OnceLock;

/// An 8-bit RGBA image with bounds-checked pixel access.
#[derive(Debug, Clone)]
pub struct Texture {
    buffer: RgbaImage,
    average: OnceLock<[f32; 4]>,
}

impl Texture {
    /// Create a transparent texture of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_buffer(RgbaImage::new(width, height))
    }

    /// Create a 0x0 texture. Every sample is transparent.
    pub fn empty() -> Self {
        Self::new(0, 0)
    }

    /// Create a texture filled with one color.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self::from_buffer(RgbaImage::from_pixel(width, height, color.to_rgba()))
    }

    /// Wrap a decoded image, converting it to RGBA8.
    pub fn from_image(image: DynamicImage) -> Self {
        Self::from_buffer(image.to_rgba8())
    }

    /// Wrap an RGBA buffer.
    pub fn from_buffer(buffer: RgbaImage) -> Self {
        Self {
            buffer,
            average: OnceLock::new(),
        }
    }

    /// Load and decode an image file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, image::ImageError> {
        Ok(Self::from_image(image::open(path)?))
    }

    /// Encode to a file; the format follows the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
        self.buffer.save(path)
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Borrow the underlying buffer.
    pub fn buffer(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Read a pixel. Out-of-range coordinates yield [`Color::TRANSPARENT`].
    pub fn get(&self, x: i64, y: i64) -> Color {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return Color::TRANSPARENT;
        }
        Color::from_rgba(*self.buffer.get_pixel(x as u32, y as u32))
    }

    /// Write a pixel. Returns `false` and writes nothing when out of range.
    pub fn set(&mut self, x: i64, y: i64, color: Color) -> bool {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return false;
        }
        self.buffer.put_pixel(x as u32, y as u32, color.to_rgba());
        self.average = OnceLock::new();
        true
    }

    /// Integer pixel addressed by a normalized coordinate.
    ///
    /// `floor(u * width), floor(v * height)`; no interpolation.
    pub fn pixel_at(&self, uv: [f32; 2]) -> (i64, i64) {
        let x = (uv[0] * self.width() as f32).floor() as i64;
        let y = (uv[1] * self.height() as f32).floor() as i64;
        (x, y)
    }

    /// Nearest-neighbor sample at a normalized coordinate.
    pub fn sample(&self, uv: [f32; 2]) -> Color {
        let (x, y) = self.pixel_at(uv);
        self.get(x, y)
    }

    /// Mean RGB over all pixels (alpha channel reported as 0).
    ///
    /// Computed on first use and cached until the next [`Texture::set`].
    pub fn average_color(&self) -> [f32; 4] {
        *self.average.get_or_init(|| {
            let count = self.width() as usize * self.height() as usize;
            if count == 0 {
                return [0.0; 4];
            }
            let mut sum = [0.0f64; 3];
            for pixel in self.buffer.pixels() {
                for (acc, channel) in sum.iter_mut().zip(pixel.0.iter()) {
                    *acc += *channel as f64;
                }
            }
            let n = count as f64;
            [
                (sum[0] / n) as f32,
                (sum[1] / n) as f32,
                (sum[2] / n) as f32,
                0.0,
            ]
        })
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.buffer == other.buffer
    }
}

impl Default for Texture {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_get_is_transparent() {
        let texture = Texture::filled(1, 1, Color::WHITE);
        assert_eq!(texture.get(0, 0), Color::WHITE);
        assert_eq!(texture.get(2, 2), Color::TRANSPARENT);
        assert_eq!(texture.get(-1, 0), Color::TRANSPARENT);
    }

    #[test]
    fn test_set_rejects_out_of_range() {
        let mut texture = Texture::new(2, 2);
        assert!(texture.set(1, 1, Color::BLACK));
        assert!(!texture.set(2, 0, Color::BLACK));
        assert_eq!(texture.get(1, 1), Color::BLACK);
    }

    #[test]
    fn test_sample_uses_nearest_pixel() {
        let mut texture = Texture::filled(2, 2, Color::BLACK);
        texture.set(1, 0, Color::WHITE);

        assert_eq!(texture.sample([0.75, 0.25]), Color::WHITE);
        assert_eq!(texture.sample([0.25, 0.25]), Color::BLACK);
        assert_eq!(texture.sample([2.5, 2.5]), Color::TRANSPARENT);
    }

    #[test]
    fn test_average_color_is_invalidated_by_set() {
        let mut texture = Texture::filled(2, 1, Color::rgb(100, 0, 0));
        assert_eq!(texture.average_color()[0], 100.0);

        texture.set(0, 0, Color::rgb(200, 0, 0));
        assert_eq!(texture.average_color()[0], 150.0);
    }

    #[test]
    fn test_empty_texture() {
        let texture = Texture::empty();
        assert_eq!(texture.width(), 0);
        assert_eq!(texture.sample([0.5, 0.5]), Color::TRANSPARENT);
        assert_eq!(texture.average_color(), [0.0; 4]);
    }
}
