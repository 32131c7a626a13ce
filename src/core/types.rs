//! Core value types that flow between node ports.
//!
//! The type system is a closed enum rather than erased storage:
//! - Every port carries a [`PortType`] fixed when the node is constructed
//! - Bindings compare port types up front and reject mismatches
//! - Reading a value back is a pattern match, never a cast

use crate::core::texture::Texture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Shared handle to an immutable texture.
pub type TextureRef = Arc<Texture>;

/// A value held by an output port or a node parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Shared image
    Texture(TextureRef),
    /// Scalar channel value
    Float(f32),
    /// Integer parameter
    Integer(i64),
    /// 2D vector, usually a normalized coordinate
    Vector2([f32; 2]),
    /// 4-channel color with channels in the 0..=255 range
    Vector4([f32; 4]),
    /// Row-major 3x3 kernel
    Matrix3([f32; 9]),
    /// Finalized 8-bit color
    Color(Color),
    /// Free-form text parameter
    String(String),
}

/// Port and parameter types used for type checking bindings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PortType {
    Texture,
    Float,
    Integer,
    Vector2,
    Vector4,
    Matrix3,
    Color,
    String,
}

/// RGBA color value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

// ============================================================================
// Value Implementation
// ============================================================================

impl Value {
    /// Get the port type of this value.
    pub fn get_type(&self) -> PortType {
        match self {
            Value::Texture(_) => PortType::Texture,
            Value::Float(_) => PortType::Float,
            Value::Integer(_) => PortType::Integer,
            Value::Vector2(_) => PortType::Vector2,
            Value::Vector4(_) => PortType::Vector4,
            Value::Matrix3(_) => PortType::Matrix3,
            Value::Color(_) => PortType::Color,
            Value::String(_) => PortType::String,
        }
    }

    /// Try to get this value as a texture handle.
    pub fn as_texture(&self) -> Option<&TextureRef> {
        if let Value::Texture(texture) = self {
            Some(texture)
        } else {
            None
        }
    }

    /// Try to get this value as a float.
    /// Integers are converted.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f32),
            _ => None,
        }
    }

    /// Try to get this value as an integer.
    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    /// Try to get this value as a 2D vector.
    pub fn as_vector2(&self) -> Option<[f32; 2]> {
        if let Value::Vector2(v) = self {
            Some(*v)
        } else {
            None
        }
    }

    /// Try to get this value as a 4D vector.
    pub fn as_vector4(&self) -> Option<[f32; 4]> {
        if let Value::Vector4(v) = self {
            Some(*v)
        } else {
            None
        }
    }

    /// Try to get this value as a 3x3 matrix.
    pub fn as_matrix3(&self) -> Option<[f32; 9]> {
        if let Value::Matrix3(m) = self {
            Some(*m)
        } else {
            None
        }
    }

    /// Try to get this value as a color.
    pub fn as_color(&self) -> Option<Color> {
        if let Value::Color(c) = self {
            Some(*c)
        } else {
            None
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_string(&self) -> Option<&str> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Texture(t) => write!(f, "Texture({}x{})", t.width(), t.height()),
            Value::Float(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Vector2(v) => write!(f, "({}, {})", v[0], v[1]),
            Value::Vector4(v) => write!(f, "({}, {}, {}, {})", v[0], v[1], v[2], v[3]),
            Value::Matrix3(m) => write!(f, "{:?}", m),
            Value::Color(c) => write!(f, "{}", c),
            Value::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

// ============================================================================
// PortType Implementation
// ============================================================================

impl PortType {
    /// The value an output slot of this type holds before anything is written.
    pub fn default_value(&self) -> Value {
        match self {
            PortType::Texture => Value::Texture(Arc::new(Texture::empty())),
            PortType::Float => Value::Float(0.0),
            PortType::Integer => Value::Integer(0),
            PortType::Vector2 => Value::Vector2([0.0; 2]),
            PortType::Vector4 => Value::Vector4([0.0; 4]),
            PortType::Matrix3 => Value::Matrix3([0.0; 9]),
            PortType::Color => Value::Color(Color::TRANSPARENT),
            PortType::String => Value::String(String::new()),
        }
    }

    /// Check if a value matches this type.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (PortType::Float, Value::Integer(_)) => true,
            _ => *self == value.get_type(),
        }
    }

    /// Check if an output of this type can feed an input of `target` type.
    ///
    /// Bindings are strict: no implicit conversions between port types.
    pub fn compatible_with(&self, target: &PortType) -> bool {
        self == target
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortType::Texture => write!(f, "Texture"),
            PortType::Float => write!(f, "Float"),
            PortType::Integer => write!(f, "Integer"),
            PortType::Vector2 => write!(f, "Vector2"),
            PortType::Vector4 => write!(f, "Vector4"),
            PortType::Matrix3 => write!(f, "Matrix3"),
            PortType::Color => write!(f, "Color"),
            PortType::String => write!(f, "String"),
        }
    }
}

// ============================================================================
// Color Implementation
// ============================================================================

impl Color {
    /// Create a new color from RGBA components.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from RGB components (alpha = 255).
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Finalize a channel vector, clamping each channel to 0..=255.
    ///
    /// Fractions are truncated.
    pub fn from_channels(v: [f32; 4]) -> Self {
        let channel = |c: f32| c.clamp(0.0, 255.0) as u8;
        Self::new(channel(v[0]), channel(v[1]), channel(v[2]), channel(v[3]))
    }

    /// Channels as floats in the 0..=255 range.
    pub fn to_channels(&self) -> [f32; 4] {
        [self.r as f32, self.g as f32, self.b as f32, self.a as f32]
    }

    /// Parse a hex color string.
    ///
    /// Supports formats: "#RGB", "#RGBA", "#RRGGBB", "#RRGGBBAA"
    pub fn from_hex(hex: &str) -> Result<Self, String> {
        let hex = hex.trim_start_matches('#');
        let short = |i: usize| {
            u8::from_str_radix(&hex[i..i + 1], 16)
                .map(|v| v * 17)
                .map_err(|e| e.to_string())
        };
        let long = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());

        if !hex.is_ascii() {
            return Err(format!("Invalid hex color: {}", hex));
        }

        match hex.len() {
            3 => Ok(Self::rgb(short(0)?, short(1)?, short(2)?)),
            4 => Ok(Self::new(short(0)?, short(1)?, short(2)?, short(3)?)),
            6 => Ok(Self::rgb(long(0)?, long(2)?, long(4)?)),
            8 => Ok(Self::new(long(0)?, long(2)?, long(4)?, long(6)?)),
            _ => Err(format!(
                "Invalid hex color format: expected 3, 4, 6, or 8 characters, got {}",
                hex.len()
            )),
        }
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    /// Convert to image crate's Rgba type.
    pub fn to_rgba(&self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }

    /// Create from image crate's Rgba type.
    pub fn from_rgba(rgba: image::Rgba<u8>) -> Self {
        Self::new(rgba[0], rgba[1], rgba[2], rgba[3])
    }

    /// Common colors
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// The color returned for samples outside an image.
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
}

impl Default for Color {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
