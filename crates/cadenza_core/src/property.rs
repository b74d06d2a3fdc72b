//! Animatable properties and their values
//!
//! The set of properties an effect may animate is closed: every keyframe
//! names a [`PropertyId`] rather than a free-form string, so keyframe
//! metadata (`offset`, `easing`, `composite`) can never be mistaken for a
//! property.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while resolving property names
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// Name is not one of the animatable properties
    #[error("unknown animatable property `{0}`")]
    Unknown(String),

    /// Name is reserved for keyframe metadata
    #[error("`{0}` is keyframe metadata, not an animatable property")]
    Reserved(String),
}

/// Keyframe member names that carry metadata instead of property values
pub const RESERVED_NAMES: [&str; 3] = ["offset", "easing", "composite"];

/// Identifier of an animatable property
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyId {
    Opacity,
    Left,
    Top,
    Width,
    Height,
    TranslateX,
    TranslateY,
    TranslateZ,
    /// Rotation about the view axis, in degrees
    Rotate,
    /// Uniform scale factor
    Scale,
    /// Tone-mapping exposure of the rendered scene
    Exposure,
    Color,
    Visibility,
}

impl PropertyId {
    /// Every animatable property, in declaration order
    pub const ALL: [PropertyId; 13] = [
        PropertyId::Opacity,
        PropertyId::Left,
        PropertyId::Top,
        PropertyId::Width,
        PropertyId::Height,
        PropertyId::TranslateX,
        PropertyId::TranslateY,
        PropertyId::TranslateZ,
        PropertyId::Rotate,
        PropertyId::Scale,
        PropertyId::Exposure,
        PropertyId::Color,
        PropertyId::Visibility,
    ];

    /// CSS-style name of the property
    pub const fn name(self) -> &'static str {
        match self {
            PropertyId::Opacity => "opacity",
            PropertyId::Left => "left",
            PropertyId::Top => "top",
            PropertyId::Width => "width",
            PropertyId::Height => "height",
            PropertyId::TranslateX => "translate-x",
            PropertyId::TranslateY => "translate-y",
            PropertyId::TranslateZ => "translate-z",
            PropertyId::Rotate => "rotate",
            PropertyId::Scale => "scale",
            PropertyId::Exposure => "exposure",
            PropertyId::Color => "color",
            PropertyId::Visibility => "visibility",
        }
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PropertyId {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if RESERVED_NAMES.contains(&s) {
            return Err(PropertyError::Reserved(s.to_string()));
        }
        // Accept both kebab-case and snake_case spellings
        let normalized = s.trim().replace('_', "-");
        PropertyId::ALL
            .iter()
            .copied()
            .find(|id| id.name() == normalized)
            .ok_or_else(|| PropertyError::Unknown(s.to_string()))
    }
}

/// A typed property value
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    /// Unitless number
    Number(f64),
    /// Length in pixels
    Length(f64),
    /// Angle in degrees
    Angle(f64),
    /// Linear RGBA, each channel 0.0 to 1.0
    Color([f64; 4]),
    /// Identifier such as `visible` or `hidden`
    Keyword(String),
}

impl PropertyValue {
    /// Numeric payload for scalar values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(v) | PropertyValue::Length(v) | PropertyValue::Angle(v) => {
                Some(*v)
            }
            PropertyValue::Color(_) | PropertyValue::Keyword(_) => None,
        }
    }

    /// Keyword payload, if any
    pub fn as_keyword(&self) -> Option<&str> {
        match self {
            PropertyValue::Keyword(k) => Some(k),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Number(v) => write!(f, "{}", v),
            PropertyValue::Length(v) => write!(f, "{}px", v),
            PropertyValue::Angle(v) => write!(f, "{}deg", v),
            PropertyValue::Color([r, g, b, a]) => write!(
                f,
                "rgba({}, {}, {}, {})",
                (r * 255.0).round(),
                (g * 255.0).round(),
                (b * 255.0).round(),
                a
            ),
            PropertyValue::Keyword(k) => f.write_str(k),
        }
    }
}
