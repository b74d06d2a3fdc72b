//! Per-property value interpolation
//!
//! Turning two keyframe values into a function of eased progress is
//! type-specific value math. Each property is handled by a
//! [`ValueInterpolator`] plugin registered in an [`InterpolationRegistry`];
//! a plugin knows how to parse raw text for its property and how to merge
//! two parsed values into numeric components that can be blended.
//!
//! Pairs that cannot be merged (mismatched kinds, keywords, or properties
//! without a plugin) switch discretely at the halfway point.

use std::fmt;
use std::sync::Arc;

use cadenza_core::{PropertyId, PropertyValue};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::{AnimationError, Result};

/// Numeric components of a value
pub type Components = SmallVec<[f64; 4]>;

/// Rebuilds a property value from blended components
pub type Compose = Box<dyn Fn(&[f64]) -> PropertyValue + Send + Sync>;

/// Two values reduced to blendable components
pub struct MergedValues {
    pub from: Components,
    pub to: Components,
    pub compose: Compose,
}

impl MergedValues {
    pub fn new(from: Components, to: Components, compose: Compose) -> Self {
        debug_assert_eq!(from.len(), to.len());
        Self { from, to, compose }
    }

    /// Blend the components at `t` and rebuild the value
    pub fn blend(&self, t: f64) -> PropertyValue {
        let mixed: Components = self
            .from
            .iter()
            .zip(&self.to)
            .map(|(a, b)| a + (b - a) * t)
            .collect();
        (self.compose)(&mixed)
    }
}

impl fmt::Debug for MergedValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedValues")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

/// Parser and merge function for one kind of property value
pub trait ValueInterpolator: Send + Sync {
    /// Parse raw keyframe text
    fn parse(&self, raw: &str) -> Option<PropertyValue>;

    /// Reduce two values to blendable components, or `None` for a discrete flip
    fn merge(&self, from: &PropertyValue, to: &PropertyValue) -> Option<MergedValues>;
}

/// Interpolation between two keyframe values
#[derive(Debug)]
pub struct Interpolation {
    from: PropertyValue,
    to: PropertyValue,
    merged: Option<MergedValues>,
}

impl Interpolation {
    /// Interpolation that flips from `from` to `to` at the halfway point
    pub fn discrete(from: PropertyValue, to: PropertyValue) -> Self {
        Self {
            from,
            to,
            merged: None,
        }
    }

    /// Value at eased progress `t`
    ///
    /// `t == 0` and `t == 1` return the endpoint values exactly.
    pub fn at(&self, t: f64) -> PropertyValue {
        if t == 0.0 {
            return self.from.clone();
        }
        if t == 1.0 {
            return self.to.clone();
        }
        match &self.merged {
            Some(merged) => merged.blend(t),
            None if t < 0.5 => self.from.clone(),
            None => self.to.clone(),
        }
    }

    pub fn from_value(&self) -> &PropertyValue {
        &self.from
    }

    pub fn to_value(&self) -> &PropertyValue {
        &self.to
    }

    /// Whether the values blend continuously
    pub fn is_smooth(&self) -> bool {
        self.merged.is_some()
    }
}

/// Registry of value interpolators keyed by property
#[derive(Clone)]
pub struct InterpolationRegistry {
    plugins: FxHashMap<PropertyId, Arc<dyn ValueInterpolator>>,
}

impl InterpolationRegistry {
    /// Registry with no plugins; every property interpolates discretely
    pub fn empty() -> Self {
        Self {
            plugins: FxHashMap::default(),
        }
    }

    /// Registry with the built-in plugins for every property
    pub fn new() -> Self {
        let mut registry = Self::empty();
        let number: Arc<dyn ValueInterpolator> = Arc::new(NumberInterpolator);
        let length: Arc<dyn ValueInterpolator> = Arc::new(LengthInterpolator);

        registry.register_shared(PropertyId::Opacity, number.clone());
        registry.register_shared(PropertyId::Scale, number.clone());
        registry.register_shared(PropertyId::Exposure, number);
        for property in [
            PropertyId::Left,
            PropertyId::Top,
            PropertyId::Width,
            PropertyId::Height,
            PropertyId::TranslateX,
            PropertyId::TranslateY,
            PropertyId::TranslateZ,
        ] {
            registry.register_shared(property, length.clone());
        }
        registry.register(PropertyId::Rotate, AngleInterpolator);
        registry.register(PropertyId::Color, ColorInterpolator);
        registry.register(PropertyId::Visibility, VisibilityInterpolator);
        registry
    }

    /// Install or replace the plugin for a property
    pub fn register<I: ValueInterpolator + 'static>(&mut self, property: PropertyId, plugin: I) {
        self.register_shared(property, Arc::new(plugin));
    }

    /// Install a plugin instance shared with other properties
    pub fn register_shared(&mut self, property: PropertyId, plugin: Arc<dyn ValueInterpolator>) {
        self.plugins.insert(property, plugin);
    }

    /// Plugin registered for a property
    pub fn get(&self, property: PropertyId) -> Option<&Arc<dyn ValueInterpolator>> {
        self.plugins.get(&property)
    }

    /// Parse raw keyframe text for a property
    ///
    /// Properties without a plugin keep the text as a keyword.
    pub fn parse(&self, property: PropertyId, raw: &str) -> Result<PropertyValue> {
        match self.plugins.get(&property) {
            Some(plugin) => plugin
                .parse(raw.trim())
                .ok_or_else(|| AnimationError::InvalidValue {
                    property,
                    raw: raw.to_string(),
                }),
            None => Ok(PropertyValue::Keyword(raw.trim().to_string())),
        }
    }

    /// Build the interpolation between two values of a property
    pub fn interpolation(
        &self,
        property: PropertyId,
        from: &PropertyValue,
        to: &PropertyValue,
    ) -> Interpolation {
        let merged = self
            .plugins
            .get(&property)
            .and_then(|plugin| plugin.merge(from, to));
        Interpolation {
            from: from.clone(),
            to: to.clone(),
            merged,
        }
    }
}

impl Default for InterpolationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InterpolationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut properties: Vec<_> = self.plugins.keys().collect();
        properties.sort();
        f.debug_struct("InterpolationRegistry")
            .field("properties", &properties)
            .finish()
    }
}

// ============================================================================
// Built-in plugins
// ============================================================================

fn scalar(from: f64, to: f64, compose: fn(f64) -> PropertyValue) -> MergedValues {
    MergedValues::new(
        SmallVec::from_slice(&[from]),
        SmallVec::from_slice(&[to]),
        Box::new(move |c: &[f64]| compose(c[0])),
    )
}

/// Unitless numbers; a trailing `%` divides by 100
pub struct NumberInterpolator;

impl ValueInterpolator for NumberInterpolator {
    fn parse(&self, raw: &str) -> Option<PropertyValue> {
        let value = match raw.strip_suffix('%') {
            Some(percent) => percent.trim().parse::<f64>().ok()? / 100.0,
            None => raw.parse::<f64>().ok()?,
        };
        value.is_finite().then_some(PropertyValue::Number(value))
    }

    fn merge(&self, from: &PropertyValue, to: &PropertyValue) -> Option<MergedValues> {
        match (from, to) {
            (PropertyValue::Number(a), PropertyValue::Number(b)) => {
                Some(scalar(*a, *b, PropertyValue::Number))
            }
            _ => None,
        }
    }
}

/// Pixel lengths (`10px`, or a bare `0`)
pub struct LengthInterpolator;

impl ValueInterpolator for LengthInterpolator {
    fn parse(&self, raw: &str) -> Option<PropertyValue> {
        let value = match raw.strip_suffix("px") {
            Some(px) => px.trim().parse::<f64>().ok()?,
            None => raw.parse::<f64>().ok().filter(|v| *v == 0.0)?,
        };
        value.is_finite().then_some(PropertyValue::Length(value))
    }

    fn merge(&self, from: &PropertyValue, to: &PropertyValue) -> Option<MergedValues> {
        match (from, to) {
            (PropertyValue::Length(a), PropertyValue::Length(b)) => {
                Some(scalar(*a, *b, PropertyValue::Length))
            }
            _ => None,
        }
    }
}

/// Angles in `deg`, `rad` or `turn`, normalized to degrees
pub struct AngleInterpolator;

impl ValueInterpolator for AngleInterpolator {
    fn parse(&self, raw: &str) -> Option<PropertyValue> {
        let degrees = if let Some(deg) = raw.strip_suffix("deg") {
            deg.trim().parse::<f64>().ok()?
        } else if let Some(rad) = raw.strip_suffix("rad") {
            rad.trim().parse::<f64>().ok()?.to_degrees()
        } else if let Some(turn) = raw.strip_suffix("turn") {
            turn.trim().parse::<f64>().ok()? * 360.0
        } else {
            raw.parse::<f64>().ok().filter(|v| *v == 0.0)?
        };
        degrees.is_finite().then_some(PropertyValue::Angle(degrees))
    }

    fn merge(&self, from: &PropertyValue, to: &PropertyValue) -> Option<MergedValues> {
        match (from, to) {
            (PropertyValue::Angle(a), PropertyValue::Angle(b)) => {
                Some(scalar(*a, *b, PropertyValue::Angle))
            }
            _ => None,
        }
    }
}

/// RGBA colors, blended in premultiplied-alpha space
pub struct ColorInterpolator;

impl ColorInterpolator {
    fn premultiply([r, g, b, a]: [f64; 4]) -> Components {
        SmallVec::from_slice(&[r * a, g * a, b * a, a])
    }

    fn unpremultiply(c: &[f64]) -> PropertyValue {
        let alpha = c[3].clamp(0.0, 1.0);
        if alpha == 0.0 {
            return PropertyValue::Color([0.0, 0.0, 0.0, 0.0]);
        }
        let channel = |v: f64| (v / alpha).clamp(0.0, 1.0);
        PropertyValue::Color([channel(c[0]), channel(c[1]), channel(c[2]), alpha])
    }
}

impl ValueInterpolator for ColorInterpolator {
    fn parse(&self, raw: &str) -> Option<PropertyValue> {
        parse_color(raw).map(PropertyValue::Color)
    }

    fn merge(&self, from: &PropertyValue, to: &PropertyValue) -> Option<MergedValues> {
        match (from, to) {
            (PropertyValue::Color(a), PropertyValue::Color(b)) => Some(MergedValues::new(
                Self::premultiply(*a),
                Self::premultiply(*b),
                Box::new(Self::unpremultiply),
            )),
            _ => None,
        }
    }
}

/// `visible` / `hidden`; stays visible for the whole transition if either end is visible
pub struct VisibilityInterpolator;

impl ValueInterpolator for VisibilityInterpolator {
    fn parse(&self, raw: &str) -> Option<PropertyValue> {
        matches!(raw, "visible" | "hidden" | "collapse")
            .then(|| PropertyValue::Keyword(raw.to_string()))
    }

    fn merge(&self, from: &PropertyValue, to: &PropertyValue) -> Option<MergedValues> {
        let is_visible = |v: &PropertyValue| v.as_keyword() == Some("visible");
        if !is_visible(from) && !is_visible(to) {
            return None;
        }
        let (from, to) = (from.clone(), to.clone());
        Some(MergedValues::new(
            SmallVec::from_slice(&[0.0]),
            SmallVec::from_slice(&[1.0]),
            Box::new(move |c: &[f64]| {
                if c[0] <= 0.0 {
                    from.clone()
                } else if c[0] >= 1.0 {
                    to.clone()
                } else {
                    PropertyValue::Keyword("visible".to_string())
                }
            }),
        ))
    }
}

/// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(..)`, `rgba(..)` or a basic name
fn parse_color(raw: &str) -> Option<[f64; 4]> {
    let raw = raw.trim().to_ascii_lowercase();
    match raw.as_str() {
        "transparent" => return Some([0.0, 0.0, 0.0, 0.0]),
        "black" => return Some([0.0, 0.0, 0.0, 1.0]),
        "white" => return Some([1.0, 1.0, 1.0, 1.0]),
        "red" => return Some([1.0, 0.0, 0.0, 1.0]),
        "green" => return Some([0.0, 128.0 / 255.0, 0.0, 1.0]),
        "blue" => return Some([0.0, 0.0, 1.0, 1.0]),
        _ => {}
    }

    if let Some(hex) = raw.strip_prefix('#') {
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<_>>()?;
        let channels: Vec<u8> = match digits.len() {
            3 | 4 => digits.iter().map(|d| d * 17).collect(),
            6 | 8 => digits.chunks(2).map(|p| p[0] * 16 + p[1]).collect(),
            _ => return None,
        };
        let alpha = channels.get(3).map_or(1.0, |a| *a as f64 / 255.0);
        return Some([
            channels[0] as f64 / 255.0,
            channels[1] as f64 / 255.0,
            channels[2] as f64 / 255.0,
            alpha,
        ]);
    }

    let inner = raw
        .strip_prefix("rgba(")
        .or_else(|| raw.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let parts: Vec<f64> = inner
        .split(',')
        .map(|p| p.trim().parse::<f64>().ok())
        .collect::<Option<_>>()?;
    let (rgb, alpha) = match parts.as_slice() {
        [r, g, b] => ([*r, *g, *b], 1.0),
        [r, g, b, a] => ([*r, *g, *b], *a),
        _ => return None,
    };
    let channel = |v: f64| (v / 255.0).clamp(0.0, 1.0);
    Some([
        channel(rgb[0]),
        channel(rgb[1]),
        channel(rgb[2]),
        alpha.clamp(0.0, 1.0),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_builtin_kinds() {
        let registry = InterpolationRegistry::new();
        assert_eq!(
            registry.parse(PropertyId::Left, "10px"),
            Ok(PropertyValue::Length(10.0))
        );
        assert_eq!(
            registry.parse(PropertyId::Top, "0"),
            Ok(PropertyValue::Length(0.0))
        );
        assert_eq!(
            registry.parse(PropertyId::Opacity, "50%"),
            Ok(PropertyValue::Number(0.5))
        );
        assert_eq!(
            registry.parse(PropertyId::Rotate, "0.5turn"),
            Ok(PropertyValue::Angle(180.0))
        );
        assert_eq!(
            registry.parse(PropertyId::Color, "#ff0000"),
            Ok(PropertyValue::Color([1.0, 0.0, 0.0, 1.0]))
        );
        assert_eq!(
            registry.parse(PropertyId::Color, "rgba(0, 0, 255, 0.5)"),
            Ok(PropertyValue::Color([0.0, 0.0, 1.0, 0.5]))
        );
    }

    #[test]
    fn test_parse_rejects_wrong_units() {
        let registry = InterpolationRegistry::new();
        assert_eq!(
            registry.parse(PropertyId::Left, "10deg"),
            Err(AnimationError::InvalidValue {
                property: PropertyId::Left,
                raw: "10deg".to_string()
            })
        );
        assert!(registry.parse(PropertyId::Left, "12").is_err());
        assert!(registry.parse(PropertyId::Color, "#12").is_err());
    }

    #[test]
    fn test_numeric_interpolation() {
        let registry = InterpolationRegistry::new();
        let interp = registry.interpolation(
            PropertyId::Left,
            &PropertyValue::Length(0.0),
            &PropertyValue::Length(10.0),
        );
        assert!(interp.is_smooth());
        assert_eq!(interp.at(0.5), PropertyValue::Length(5.0));
        assert_eq!(interp.at(1.5), PropertyValue::Length(15.0));
    }

    #[test]
    fn test_endpoints_are_exact_even_for_lossy_merges() {
        let registry = InterpolationRegistry::new();
        let from = PropertyValue::Color([0.3, 0.6, 0.9, 0.7]);
        let to = PropertyValue::Color([0.1, 0.2, 0.3, 0.0]);
        let interp = registry.interpolation(PropertyId::Color, &from, &to);
        assert_eq!(interp.at(0.0), from);
        assert_eq!(interp.at(1.0), to);
    }

    #[test]
    fn test_color_blends_premultiplied() {
        let registry = InterpolationRegistry::new();
        let interp = registry.interpolation(
            PropertyId::Color,
            &PropertyValue::Color([1.0, 0.0, 0.0, 1.0]),
            &PropertyValue::Color([0.0, 0.0, 1.0, 0.0]),
        );
        // Fading towards transparent keeps the source hue
        let PropertyValue::Color([r, g, b, a]) = interp.at(0.5) else {
            panic!("expected a color");
        };
        assert!((r - 1.0).abs() < 1e-9);
        assert_eq!(g, 0.0);
        assert_eq!(b, 0.0);
        assert!((a - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_mismatched_kinds_are_discrete() {
        let registry = InterpolationRegistry::new();
        let interp = registry.interpolation(
            PropertyId::Left,
            &PropertyValue::Length(0.0),
            &PropertyValue::Keyword("auto".into()),
        );
        assert!(!interp.is_smooth());
        assert_eq!(interp.at(0.49), PropertyValue::Length(0.0));
        assert_eq!(interp.at(0.5), PropertyValue::Keyword("auto".into()));
    }

    #[test]
    fn test_visibility_stays_visible_in_between() {
        let registry = InterpolationRegistry::new();
        let hidden = PropertyValue::Keyword("hidden".into());
        let visible = PropertyValue::Keyword("visible".into());
        let interp = registry.interpolation(PropertyId::Visibility, &visible, &hidden);
        assert_eq!(interp.at(0.9), visible);
        assert_eq!(interp.at(1.0), hidden);
    }

    #[test]
    fn test_properties_without_plugin_are_keywords() {
        let mut registry = InterpolationRegistry::new();
        registry.plugins.remove(&PropertyId::Scale);
        assert_eq!(
            registry.parse(PropertyId::Scale, " big "),
            Ok(PropertyValue::Keyword("big".into()))
        );
    }
}
