//! Ready-made effects for common entry/exit animations
//!
//! Presets only describe keyframes; pair them with a [`Timing`] to play.
//!
//! [`Timing`]: crate::timing::Timing

use cadenza_core::{PropertyId, PropertyValue};

use crate::easing::Easing;
use crate::keyframe::{EffectInput, RawKeyframe};

/// Edge an element slides in from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlideFrom {
    Left,
    Right,
    Top,
    Bottom,
}

/// Distance used by the named slide presets, in px
pub const DEFAULT_SLIDE_DISTANCE: f64 = 40.0;

/// Names accepted by [`AnimationPreset::by_name`]
pub const PRESET_NAMES: &[&str] = &[
    "fade-in",
    "fade-out",
    "scale-in",
    "scale-out",
    "pop-in",
    "slide-in-left",
    "slide-in-right",
    "slide-in-top",
    "slide-in-bottom",
    "shake",
    "pulse",
    "spin",
];

/// Pre-built effects for common patterns
pub struct AnimationPreset;

impl AnimationPreset {
    /// Look up a preset by its kebab-case name
    pub fn by_name(name: &str) -> Option<EffectInput> {
        let effect = match name {
            "fade-in" => Self::fade_in(),
            "fade-out" => Self::fade_out(),
            "scale-in" => Self::scale_in(),
            "scale-out" => Self::scale_out(),
            "pop-in" => Self::pop_in(),
            "slide-in-left" => Self::slide_in(SlideFrom::Left, DEFAULT_SLIDE_DISTANCE),
            "slide-in-right" => Self::slide_in(SlideFrom::Right, DEFAULT_SLIDE_DISTANCE),
            "slide-in-top" => Self::slide_in(SlideFrom::Top, DEFAULT_SLIDE_DISTANCE),
            "slide-in-bottom" => Self::slide_in(SlideFrom::Bottom, DEFAULT_SLIDE_DISTANCE),
            "shake" => Self::shake(10.0),
            "pulse" => Self::pulse(),
            "spin" => Self::spin(),
            _ => return None,
        };
        Some(effect)
    }

    // ========================================================================
    // Fade
    // ========================================================================

    pub fn fade_in() -> EffectInput {
        EffectInput::new()
            .value_at(0.0, PropertyId::Opacity, number(0.0), Easing::EaseOut)
            .value_at(1.0, PropertyId::Opacity, number(1.0), Easing::Linear)
    }

    pub fn fade_out() -> EffectInput {
        EffectInput::new()
            .value_at(0.0, PropertyId::Opacity, number(1.0), Easing::EaseIn)
            .value_at(1.0, PropertyId::Opacity, number(0.0), Easing::Linear)
    }

    // ========================================================================
    // Scale
    // ========================================================================

    /// Grow from nothing while fading in
    pub fn scale_in() -> EffectInput {
        EffectInput::new()
            .keyframe(scale_opacity(0.0, 0.0, 0.0).easing(Easing::EaseOutCubic))
            .keyframe(scale_opacity(1.0, 1.0, 1.0))
    }

    pub fn scale_out() -> EffectInput {
        EffectInput::new()
            .keyframe(scale_opacity(0.0, 1.0, 1.0).easing(Easing::EaseInCubic))
            .keyframe(scale_opacity(1.0, 0.0, 0.0))
    }

    /// Scale in with a slight overshoot
    pub fn pop_in() -> EffectInput {
        EffectInput::new()
            .keyframe(scale_opacity(0.0, 0.0, 0.0).easing(Easing::EaseOut))
            .keyframe(scale_opacity(0.7, 1.1, 1.0).easing(Easing::EaseInOut))
            .keyframe(scale_opacity(1.0, 1.0, 1.0))
    }

    /// Pulse up and back down
    pub fn pulse() -> EffectInput {
        EffectInput::new()
            .value_at(0.0, PropertyId::Scale, number(1.0), Easing::EaseInOut)
            .value_at(0.5, PropertyId::Scale, number(1.1), Easing::EaseInOut)
            .value_at(1.0, PropertyId::Scale, number(1.0), Easing::Linear)
    }

    // ========================================================================
    // Motion
    // ========================================================================

    /// Slide in from `from`, `distance` px away, while fading in
    pub fn slide_in(from: SlideFrom, distance: f64) -> EffectInput {
        let (property, start) = match from {
            SlideFrom::Left => (PropertyId::TranslateX, -distance),
            SlideFrom::Right => (PropertyId::TranslateX, distance),
            SlideFrom::Top => (PropertyId::TranslateY, -distance),
            SlideFrom::Bottom => (PropertyId::TranslateY, distance),
        };
        EffectInput::new()
            .keyframe(
                RawKeyframe::at(0.0)
                    .set(property, PropertyValue::Length(start))
                    .set(PropertyId::Opacity, number(0.0))
                    .easing(Easing::EaseOutCubic),
            )
            .keyframe(
                RawKeyframe::at(1.0)
                    .set(property, PropertyValue::Length(0.0))
                    .set(PropertyId::Opacity, number(1.0)),
            )
    }

    /// Horizontal shake that settles back at the origin
    pub fn shake(intensity: f64) -> EffectInput {
        let steps = [
            (0.0, 0.0),
            (0.1, -intensity),
            (0.3, intensity),
            (0.5, -intensity * 0.8),
            (0.7, intensity * 0.6),
            (0.9, -intensity * 0.3),
            (1.0, 0.0),
        ];
        steps.iter().fold(EffectInput::new(), |effect, &(offset, x)| {
            effect.value_at(
                offset,
                PropertyId::TranslateX,
                PropertyValue::Length(x),
                Easing::EaseInOut,
            )
        })
    }

    /// One full turn
    pub fn spin() -> EffectInput {
        EffectInput::new()
            .value_at(0.0, PropertyId::Rotate, PropertyValue::Angle(0.0), Easing::Linear)
            .value_at(1.0, PropertyId::Rotate, PropertyValue::Angle(360.0), Easing::Linear)
    }
}

fn number(value: f64) -> PropertyValue {
    PropertyValue::Number(value)
}

fn scale_opacity(offset: f64, scale: f64, opacity: f64) -> RawKeyframe {
    RawKeyframe::at(offset)
        .set(PropertyId::Scale, number(scale))
        .set(PropertyId::Opacity, number(opacity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::compile;
    use cadenza_core::StyleMap;

    fn sample(effect: &EffectInput, fraction: f64) -> StyleMap {
        let sampler = compile(effect).unwrap();
        let mut style = StyleMap::new();
        sampler.sample(&mut style, Some(fraction));
        style
    }

    #[test]
    fn test_every_named_preset_compiles() {
        for name in PRESET_NAMES {
            let effect = AnimationPreset::by_name(name).unwrap();
            assert!(compile(&effect).is_ok(), "{name}");
        }
        assert!(AnimationPreset::by_name("wobble").is_none());
    }

    #[test]
    fn test_fade_in_endpoints() {
        let effect = AnimationPreset::fade_in();
        assert_eq!(sample(&effect, 0.0).get(PropertyId::Opacity), Some(&number(0.0)));
        assert_eq!(sample(&effect, 1.0).get(PropertyId::Opacity), Some(&number(1.0)));
    }

    #[test]
    fn test_slide_in_left_starts_offscreen() {
        let effect = AnimationPreset::slide_in(SlideFrom::Left, 50.0);
        let start = sample(&effect, 0.0);
        assert_eq!(
            start.get(PropertyId::TranslateX),
            Some(&PropertyValue::Length(-50.0))
        );
        let end = sample(&effect, 1.0);
        assert_eq!(end.get(PropertyId::TranslateX), Some(&PropertyValue::Length(0.0)));
    }

    #[test]
    fn test_pop_in_overshoots() {
        let style = sample(&AnimationPreset::pop_in(), 0.7);
        let scale = style.get(PropertyId::Scale).and_then(PropertyValue::as_f64);
        assert!(scale.is_some_and(|s| s > 1.0));
    }

    #[test]
    fn test_shake_returns_to_origin() {
        let style = sample(&AnimationPreset::shake(10.0), 1.0);
        assert_eq!(
            style.get(PropertyId::TranslateX),
            Some(&PropertyValue::Length(0.0))
        );
    }
}
