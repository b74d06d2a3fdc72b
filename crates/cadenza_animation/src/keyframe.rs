//! Keyframe effects
//!
//! This module turns a user-supplied list of keyframes into a compiled
//! [`KeyframeSampler`]: per-property interpolation segments that cover the
//! whole real line, so every fraction (not just `[0, 1]`) resolves to
//! exactly one segment per property.

use cadenza_core::{PropertyId, PropertySink, PropertyValue};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::easing::Easing;
use crate::error::{AnimationError, Result};
use crate::interpolation::{Interpolation, InterpolationRegistry};

// ============================================================================
// Raw input
// ============================================================================

/// How a keyframe's values combine with the underlying value
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompositeOperation {
    #[default]
    Replace,
    Add,
    Accumulate,
}

/// A user-supplied keyframe, possibly setting several properties at once
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawKeyframe {
    /// Position in the iteration (0.0 to 1.0); `None` to space automatically
    pub offset: Option<f64>,
    /// Easing used from this keyframe to the next one
    pub easing: Easing,
    pub composite: CompositeOperation,
    /// Property values set by this keyframe
    pub values: SmallVec<[(PropertyId, PropertyValue); 4]>,
}

impl RawKeyframe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyframe at an explicit offset
    pub fn at(offset: f64) -> Self {
        Self {
            offset: Some(offset),
            ..Self::default()
        }
    }

    /// Builder: set the easing towards the next keyframe
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Builder: set the composite operation
    pub fn composite(mut self, composite: CompositeOperation) -> Self {
        self.composite = composite;
        self
    }

    /// Builder: set a property value
    pub fn set(mut self, property: PropertyId, value: PropertyValue) -> Self {
        self.values.push((property, value));
        self
    }
}

/// Ordered list of raw keyframes describing one effect
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectInput {
    keyframes: Vec<RawKeyframe>,
}

impl EffectInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a keyframe (builder pattern)
    pub fn keyframe(mut self, keyframe: RawKeyframe) -> Self {
        self.keyframes.push(keyframe);
        self
    }

    /// Add a single-property keyframe at an offset (builder pattern)
    pub fn value_at(
        self,
        offset: f64,
        property: PropertyId,
        value: PropertyValue,
        easing: Easing,
    ) -> Self {
        self.keyframe(RawKeyframe::at(offset).set(property, value).easing(easing))
    }

    pub fn push(&mut self, keyframe: RawKeyframe) {
        self.keyframes.push(keyframe);
    }

    pub fn keyframes(&self) -> &[RawKeyframe] {
        &self.keyframes
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }
}

impl From<Vec<RawKeyframe>> for EffectInput {
    fn from(keyframes: Vec<RawKeyframe>) -> Self {
        Self { keyframes }
    }
}

/// Validate offsets and fill in the missing ones
///
/// Explicit offsets must lie in `[0, 1]` and must not decrease. A missing
/// last offset becomes 1, a missing first offset becomes 0 (when there is
/// more than one keyframe), and the remaining gaps are spaced evenly
/// between their explicit neighbours.
pub fn normalize_keyframes(keyframes: &[RawKeyframe]) -> Result<Vec<f64>> {
    let mut previous = f64::NEG_INFINITY;
    for (index, keyframe) in keyframes.iter().enumerate() {
        if keyframe.composite != CompositeOperation::Replace {
            return Err(AnimationError::UnsupportedComposite(
                format!("{:?}", keyframe.composite).to_lowercase(),
            ));
        }
        let Some(offset) = keyframe.offset else {
            continue;
        };
        if !(0.0..=1.0).contains(&offset) {
            return Err(AnimationError::OffsetOutOfRange { index, offset });
        }
        if offset < previous {
            return Err(AnimationError::OffsetsNotSorted { index });
        }
        previous = offset;
    }

    let mut offsets: Vec<Option<f64>> = keyframes.iter().map(|k| k.offset).collect();
    let len = offsets.len();
    if len == 0 {
        return Ok(Vec::new());
    }
    if offsets[len - 1].is_none() {
        offsets[len - 1] = Some(1.0);
    }
    if len > 1 && offsets[0].is_none() {
        offsets[0] = Some(0.0);
    }

    let mut previous_index = 0;
    let mut previous_offset = offsets[0].unwrap_or(0.0);
    for i in 1..len {
        if let Some(offset) = offsets[i] {
            let span = i - previous_index;
            for j in 1..span {
                offsets[previous_index + j] =
                    Some(previous_offset + (offset - previous_offset) * j as f64 / span as f64);
            }
            previous_index = i;
            previous_offset = offset;
        }
    }

    Ok(offsets.into_iter().map(|o| o.unwrap_or(1.0)).collect())
}

// ============================================================================
// Property-specific keyframes
// ============================================================================

/// One waypoint of one property
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframe {
    /// Position in the iteration (0.0 to 1.0)
    pub offset: f64,
    /// Easing used from this keyframe to the next one
    pub easing: Easing,
    pub value: PropertyValue,
}

/// Keyframes affecting one property, in offset order
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyKeyframes {
    pub property: PropertyId,
    pub keyframes: Vec<Keyframe>,
}

/// Normalize raw keyframes and split them into per-property groups
///
/// Groups are returned in order of first appearance. Every group must start
/// at offset 0 and end at offset 1.
pub fn group_keyframes(input: &EffectInput) -> Result<Vec<PropertyKeyframes>> {
    let offsets = normalize_keyframes(input.keyframes())?;
    let mut groups: Vec<PropertyKeyframes> = Vec::new();

    for (raw, offset) in input.keyframes().iter().zip(offsets) {
        for (property, value) in &raw.values {
            let keyframe = Keyframe {
                offset,
                easing: raw.easing,
                value: value.clone(),
            };
            match groups.iter_mut().find(|g| g.property == *property) {
                Some(group) => group.keyframes.push(keyframe),
                None => groups.push(PropertyKeyframes {
                    property: *property,
                    keyframes: vec![keyframe],
                }),
            }
        }
    }

    for group in &groups {
        let spans_iteration = group.keyframes.first().map(|k| k.offset) == Some(0.0)
            && group.keyframes.last().map(|k| k.offset) == Some(1.0);
        if !spans_iteration {
            return Err(AnimationError::PartialKeyframes {
                property: group.property,
            });
        }
    }

    Ok(groups)
}

// ============================================================================
// Compiled sampler
// ============================================================================

/// Fraction range over which one two-keyframe interpolation is authoritative
#[derive(Debug)]
pub struct InterpolationSegment {
    /// Inclusive lower bound (`-inf` for a property's first segment)
    pub apply_from: f64,
    /// Exclusive upper bound (`+inf` for a property's last segment)
    pub apply_to: f64,
    pub start_offset: f64,
    pub end_offset: f64,
    pub easing: Easing,
    pub property: PropertyId,
    pub interpolation: Interpolation,
}

impl InterpolationSegment {
    /// Whether the segment is authoritative at `fraction`
    pub fn contains(&self, fraction: f64) -> bool {
        fraction >= self.apply_from && fraction < self.apply_to
    }

    /// Eased position within the segment
    ///
    /// Zero-length segments report 0. With `clamp`, positions outside the
    /// segment are pinned to its ends so the boundary keyframes hold.
    pub fn position(&self, fraction: f64, clamp: bool) -> f64 {
        let local_duration = self.end_offset - self.start_offset;
        if local_duration == 0.0 {
            return 0.0;
        }
        let mut local = (fraction - self.start_offset) / local_duration;
        if clamp {
            local = local.clamp(0.0, 1.0);
        }
        self.easing.apply(local)
    }

    /// Interpolated value at `fraction`
    pub fn value_at(&self, fraction: f64, clamp: bool) -> PropertyValue {
        self.interpolation.at(self.position(fraction, clamp))
    }
}

/// Compiled keyframe effect
///
/// Built once from an [`EffectInput`] and immutable afterwards.
#[derive(Debug)]
pub struct KeyframeSampler {
    segments: Vec<InterpolationSegment>,
    properties: SmallVec<[PropertyId; 4]>,
    clamp_progress: bool,
}

impl KeyframeSampler {
    /// Compile an effect with the given value interpolators
    pub fn compile(input: &EffectInput, registry: &InterpolationRegistry) -> Result<Self> {
        let groups = group_keyframes(input)?;
        let properties = groups.iter().map(|g| g.property).collect();

        let mut segments = Vec::new();
        for group in &groups {
            build_segments(group, registry, &mut segments);
        }
        // Stable: ties keep property declaration order
        segments.sort_by(|a, b| a.start_offset.total_cmp(&b.start_offset));

        tracing::trace!(
            properties = groups.len(),
            segments = segments.len(),
            "compiled keyframe effect"
        );

        Ok(Self {
            segments,
            properties,
            clamp_progress: true,
        })
    }

    /// Let fractions outside `[0, 1]` extrapolate the boundary segments
    /// instead of holding the first/last keyframe value
    pub fn extrapolating(mut self) -> Self {
        self.clamp_progress = false;
        self
    }

    /// Holding (default) or extrapolating outside `[0, 1]`
    pub fn set_clamp_progress(&mut self, clamp: bool) {
        self.clamp_progress = clamp;
    }

    /// Merged segments of every property, sorted by start offset
    pub fn segments(&self) -> &[InterpolationSegment] {
        &self.segments
    }

    /// Properties animated by this effect
    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    /// Values the effect produces at `fraction`, in segment order
    pub fn values_at(&self, fraction: f64) -> Vec<(PropertyId, PropertyValue)> {
        self.segments
            .iter()
            .filter(|segment| segment.contains(fraction))
            .map(|segment| {
                (
                    segment.property,
                    segment.value_at(fraction, self.clamp_progress),
                )
            })
            .collect()
    }

    /// Apply the effect at `fraction` to a target
    ///
    /// `None` means the effect is no longer in effect: every animated
    /// property is cleared instead.
    pub fn sample<S: PropertySink + ?Sized>(&self, sink: &mut S, fraction: Option<f64>) {
        match fraction {
            Some(fraction) => {
                for segment in self.segments.iter().filter(|s| s.contains(fraction)) {
                    let value = segment.value_at(fraction, self.clamp_progress);
                    sink.apply(segment.property, &value);
                }
            }
            None => {
                for property in &self.properties {
                    sink.clear(*property);
                }
            }
        }
    }
}

/// Compile an effect with the default value interpolators
pub fn compile(input: &EffectInput) -> Result<KeyframeSampler> {
    KeyframeSampler::compile(input, &InterpolationRegistry::new())
}

fn build_segments(
    group: &PropertyKeyframes,
    registry: &InterpolationRegistry,
    out: &mut Vec<InterpolationSegment>,
) {
    let keyframes = &group.keyframes;
    let last_pair = keyframes.len().saturating_sub(2);

    for i in 0..keyframes.len().saturating_sub(1) {
        let mut start_index = i;
        let mut end_index = i + 1;
        let mut apply_from = keyframes[start_index].offset;
        let mut apply_to = keyframes[end_index].offset;

        if i == 0 {
            apply_from = f64::NEG_INFINITY;
            // Two keyframes at offset 0: a zero-length value at time zero
            if keyframes[end_index].offset == 0.0 {
                end_index = start_index;
            }
        }
        if i == last_pair {
            apply_to = f64::INFINITY;
            if keyframes[start_index].offset == 1.0 {
                start_index = end_index;
            }
        }

        let start = &keyframes[start_index];
        let end = &keyframes[end_index];
        out.push(InterpolationSegment {
            apply_from,
            apply_to,
            start_offset: start.offset,
            end_offset: end.offset,
            easing: start.easing,
            property: group.property,
            interpolation: registry.interpolation(group.property, &start.value, &end.value),
        });
    }
}
