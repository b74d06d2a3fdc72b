//! Animation error types

use cadenza_core::{PropertyError, PropertyId};
use thiserror::Error;

/// Errors raised while building effects
///
/// Everything here is reported synchronously, before an animation is
/// created. Once an effect compiles, scheduling it cannot fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// A property's keyframes do not cover both offset 0 and offset 1
    #[error("partial keyframes are not supported (property `{property}`)")]
    PartialKeyframes { property: PropertyId },

    /// Explicit keyframe offset outside `[0, 1]`
    #[error("keyframe {index} has offset {offset}, expected a value in [0, 1]")]
    OffsetOutOfRange { index: usize, offset: f64 },

    /// Explicit keyframe offsets decrease
    #[error("keyframe {index} has an offset smaller than a preceding keyframe")]
    OffsetsNotSorted { index: usize },

    /// Only `replace` composition is implemented
    #[error("unsupported composite operation `{0}`")]
    UnsupportedComposite(String),

    /// Easing string could not be parsed
    #[error("invalid easing function `{0}`")]
    InvalidEasing(String),

    /// Timing parameters out of range
    #[error("invalid timing: {0}")]
    InvalidTiming(String),

    /// Property name could not be resolved
    #[error(transparent)]
    Property(#[from] PropertyError),

    /// Raw value could not be parsed for its property
    #[error("cannot parse `{raw}` as a value for `{property}`")]
    InvalidValue { property: PropertyId, raw: String },
}

impl AnimationError {
    /// Whether this is the "not supported" compile failure
    pub fn is_not_supported(&self) -> bool {
        matches!(
            self,
            AnimationError::PartialKeyframes { .. } | AnimationError::UnsupportedComposite(_)
        )
    }
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;
