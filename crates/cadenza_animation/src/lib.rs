//! Cadenza Animation System
//!
//! Keyframe effects and the cooperative scheduler that plays them.
//!
//! # Features
//!
//! - **Keyframe Effects**: sparse keyframes compiled into interpolation
//!   segments that are defined for every fraction, not only `[0, 1]`
//! - **Two-Phase Ticks**: all animations are evaluated before any effect
//!   is applied
//! - **Lazy Frame Driving**: at most one host frame request is outstanding
//! - **Timing Model**: delays, iterations, directions, fill modes and
//!   playback control
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use cadenza_animation::{AnimationPreset, FrameCounter, ManualClock, Scheduler, Timing};
//! use cadenza_core::StyleMap;
//!
//! let clock = ManualClock::new(0.0);
//! let frames = FrameCounter::new();
//! let mut scheduler = Scheduler::new(clock.clone(), frames.clone());
//!
//! let style = Rc::new(RefCell::new(StyleMap::new()));
//! let target = scheduler.add_sink(style.clone());
//! scheduler
//!     .play(target, &AnimationPreset::spin(), Timing::new(1000.0))
//!     .unwrap();
//!
//! while frames.take_request() {
//!     scheduler.frame(clock.advance(250.0));
//! }
//! assert!(style.borrow().animated().is_empty());
//! ```

pub mod animation;
pub mod clock;
pub mod config;
pub mod easing;
pub mod error;
pub mod frame;
pub mod interpolation;
pub mod keyframe;
pub mod presets;
pub mod scheduler;
pub mod timing;

pub use animation::{Animation, PlayState};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::SchedulerConfig;
pub use easing::{Easing, StepPosition};
pub use error::{AnimationError, Result};
pub use frame::{FrameCounter, FrameDriver, FrameHandle, FrameRequester};
pub use interpolation::{Interpolation, InterpolationRegistry, MergedValues, ValueInterpolator};
pub use keyframe::{
    compile, normalize_keyframes, CompositeOperation, EffectInput, InterpolationSegment,
    Keyframe, KeyframeSampler, PropertyKeyframes, RawKeyframe,
};
pub use presets::{AnimationPreset, SlideFrom};
pub use scheduler::{AnimationId, FrameCallback, Scheduler, TargetId};
pub use timing::{FillMode, Phase, PlaybackDirection, Timing};
