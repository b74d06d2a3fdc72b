//! Cadenza Core
//!
//! Shared vocabulary for the Cadenza animation crates:
//!
//! - **Properties**: the closed set of animatable property identifiers and
//!   their typed values
//! - **Sinks**: the capability through which sampled values reach a target
//! - **Lifecycle**: the state machine every animation moves through between
//!   being played and being pruned
//!
//! # Example
//!
//! ```rust
//! use cadenza_core::{PropertyId, PropertySink, PropertyValue, StyleMap};
//!
//! let mut style = StyleMap::new();
//! style.apply(PropertyId::Left, &PropertyValue::Length(10.0));
//! assert_eq!(style.get(PropertyId::Left), Some(&PropertyValue::Length(10.0)));
//!
//! style.clear(PropertyId::Left);
//! assert_eq!(style.get(PropertyId::Left), None);
//! ```

pub mod lifecycle;
pub mod property;
pub mod sink;

pub use lifecycle::{Lifecycle, LifecycleState};
pub use property::{PropertyError, PropertyId, PropertyValue, RESERVED_NAMES};
pub use sink::{PropertySink, SinkEvent, StyleMap};
