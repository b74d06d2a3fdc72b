//! Target mutation capability
//!
//! The animation engine never writes to a rendered object directly. Every
//! sampled value goes through a [`PropertySink`], which the rendering layer
//! implements for whatever it considers "the animated thing".

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::property::{PropertyId, PropertyValue};

/// Receives sampled property values for one animation target
pub trait PropertySink {
    /// Write an animated value
    fn apply(&mut self, property: PropertyId, value: &PropertyValue);

    /// Return a property to its un-animated state
    fn clear(&mut self, property: PropertyId);
}

impl<S: PropertySink + ?Sized> PropertySink for Box<S> {
    fn apply(&mut self, property: PropertyId, value: &PropertyValue) {
        (**self).apply(property, value);
    }

    fn clear(&mut self, property: PropertyId) {
        (**self).clear(property);
    }
}

/// Shared handle, so the owner can inspect a sink after handing it to a scheduler
impl<S: PropertySink + ?Sized> PropertySink for Rc<RefCell<S>> {
    fn apply(&mut self, property: PropertyId, value: &PropertyValue) {
        self.borrow_mut().apply(property, value);
    }

    fn clear(&mut self, property: PropertyId) {
        self.borrow_mut().clear(property);
    }
}

/// A single call observed by a recording [`StyleMap`]
#[derive(Clone, Debug, PartialEq)]
pub enum SinkEvent {
    Apply(PropertyId, PropertyValue),
    Clear(PropertyId),
}

/// Property storage that mirrors an inline style block
///
/// Applied values override the base value; clearing drops the override.
#[derive(Clone, Debug, Default)]
pub struct StyleMap {
    base: FxHashMap<PropertyId, PropertyValue>,
    animated: FxHashMap<PropertyId, PropertyValue>,
    /// Call log, only populated when created with [`StyleMap::recording`]
    events: Option<Vec<SinkEvent>>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a map that also logs every apply/clear call
    pub fn recording() -> Self {
        Self {
            events: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Builder: set the un-animated value of a property
    pub fn with_base(mut self, property: PropertyId, value: PropertyValue) -> Self {
        self.base.insert(property, value);
        self
    }

    /// Effective value: the animated override if present, else the base value
    pub fn get(&self, property: PropertyId) -> Option<&PropertyValue> {
        self.animated
            .get(&property)
            .or_else(|| self.base.get(&property))
    }

    /// Whether an animation currently overrides the property
    pub fn is_animated(&self, property: PropertyId) -> bool {
        self.animated.contains_key(&property)
    }

    /// Animated overrides sorted by property id
    pub fn animated(&self) -> Vec<(PropertyId, &PropertyValue)> {
        let mut entries: Vec<_> = self.animated.iter().map(|(k, v)| (*k, v)).collect();
        entries.sort_by_key(|(k, _)| *k);
        entries
    }

    /// Recorded calls (empty unless recording)
    pub fn events(&self) -> &[SinkEvent] {
        self.events.as_deref().unwrap_or(&[])
    }

    /// Drop the recorded calls, keeping recording enabled
    pub fn clear_events(&mut self) {
        if let Some(events) = self.events.as_mut() {
            events.clear();
        }
    }

    /// Number of recorded clears for a property
    pub fn clear_count(&self, property: PropertyId) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SinkEvent::Clear(p) if *p == property))
            .count()
    }
}

impl PropertySink for StyleMap {
    fn apply(&mut self, property: PropertyId, value: &PropertyValue) {
        self.animated.insert(property, value.clone());
        if let Some(events) = self.events.as_mut() {
            events.push(SinkEvent::Apply(property, value.clone()));
        }
    }

    fn clear(&mut self, property: PropertyId) {
        self.animated.remove(&property);
        if let Some(events) = self.events.as_mut() {
            events.push(SinkEvent::Clear(property));
        }
    }
}
