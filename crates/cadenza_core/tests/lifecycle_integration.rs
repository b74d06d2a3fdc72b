//! Integration tests for the core vocabulary driven by a real scheduler
//!
//! These tests verify that:
//! - Animation lifecycles follow the documented state machine
//! - A `StyleMap` target falls back to its base values once animations end

use std::cell::RefCell;
use std::rc::Rc;

use cadenza_animation::{FrameCounter, ManualClock, Scheduler, Timing};
use cadenza_animation::{Easing, EffectInput};
use cadenza_core::{LifecycleState, PropertyId, PropertyValue, StyleMap};

fn scheduler() -> Scheduler {
    Scheduler::new(ManualClock::new(0.0), FrameCounter::new())
}

fn fade() -> EffectInput {
    EffectInput::new()
        .value_at(0.0, PropertyId::Opacity, PropertyValue::Number(0.0), Easing::Linear)
        .value_at(1.0, PropertyId::Opacity, PropertyValue::Number(1.0), Easing::Linear)
}

#[test]
fn test_delayed_animation_lifecycle() {
    use LifecycleState::*;

    let mut scheduler = scheduler();
    let target = scheduler.add_sink(StyleMap::new());
    let id = scheduler
        .play(target, &fade(), Timing::new(100.0).delay(50.0))
        .unwrap();

    // The synchronous tick on play finds it still waiting for its delay
    let lifecycle = scheduler.animation(id).unwrap().lifecycle().clone();
    assert_eq!(lifecycle.state(), Idle);
    assert_eq!(lifecycle.history(), &[(Idle, Scheduled), (Scheduled, Idle)]);

    scheduler.tick_at(0.0);
    scheduler.tick_at(60.0);
    let lifecycle = scheduler.animation(id).unwrap().lifecycle();
    assert!(lifecycle.is_in(InEffect));
    assert_eq!(lifecycle.history().last(), Some(&(Idle, InEffect)));

    scheduler.tick_at(500.0);
    assert!(scheduler.animation(id).is_none());
}

#[test]
fn test_style_map_returns_to_base_value() {
    let mut scheduler = scheduler();
    let style = Rc::new(RefCell::new(
        StyleMap::new().with_base(PropertyId::Opacity, PropertyValue::Number(0.5)),
    ));
    let target = scheduler.add_sink(style.clone());

    scheduler.play(target, &fade(), Timing::new(100.0)).unwrap();
    scheduler.tick_at(0.0);
    scheduler.tick_at(25.0);
    assert_eq!(
        style.borrow().get(PropertyId::Opacity),
        Some(&PropertyValue::Number(0.25))
    );

    scheduler.tick_at(100.0);
    assert!(!style.borrow().is_animated(PropertyId::Opacity));
    assert_eq!(
        style.borrow().get(PropertyId::Opacity),
        Some(&PropertyValue::Number(0.5))
    );
}
