//! Animation scheduler
//!
//! Owns the timeline, the animations played on it and the property sinks
//! they write to. Every tick runs in two phases: all animations are
//! evaluated first and their effects queued, then the queue is flushed
//! into the sinks. No effect ever observes a target mutated by another
//! effect of the same tick.

use std::fmt;
use std::sync::Arc;

use cadenza_core::{LifecycleState, PropertySink};
use slotmap::{new_key_type, SlotMap};

use crate::animation::{Animation, PlayState};
use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::frame::{FrameDriver, FrameHandle, FrameRequester};
use crate::interpolation::InterpolationRegistry;
use crate::keyframe::{EffectInput, KeyframeSampler};
use crate::timing::Timing;

new_key_type! {
    pub struct AnimationId;
    pub struct TargetId;
}

/// One-shot callback run during the next frame, after the timeline tick
pub type FrameCallback = Box<dyn FnOnce(&mut Scheduler, f64)>;

/// Effect evaluated during a tick, waiting to be applied
struct PendingEffect {
    sampler: Arc<KeyframeSampler>,
    target: TargetId,
    /// `None` clears the effect's properties
    fraction: Option<f64>,
}

/// Cooperative single-threaded animation scheduler
pub struct Scheduler {
    config: SchedulerConfig,
    clock: Box<dyn Clock>,
    registry: InterpolationRegistry,
    targets: SlotMap<TargetId, Box<dyn PropertySink>>,
    animations: SlotMap<AnimationId, Animation>,
    /// Live animations, in creation order after every frame
    timeline: Vec<AnimationId>,
    current_time: f64,
    next_sequence: u64,
    pending: Vec<PendingEffect>,
    frames: FrameDriver<FrameCallback>,
    in_tick: bool,
}

impl Scheduler {
    pub fn new(clock: impl Clock + 'static, requester: impl FrameRequester + 'static) -> Self {
        Self::with_config(SchedulerConfig::default(), clock, requester)
    }

    pub fn with_config(
        config: SchedulerConfig,
        clock: impl Clock + 'static,
        requester: impl FrameRequester + 'static,
    ) -> Self {
        let current_time = config.initial_time.unwrap_or_else(|| clock.now_ms());
        tracing::debug!(current_time, "created scheduler");
        Self {
            config,
            clock: Box::new(clock),
            registry: InterpolationRegistry::new(),
            targets: SlotMap::with_key(),
            animations: SlotMap::with_key(),
            timeline: Vec::new(),
            current_time,
            next_sequence: 0,
            pending: Vec::new(),
            frames: FrameDriver::new(Box::new(requester)),
            in_tick: false,
        }
    }

    /// Replace the value interpolators used by [`Scheduler::compile`]
    pub fn with_registry(mut self, registry: InterpolationRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn registry(&self) -> &InterpolationRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut InterpolationRegistry {
        &mut self.registry
    }

    // ========================================================================
    // Targets
    // ========================================================================

    pub fn add_target(&mut self, sink: Box<dyn PropertySink>) -> TargetId {
        self.targets.insert(sink)
    }

    /// Convenience for [`Scheduler::add_target`] with an unboxed sink
    pub fn add_sink(&mut self, sink: impl PropertySink + 'static) -> TargetId {
        self.add_target(Box::new(sink))
    }

    /// Detach a sink
    ///
    /// Animations bound to it are pruned and effects still queued for it
    /// are dropped.
    pub fn remove_target(&mut self, id: TargetId) -> Option<Box<dyn PropertySink>> {
        let sink = self.targets.remove(id)?;
        let bound: Vec<AnimationId> = self
            .timeline
            .iter()
            .copied()
            .filter(|a| self.animations.get(*a).is_some_and(|a| a.target() == id))
            .collect();
        self.prune(&bound);
        self.pending.retain(|effect| effect.target != id);
        tracing::debug!(target_id = ?id, animations = bound.len(), "removed target");
        Some(sink)
    }

    pub fn has_target(&self, id: TargetId) -> bool {
        self.targets.contains_key(id)
    }

    // ========================================================================
    // Playing effects
    // ========================================================================

    /// Compile an effect with this scheduler's interpolators and settings
    pub fn compile(&self, input: &EffectInput) -> Result<KeyframeSampler> {
        let mut sampler = KeyframeSampler::compile(input, &self.registry)?;
        sampler.set_clamp_progress(self.config.clamp_segment_progress);
        Ok(sampler)
    }

    /// Compile and play an effect on `target`
    ///
    /// Compile failures are returned before anything is registered.
    pub fn play(
        &mut self,
        target: TargetId,
        input: &EffectInput,
        timing: Timing,
    ) -> Result<AnimationId> {
        let sampler = self.compile(input)?;
        self.play_sampler(target, Arc::new(sampler), timing)
    }

    /// Play an already compiled effect
    pub fn play_sampler(
        &mut self,
        target: TargetId,
        sampler: Arc<KeyframeSampler>,
        timing: Timing,
    ) -> Result<AnimationId> {
        timing.validate()?;
        let sequence_number = self.next_sequence;
        self.next_sequence += 1;

        let id = self
            .animations
            .insert(Animation::new(sampler, target, timing, sequence_number));
        self.timeline.push(id);
        tracing::debug!(?id, sequence_number, "playing animation");

        self.restart();
        if self.config.sync_play {
            self.apply_dirtied_animation(id);
        }
        Ok(id)
    }

    /// Ensure a frame is scheduled
    ///
    /// Returns whether a frame has been newly scheduled since the last one
    /// ran, by this call or an earlier one.
    pub fn restart(&mut self) -> bool {
        self.frames.restart()
    }

    /// Re-evaluate the animations sharing `id`'s target right away
    ///
    /// Brings the target up to date after a playback change made outside
    /// the frame loop. During a tick only a frame is ensured; the change is
    /// picked up by that frame.
    pub fn apply_dirtied_animation(&mut self, id: AnimationId) {
        if self.in_tick {
            self.frames.ensure_frame();
            return;
        }
        let Some(target) = self.animations.get(id).map(Animation::target) else {
            tracing::warn!(?id, "ignoring stale animation");
            return;
        };

        self.in_tick = true;
        let t = self.now();
        let affected: Vec<AnimationId> = self
            .timeline
            .iter()
            .copied()
            .filter(|a| self.animations.get(*a).is_some_and(|a| a.target() == target))
            .collect();
        let inactive = self.tick(t, false, affected);
        self.prune(&inactive);
        self.flush();
        self.in_tick = false;
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// Host entry point, called once per delivered frame
    ///
    /// Ticks every live animation at `now` (never earlier than the current
    /// timeline time), runs the frame callbacks, then applies the queued
    /// effects.
    ///
    /// Called during a tick (from a frame callback), it only ensures
    /// another frame.
    pub fn frame(&mut self, now: f64) {
        if self.in_tick {
            tracing::warn!(now, "frame requested during a tick, deferring");
            self.frames.ensure_frame();
            return;
        }
        self.frames.begin_frame();
        self.in_tick = true;

        let t = now.max(self.current_time);
        let ids = self.timeline.clone();
        let inactive = self.tick(t, true, ids);
        self.prune(&inactive);
        let animations = &self.animations;
        self.timeline.sort_by_key(|id| sequence_of(animations, *id));

        let callbacks = self.frames.take_callbacks();
        for callback in callbacks {
            callback(self, t);
        }

        self.flush();
        self.in_tick = false;
    }

    /// Run `callback` during the next frame
    pub fn request_frame(
        &mut self,
        callback: impl FnOnce(&mut Scheduler, f64) + 'static,
    ) -> FrameHandle {
        self.frames.request(Box::new(callback))
    }

    /// Neuter a callback scheduled with [`Scheduler::request_frame`]
    pub fn cancel_frame(&mut self, handle: FrameHandle) -> bool {
        self.frames.cancel(handle)
    }

    /// Whether a host frame is outstanding
    pub fn is_ticking(&self) -> bool {
        self.frames.is_ticking()
    }

    pub fn has_restarted_this_frame(&self) -> bool {
        self.frames.has_restarted_this_frame()
    }

    /// Whether a tick is running right now
    pub fn in_tick(&self) -> bool {
        self.in_tick
    }

    // ========================================================================
    // Playback control
    // ========================================================================

    pub fn pause(&mut self, id: AnimationId) -> bool {
        self.mutate(id, "pause", |animation, _| {
            animation.pause();
            true
        })
    }

    /// Resume a paused animation, or replay a finished one
    pub fn resume(&mut self, id: AnimationId) -> bool {
        self.mutate(id, "resume", |animation, _| {
            animation.play();
            true
        })
    }

    /// Make the animation idle; the next tick clears and prunes it
    pub fn cancel(&mut self, id: AnimationId) -> bool {
        self.mutate(id, "cancel", |animation, _| animation.cancel())
    }

    /// Seek to the end (or start, when playing backwards)
    pub fn finish(&mut self, id: AnimationId) -> bool {
        self.mutate(id, "finish", |animation, now| animation.finish(now))
    }

    pub fn reverse(&mut self, id: AnimationId) -> bool {
        self.mutate(id, "reverse", |animation, now| {
            animation.reverse(now);
            true
        })
    }

    /// Seek to local time `time` in milliseconds
    pub fn set_current_time(&mut self, id: AnimationId, time: f64) -> bool {
        self.mutate(id, "set_current_time", |animation, now| {
            animation.set_current_time(time, now);
            true
        })
    }

    pub fn set_playback_rate(&mut self, id: AnimationId, rate: f64) -> bool {
        self.mutate(id, "set_playback_rate", |animation, now| {
            animation.set_playback_rate(rate, now);
            true
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn animation(&self, id: AnimationId) -> Option<&Animation> {
        self.animations.get(id)
    }

    pub fn play_state(&self, id: AnimationId) -> Option<PlayState> {
        self.animations.get(id).map(Animation::play_state)
    }

    /// Timeline time in milliseconds
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Animations still registered on the timeline
    pub fn live_animations(&self) -> &[AnimationId] {
        &self.timeline
    }

    /// Iterate over all live animations
    pub fn animations(&self) -> impl Iterator<Item = (AnimationId, &Animation)> {
        self.timeline
            .iter()
            .filter_map(|id| self.animations.get(*id).map(|a| (*id, a)))
    }

    // ========================================================================
    // Test hooks
    // ========================================================================

    /// Force the timeline to `t` and run one frame synchronously
    #[cfg(any(test, feature = "test-hooks"))]
    pub fn tick_at(&mut self, t: f64) {
        if self.in_tick {
            self.frames.ensure_frame();
            return;
        }
        self.current_time = t;
        self.frame(t);
    }

    #[cfg(any(test, feature = "test-hooks"))]
    pub fn set_ticking(&mut self, ticking: bool) {
        self.frames.set_ticking(ticking);
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn now(&self) -> f64 {
        self.clock.now_ms().max(self.current_time)
    }

    fn mutate(
        &mut self,
        id: AnimationId,
        operation: &'static str,
        f: impl FnOnce(&mut Animation, f64) -> bool,
    ) -> bool {
        let now = self.now();
        let Some(animation) = self.animations.get_mut(id) else {
            tracing::warn!(?id, operation, "ignoring operation on stale animation");
            return false;
        };
        let changed = f(animation, now);
        if changed {
            self.apply_dirtied_animation(id);
        }
        changed
    }

    /// Evaluate `ids` at `t` and queue their effects
    ///
    /// Returns the animations that are neither in effect nor need another
    /// tick. Clears are queued ahead of applies.
    fn tick(
        &mut self,
        t: f64,
        is_animation_frame: bool,
        mut ids: Vec<AnimationId>,
    ) -> Vec<AnimationId> {
        self.current_time = self.current_time.max(t);
        let t = self.current_time;
        ids.sort_by_key(|id| sequence_of(&self.animations, *id));

        let mut clears = Vec::new();
        let mut applies = Vec::new();
        let mut inactive = Vec::new();
        let mut needs_frame = false;

        for id in ids {
            let Some(animation) = self.animations.get_mut(id) else {
                continue;
            };
            animation.tick(t, is_animation_frame);

            let effect = PendingEffect {
                sampler: Arc::clone(animation.sampler()),
                target: animation.target(),
                fraction: animation.fraction(),
            };
            if animation.in_effect() {
                animation.mark(LifecycleState::InEffect);
                applies.push(effect);
            } else {
                animation.mark(LifecycleState::Idle);
                clears.push(effect);
            }

            needs_frame |= animation.needs_tick();
            if !animation.is_alive() {
                inactive.push(id);
            }
        }

        tracing::trace!(
            t,
            is_animation_frame,
            applies = applies.len(),
            clears = clears.len(),
            "ticked animations"
        );
        self.pending.extend(clears);
        self.pending.extend(applies);

        if needs_frame {
            self.frames.ensure_frame();
        }
        inactive
    }

    fn prune(&mut self, inactive: &[AnimationId]) {
        if inactive.is_empty() {
            return;
        }
        self.timeline.retain(|id| !inactive.contains(id));
        for id in inactive {
            if let Some(mut animation) = self.animations.remove(*id) {
                animation.mark(LifecycleState::Finished);
                tracing::debug!(
                    ?id,
                    sequence_number = animation.sequence_number(),
                    "pruned animation"
                );
            }
        }
    }

    /// Apply every queued effect in order, then empty the queue
    fn flush(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        tracing::trace!(effects = pending.len(), "flushing pending effects");
        for effect in pending {
            match self.targets.get_mut(effect.target) {
                Some(sink) => effect.sampler.sample(sink.as_mut(), effect.fraction),
                None => tracing::warn!(target_id = ?effect.target, "dropping effect for removed target"),
            }
        }
    }
}

fn sequence_of(animations: &SlotMap<AnimationId, Animation>, id: AnimationId) -> u64 {
    animations
        .get(id)
        .map_or(u64::MAX, Animation::sequence_number)
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("current_time", &self.current_time)
            .field("live_animations", &self.timeline.len())
            .field("targets", &self.targets.len())
            .field("pending", &self.pending.len())
            .field("frames", &self.frames)
            .field("in_tick", &self.in_tick)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::frame::FrameCounter;
    use cadenza_core::{PropertyId, PropertyValue, SinkEvent, StyleMap};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn fade() -> EffectInput {
        EffectInput::new()
            .value_at(0.0, PropertyId::Opacity, PropertyValue::Number(0.0), Default::default())
            .value_at(1.0, PropertyId::Opacity, PropertyValue::Number(1.0), Default::default())
    }

    fn setup() -> (Scheduler, ManualClock, FrameCounter) {
        let clock = ManualClock::new(0.0);
        let counter = FrameCounter::new();
        (Scheduler::new(clock.clone(), counter.clone()), clock, counter)
    }

    #[test]
    fn test_play_applies_initial_values_synchronously() {
        let (mut scheduler, _, _) = setup();
        let style = Rc::new(RefCell::new(StyleMap::new()));
        let target = scheduler.add_sink(style.clone());

        scheduler.play(target, &fade(), Timing::new(100.0)).unwrap();
        assert_eq!(
            style.borrow().get(PropertyId::Opacity),
            Some(&PropertyValue::Number(0.0))
        );
        assert!(scheduler.is_ticking());
    }

    #[test]
    fn test_two_plays_request_one_frame() {
        let (mut scheduler, _, counter) = setup();
        let target = scheduler.add_sink(StyleMap::new());
        scheduler.play(target, &fade(), Timing::new(100.0)).unwrap();
        scheduler.play(target, &fade(), Timing::new(100.0)).unwrap();
        assert_eq!(counter.total(), 1);
        assert!(scheduler.is_ticking());
        assert!(scheduler.has_restarted_this_frame());
    }

    #[test]
    fn test_compile_error_registers_nothing() {
        let (mut scheduler, _, counter) = setup();
        let target = scheduler.add_sink(StyleMap::new());
        let partial = EffectInput::new().value_at(
            0.0,
            PropertyId::Left,
            PropertyValue::Length(0.0),
            Default::default(),
        );
        let err = scheduler.play(target, &partial, Timing::new(10.0)).unwrap_err();
        assert!(err.is_not_supported());
        assert!(scheduler.live_animations().is_empty());
        assert_eq!(counter.total(), 0);

        assert!(scheduler
            .play(target, &fade(), Timing::new(-5.0))
            .is_err());
    }

    #[test]
    fn test_timeline_never_moves_backwards() {
        let (mut scheduler, _, _) = setup();
        scheduler.frame(50.0);
        scheduler.frame(20.0);
        assert_eq!(scheduler.current_time(), 50.0);
    }

    #[test]
    fn test_stale_ids_are_ignored() {
        let (mut scheduler, _, _) = setup();
        let target = scheduler.add_sink(StyleMap::new());
        let id = scheduler.play(target, &fade(), Timing::new(10.0)).unwrap();
        scheduler.tick_at(0.0);
        scheduler.tick_at(20.0);

        assert!(scheduler.animation(id).is_none());
        assert_eq!(scheduler.play_state(id), None);
        assert!(!scheduler.pause(id));
        assert!(!scheduler.set_current_time(id, 5.0));
        scheduler.apply_dirtied_animation(id);
    }

    #[test]
    fn test_frame_callbacks_run_once_and_can_be_cancelled() {
        let (mut scheduler, _, _) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));

        let seen = log.clone();
        scheduler.request_frame(move |_, t| seen.borrow_mut().push(("a", t)));
        let seen = log.clone();
        let b = scheduler.request_frame(move |_, t| seen.borrow_mut().push(("b", t)));
        assert!(scheduler.cancel_frame(b));

        scheduler.frame(16.0);
        scheduler.frame(32.0);
        assert_eq!(*log.borrow(), vec![("a", 16.0)]);
    }

    #[test]
    fn test_play_inside_frame_callback_waits_for_next_frame() {
        let (mut scheduler, _, _) = setup();
        let style = Rc::new(RefCell::new(StyleMap::new()));
        let target = scheduler.add_sink(style.clone());

        scheduler.request_frame(move |scheduler, _| {
            scheduler.play(target, &fade(), Timing::new(100.0)).unwrap();
        });
        scheduler.frame(10.0);
        assert_eq!(scheduler.live_animations().len(), 1);
        assert!(style.borrow().animated().is_empty());
        assert!(scheduler.is_ticking());

        scheduler.frame(20.0);
        assert_eq!(
            style.borrow().get(PropertyId::Opacity),
            Some(&PropertyValue::Number(0.0))
        );
    }

    #[test]
    fn test_removing_target_prunes_its_animations() {
        let (mut scheduler, _, counter) = setup();
        let target = scheduler.add_sink(StyleMap::new());
        let other = Rc::new(RefCell::new(StyleMap::new()));
        let other_target = scheduler.add_sink(other.clone());

        let id = scheduler
            .play(target, &fade(), Timing::new(100.0).infinite())
            .unwrap();
        let kept = scheduler
            .play(other_target, &fade(), Timing::new(100.0))
            .unwrap();
        assert!(counter.take_request());

        assert!(scheduler.remove_target(target).is_some());
        assert!(!scheduler.has_target(target));
        assert!(scheduler.remove_target(target).is_none());
        assert!(scheduler.animation(id).is_none());
        assert_eq!(scheduler.live_animations(), &[kept]);

        // Only the other target's animation keeps the frame loop alive
        let mut frames = 0;
        let mut now = 0.0;
        while counter.take_request() {
            now += 50.0;
            scheduler.frame(now);
            frames += 1;
            assert!(frames < 10, "frame loop never went idle");
        }
        assert!(scheduler.live_animations().is_empty());
        assert!(other.borrow().animated().is_empty());
    }

    #[test]
    fn test_nested_frame_call_is_deferred() {
        let (mut scheduler, _, _) = setup();
        let style = Rc::new(RefCell::new(StyleMap::recording()));
        let target = scheduler.add_sink(style.clone());
        scheduler.play(target, &fade(), Timing::new(100.0)).unwrap();
        scheduler.tick_at(0.0);
        style.borrow_mut().clear_events();

        scheduler.request_frame(|scheduler, t| {
            scheduler.frame(t + 10.0);
            scheduler.tick_at(t + 20.0);
            assert!(scheduler.in_tick());
        });
        scheduler.frame(10.0);

        assert_eq!(
            style.borrow().events(),
            &[SinkEvent::Apply(PropertyId::Opacity, PropertyValue::Number(0.1))]
        );
        assert_eq!(scheduler.current_time(), 10.0);
        assert!(!scheduler.in_tick());
        assert!(scheduler.is_ticking());
    }
}
