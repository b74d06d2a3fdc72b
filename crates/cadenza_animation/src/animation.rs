//! Animation playback state
//!
//! An [`Animation`] binds a compiled effect to a target and tracks its
//! local time. It never touches the target itself: each tick records the
//! iteration fraction, and the scheduler queues and flushes the effect.

use std::fmt;
use std::sync::Arc;

use cadenza_core::{Lifecycle, LifecycleState};
use serde::Serialize;

use crate::keyframe::KeyframeSampler;
use crate::scheduler::TargetId;
use crate::timing::Timing;

/// Externally visible playback state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    Idle,
    /// Waiting for the next frame to resolve its start time
    Pending,
    Running,
    Paused,
    Finished,
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayState::Idle => "idle",
            PlayState::Pending => "pending",
            PlayState::Running => "running",
            PlayState::Paused => "paused",
            PlayState::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// One played effect
pub struct Animation {
    sampler: Arc<KeyframeSampler>,
    target: TargetId,
    timing: Timing,
    sequence_number: u64,
    start_time: Option<f64>,
    current_time: f64,
    playback_rate: f64,
    paused: bool,
    idle: bool,
    /// A pause is waiting for the next frame
    current_time_pending: bool,
    in_effect: bool,
    fraction: Option<f64>,
    lifecycle: Lifecycle,
}

impl Animation {
    pub(crate) fn new(
        sampler: Arc<KeyframeSampler>,
        target: TargetId,
        timing: Timing,
        sequence_number: u64,
    ) -> Self {
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(LifecycleState::Scheduled);

        let mut animation = Self {
            sampler,
            target,
            timing,
            sequence_number,
            start_time: None,
            current_time: 0.0,
            playback_rate: 1.0,
            paused: false,
            idle: false,
            current_time_pending: false,
            in_effect: false,
            fraction: None,
            lifecycle,
        };
        animation.update_effect();
        animation
    }

    pub fn sampler(&self) -> &Arc<KeyframeSampler> {
        &self.sampler
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Creation order on its scheduler
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    /// Local time, `None` while idle
    pub fn current_time(&self) -> Option<f64> {
        (!self.idle).then_some(self.current_time)
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    /// Whether the last tick found the effect in effect
    pub fn in_effect(&self) -> bool {
        self.in_effect
    }

    /// Iteration fraction computed by the last tick
    pub fn fraction(&self) -> Option<f64> {
        self.fraction
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Delay, active interval and end delay together
    pub fn total_duration(&self) -> f64 {
        self.timing.end_time()
    }

    pub fn is_finished(&self) -> bool {
        !self.idle
            && ((self.playback_rate > 0.0 && self.current_time >= self.total_duration())
                || (self.playback_rate < 0.0 && self.current_time <= 0.0))
    }

    pub fn play_state(&self) -> PlayState {
        if self.idle {
            PlayState::Idle
        } else if (self.start_time.is_none() && !self.paused && self.playback_rate != 0.0)
            || self.current_time_pending
        {
            PlayState::Pending
        } else if self.paused {
            PlayState::Paused
        } else if self.is_finished() {
            PlayState::Finished
        } else {
            PlayState::Running
        }
    }

    /// Whether more frames are needed to make progress
    pub fn needs_tick(&self) -> bool {
        matches!(self.play_state(), PlayState::Pending | PlayState::Running)
    }

    /// Whether the timeline should keep this animation
    pub(crate) fn is_alive(&self) -> bool {
        self.in_effect || self.needs_tick() || self.paused
    }

    /// Advance local time to timeline time `t`
    ///
    /// Only an animation frame resolves a pending start time, so that
    /// every animation started in the same turn shares one start time.
    pub(crate) fn tick(&mut self, t: f64, is_animation_frame: bool) {
        if !self.idle && !self.paused {
            match self.start_time {
                None => {
                    if is_animation_frame && self.playback_rate != 0.0 {
                        self.start_time = Some(t - self.current_time / self.playback_rate);
                    }
                }
                Some(start) if !self.is_finished() => {
                    self.tick_current_time((t - start) * self.playback_rate, false);
                }
                Some(_) => {}
            }
        }
        if is_animation_frame {
            self.current_time_pending = false;
        }
        self.update_effect();
    }

    pub(crate) fn mark(&mut self, state: LifecycleState) {
        self.lifecycle.advance(state);
    }

    pub(crate) fn play(&mut self) {
        self.paused = false;
        if self.is_finished() || self.idle {
            self.rewind();
            self.start_time = None;
        }
        self.idle = false;
        self.update_effect();
    }

    pub(crate) fn pause(&mut self) {
        if !self.is_finished() && !self.paused && !self.idle {
            self.current_time_pending = true;
        } else if self.idle {
            self.rewind();
            self.idle = false;
        }
        self.start_time = None;
        self.paused = true;
    }

    /// Jump to the end (or the start when playing backwards)
    ///
    /// Returns false when there is no end to jump to.
    pub(crate) fn finish(&mut self, timeline_time: f64) -> bool {
        if self.idle {
            return false;
        }
        let total = self.total_duration();
        if self.playback_rate > 0.0 && total.is_infinite() {
            return false;
        }
        let end = if self.playback_rate > 0.0 { total } else { 0.0 };
        self.set_current_time(end, timeline_time);
        if !self.paused && self.playback_rate != 0.0 {
            self.start_time = Some(timeline_time - end / self.playback_rate);
        }
        self.current_time_pending = false;
        true
    }

    pub(crate) fn cancel(&mut self) -> bool {
        if self.idle {
            return false;
        }
        self.idle = true;
        self.paused = false;
        self.current_time = 0.0;
        self.start_time = None;
        self.current_time_pending = false;
        self.update_effect();
        true
    }

    pub(crate) fn set_current_time(&mut self, time: f64, timeline_time: f64) {
        if !self.paused && self.start_time.is_some() && self.playback_rate != 0.0 {
            self.start_time = Some(timeline_time - time / self.playback_rate);
        }
        self.current_time_pending = false;
        if self.current_time == time {
            return;
        }
        if self.idle {
            self.idle = false;
            self.paused = true;
        }
        self.tick_current_time(time, true);
    }

    pub(crate) fn set_playback_rate(&mut self, rate: f64, timeline_time: f64) {
        if rate == self.playback_rate {
            return;
        }
        let old_time = self.current_time;
        self.playback_rate = rate;
        self.start_time = None;
        if !matches!(self.play_state(), PlayState::Paused | PlayState::Idle) {
            self.idle = false;
            self.update_effect();
        }
        self.set_current_time(old_time, timeline_time);
    }

    pub(crate) fn reverse(&mut self, timeline_time: f64) {
        self.set_playback_rate(-self.playback_rate, timeline_time);
        self.play();
    }

    fn tick_current_time(&mut self, time: f64, ignore_limit: bool) {
        if time == self.current_time {
            return;
        }
        self.current_time = time;
        if self.is_finished() && !ignore_limit {
            self.current_time = if self.playback_rate > 0.0 {
                self.total_duration()
            } else {
                0.0
            };
        }
        self.update_effect();
    }

    fn rewind(&mut self) {
        if self.playback_rate >= 0.0 {
            self.current_time = 0.0;
        } else if self.total_duration().is_finite() {
            self.current_time = self.total_duration();
        } else {
            tracing::warn!("cannot rewind an infinite animation playing backwards");
        }
    }

    fn update_effect(&mut self) {
        self.fraction = if self.idle {
            None
        } else if self.playback_rate < 0.0 && self.current_time == 0.0 {
            // Reaching the start backwards leaves the active interval
            self.timing.iteration_progress(-1.0)
        } else {
            self.timing.iteration_progress(self.current_time)
        };
        self.in_effect = self.fraction.is_some();
    }
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("target", &self.target)
            .field("sequence_number", &self.sequence_number)
            .field("play_state", &self.play_state())
            .field("current_time", &self.current_time)
            .field("start_time", &self.start_time)
            .field("playback_rate", &self.playback_rate)
            .field("fraction", &self.fraction)
            .field("lifecycle", &self.lifecycle.state())
            .finish()
    }
}
