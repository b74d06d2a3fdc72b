//! Animation lifecycle state machine
//!
//! Tracks where an animation sits between being played and being pruned
//! from its timeline:
//!
//! ```text
//! Idle ──play──▶ Scheduled ──tick──▶ InEffect
//!   ▲                │                  │
//!   └──────tick──────┴──────tick────────┤
//!                                       ▼
//!                                   Finished (terminal)
//! ```
//!
//! `Finished` means finished-and-pruned. A finished animation is never
//! revived; callers play a new one instead.

use smallvec::SmallVec;

/// Number of transitions kept in [`Lifecycle::history`]
const HISTORY_LIMIT: usize = 8;

/// Lifecycle state of an animation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Not yet registered, or registered but outside its effect range
    #[default]
    Idle,
    /// Registered on a timeline, waiting for its first evaluation
    Scheduled,
    /// Sampled values are currently applied to the target
    InEffect,
    /// Removed from the timeline
    Finished,
}

impl LifecycleState {
    /// Whether `self -> to` is a legal transition
    pub fn can_transition(self, to: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, to) {
            (Finished, _) => false,
            (Idle, Scheduled) => true,
            (Scheduled, InEffect) | (Scheduled, Idle) => true,
            (InEffect, Idle) | (Idle, InEffect) => true,
            // Re-playing an already registered animation
            (InEffect, Scheduled) => true,
            (_, Finished) => true,
            _ => false,
        }
    }
}

/// Lifecycle of one animation with a short transition history
#[derive(Clone, Debug, Default)]
pub struct Lifecycle {
    state: LifecycleState,
    /// Most recent state transitions (for debugging)
    history: SmallVec<[(LifecycleState, LifecycleState); 4]>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Check if we're in a specific state
    pub fn is_in(&self, state: LifecycleState) -> bool {
        self.state == state
    }

    /// Whether the animation has been pruned
    pub fn is_finished(&self) -> bool {
        self.state == LifecycleState::Finished
    }

    /// Get transition history
    pub fn history(&self) -> &[(LifecycleState, LifecycleState)] {
        &self.history
    }

    /// Move to `to`, returning whether the state changed
    ///
    /// Staying in the current state is accepted and not recorded. Illegal
    /// transitions leave the state untouched.
    pub fn advance(&mut self, to: LifecycleState) -> bool {
        let from = self.state;
        if from == to {
            return false;
        }
        if !from.can_transition(to) {
            tracing::trace!(?from, ?to, "rejected lifecycle transition");
            return false;
        }
        self.state = to;
        if self.history.len() == HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.history.push((from, to));
        true
    }
}
