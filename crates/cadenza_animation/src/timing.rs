//! Effect timing model
//!
//! Maps an animation's local time onto an iteration fraction. The fraction
//! is what the keyframe sampler consumes; `None` means the effect is not in
//! effect at that time.

use serde::{Deserialize, Serialize};

use crate::easing::Easing;
use crate::error::{AnimationError, Result};

/// What happens before the active interval starts and after it ends
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillMode {
    /// Same as `None` for keyframe effects
    #[default]
    Auto,
    None,
    /// Hold the final value after the end
    Forwards,
    /// Apply the initial value during the start delay
    Backwards,
    Both,
}

impl FillMode {
    fn fills_backwards(self) -> bool {
        matches!(self, FillMode::Backwards | FillMode::Both)
    }

    fn fills_forwards(self) -> bool {
        matches!(self, FillMode::Forwards | FillMode::Both)
    }
}

/// Direction of successive iterations
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackDirection {
    #[default]
    Normal,
    Reverse,
    /// Odd iterations play backwards
    Alternate,
    /// Even iterations play backwards
    AlternateReverse,
}

/// Where a local time falls relative to the active interval
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Before,
    Active,
    After,
}

/// Timing parameters of one effect (times in milliseconds)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub delay: f64,
    pub end_delay: f64,
    pub fill: FillMode,
    pub iteration_start: f64,
    /// Number of iterations, may be `f64::INFINITY`
    pub iterations: f64,
    /// Duration of one iteration
    pub duration: f64,
    pub direction: PlaybackDirection,
    /// Easing applied to the whole iteration
    pub easing: Easing,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            delay: 0.0,
            end_delay: 0.0,
            fill: FillMode::Auto,
            iteration_start: 0.0,
            iterations: 1.0,
            duration: 0.0,
            direction: PlaybackDirection::Normal,
            easing: Easing::Linear,
        }
    }
}

impl Timing {
    /// Single iteration of `duration` milliseconds
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    pub fn delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    pub fn end_delay(mut self, end_delay: f64) -> Self {
        self.end_delay = end_delay;
        self
    }

    pub fn fill(mut self, fill: FillMode) -> Self {
        self.fill = fill;
        self
    }

    pub fn iterations(mut self, iterations: f64) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn iteration_start(mut self, iteration_start: f64) -> Self {
        self.iteration_start = iteration_start;
        self
    }

    pub fn direction(mut self, direction: PlaybackDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Loop forever
    pub fn infinite(self) -> Self {
        self.iterations(f64::INFINITY)
    }

    /// Reject values the timing model has no meaning for
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("delay", self.delay),
            ("end_delay", self.end_delay),
            ("iteration_start", self.iteration_start),
            ("iterations", self.iterations),
            ("duration", self.duration),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| v.is_nan()) {
            return Err(AnimationError::InvalidTiming(format!("{name} is NaN")));
        }
        if !self.delay.is_finite() || !self.end_delay.is_finite() {
            return Err(AnimationError::InvalidTiming(
                "delays must be finite".to_string(),
            ));
        }
        if self.duration < 0.0 || !self.duration.is_finite() {
            return Err(AnimationError::InvalidTiming(format!(
                "duration must be a finite non-negative number, got {}",
                self.duration
            )));
        }
        if self.iterations < 0.0 {
            return Err(AnimationError::InvalidTiming(format!(
                "iterations must be non-negative, got {}",
                self.iterations
            )));
        }
        if self.iteration_start < 0.0 || !self.iteration_start.is_finite() {
            return Err(AnimationError::InvalidTiming(format!(
                "iteration_start must be a finite non-negative number, got {}",
                self.iteration_start
            )));
        }
        Ok(())
    }

    /// Duration of all iterations together
    pub fn active_duration(&self) -> f64 {
        if self.duration == 0.0 || self.iterations == 0.0 {
            0.0
        } else {
            self.duration * self.iterations
        }
    }

    /// Time at which the effect ends, never negative
    pub fn end_time(&self) -> f64 {
        (self.delay + self.active_duration() + self.end_delay).max(0.0)
    }

    /// Phase of `local_time`
    pub fn phase(&self, local_time: f64) -> Phase {
        let active = self.active_duration();
        let end_time = self.delay + active + self.end_delay;
        if local_time < self.delay.min(end_time) {
            Phase::Before
        } else if local_time >= (self.delay + active).min(end_time) {
            Phase::After
        } else {
            Phase::Active
        }
    }

    /// Time since the active interval started, after fill is applied
    pub fn active_time(&self, local_time: f64) -> Option<f64> {
        match self.phase(local_time) {
            Phase::Before => self.fill.fills_backwards().then_some(0.0),
            Phase::Active => Some(local_time - self.delay),
            Phase::After => self
                .fill
                .fills_forwards()
                .then(|| self.active_duration()),
        }
    }

    /// Zero-based index of the iteration `local_time` falls in
    pub fn current_iteration(&self, local_time: f64) -> Option<f64> {
        let phase = self.phase(local_time);
        let active_time = self.active_time(local_time)?;
        let overall = self.overall_progress(phase, active_time);
        let simple = self.simple_progress(phase, overall, active_time);
        Some(self.iteration_index(phase, overall, simple))
    }

    /// Eased, directed progress within the current iteration
    ///
    /// Returns `None` when the effect is not in effect at `local_time`.
    pub fn iteration_progress(&self, local_time: f64) -> Option<f64> {
        let phase = self.phase(local_time);
        let active_time = self.active_time(local_time)?;
        let overall = self.overall_progress(phase, active_time);
        let simple = self.simple_progress(phase, overall, active_time);
        let iteration = self.iteration_index(phase, overall, simple);

        let reversed = match self.direction {
            PlaybackDirection::Normal => false,
            PlaybackDirection::Reverse => true,
            PlaybackDirection::Alternate | PlaybackDirection::AlternateReverse => {
                let mut d = iteration;
                if self.direction == PlaybackDirection::AlternateReverse {
                    d += 1.0;
                }
                d.is_finite() && d % 2.0 != 0.0
            }
        };
        let directed = if reversed { 1.0 - simple } else { simple };
        Some(self.easing.apply(directed))
    }

    fn overall_progress(&self, phase: Phase, active_time: f64) -> f64 {
        let mut overall = self.iteration_start;
        if self.duration != 0.0 {
            if phase != Phase::Before {
                overall += active_time / self.duration;
            }
        } else if phase == Phase::After {
            overall += self.iterations;
        }
        overall
    }

    fn simple_progress(&self, phase: Phase, overall: f64, active_time: f64) -> f64 {
        let simple = if overall.is_infinite() {
            self.iteration_start % 1.0
        } else {
            overall % 1.0
        };
        // The last iteration ends on 1, not on the start of the next one
        if simple == 0.0
            && phase == Phase::After
            && self.iterations != 0.0
            && (active_time != 0.0 || self.duration == 0.0)
        {
            1.0
        } else {
            simple
        }
    }

    fn iteration_index(&self, phase: Phase, overall: f64, simple: f64) -> f64 {
        if phase == Phase::After && self.iterations.is_infinite() {
            f64::INFINITY
        } else if simple == 1.0 {
            overall.floor() - 1.0
        } else {
            overall.floor()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_defaults() {
        let timing = Timing::default();
        assert_eq!(timing.iterations, 1.0);
        assert_eq!(timing.fill, FillMode::Auto);
        assert_eq!(timing.active_duration(), 0.0);
        assert!(timing.validate().is_ok());
    }

    #[test]
    fn test_phases_and_fill() {
        let timing = Timing::new(1000.0).delay(500.0);
        assert_eq!(timing.phase(0.0), Phase::Before);
        assert_eq!(timing.phase(500.0), Phase::Active);
        assert_eq!(timing.phase(1500.0), Phase::After);

        assert_eq!(timing.iteration_progress(100.0), None);
        assert!(close(timing.iteration_progress(1000.0), 0.5));
        assert_eq!(timing.iteration_progress(1500.0), None);

        let both = timing.clone().fill(FillMode::Both);
        assert!(close(both.iteration_progress(100.0), 0.0));
        assert!(close(both.iteration_progress(9000.0), 1.0));

        let forwards = timing.fill(FillMode::Forwards);
        assert_eq!(forwards.iteration_progress(100.0), None);
        assert!(close(forwards.iteration_progress(9000.0), 1.0));
    }

    #[test]
    fn test_iterations_and_directions() {
        let timing = Timing::new(100.0).iterations(3.0);
        assert!(close(timing.iteration_progress(150.0), 0.5));
        assert_eq!(timing.current_iteration(150.0), Some(1.0));
        assert!(close(timing.iteration_progress(225.0), 0.25));

        let alternate = timing.clone().direction(PlaybackDirection::Alternate);
        assert!(close(alternate.iteration_progress(25.0), 0.25));
        assert!(close(alternate.iteration_progress(125.0), 0.75));

        let alt_rev = timing.clone().direction(PlaybackDirection::AlternateReverse);
        assert!(close(alt_rev.iteration_progress(25.0), 0.75));
        assert!(close(alt_rev.iteration_progress(125.0), 0.25));

        let reverse = timing.direction(PlaybackDirection::Reverse);
        assert!(close(reverse.iteration_progress(10.0), 0.9));
    }

    #[test]
    fn test_end_of_last_iteration_is_one() {
        let timing = Timing::new(100.0).iterations(2.0).fill(FillMode::Forwards);
        assert!(close(timing.iteration_progress(200.0), 1.0));
        assert_eq!(timing.current_iteration(200.0), Some(1.0));
    }

    #[test]
    fn test_iteration_start_offsets_progress() {
        let timing = Timing::new(100.0).iteration_start(0.5);
        assert!(close(timing.iteration_progress(0.0), 0.5));
        assert!(close(timing.iteration_progress(60.0), 0.1));
    }

    #[test]
    fn test_zero_duration_fills_to_end() {
        let timing = Timing::new(0.0).fill(FillMode::Both);
        assert_eq!(timing.phase(0.0), Phase::After);
        assert!(close(timing.iteration_progress(0.0), 1.0));
    }

    #[test]
    fn test_infinite_iterations() {
        let timing = Timing::new(100.0).infinite();
        assert_eq!(timing.active_duration(), f64::INFINITY);
        assert_eq!(timing.end_time(), f64::INFINITY);
        assert!(close(timing.iteration_progress(1_000_050.0), 0.5));
    }

    #[test]
    fn test_effect_easing() {
        let timing = Timing::new(100.0).easing(Easing::EaseInQuad);
        assert!(close(timing.iteration_progress(50.0), 0.25));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(Timing::new(-1.0).validate().is_err());
        assert!(Timing::new(f64::NAN).validate().is_err());
        assert!(Timing::new(1.0).iterations(-2.0).validate().is_err());
        assert!(Timing::new(1.0).delay(f64::NAN).validate().is_err());
        assert!(Timing::new(1.0).infinite().validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let timing: Timing =
            serde_json::from_str(r#"{"duration": 250, "fill": "forwards", "easing": "ease-in"}"#)
                .unwrap();
        assert_eq!(timing.duration, 250.0);
        assert_eq!(timing.fill, FillMode::Forwards);
        assert_eq!(timing.easing, Easing::EaseIn);
        assert_eq!(timing.iterations, 1.0);

        let alt: Timing = serde_json::from_str(r#"{"direction": "alternate-reverse"}"#).unwrap();
        assert_eq!(alt.direction, PlaybackDirection::AlternateReverse);
    }
}
