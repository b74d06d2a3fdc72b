//! Scheduler configuration

use serde::{Deserialize, Serialize};

/// Scheduler knobs, usually read from the `[scheduler]` table of a scene
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Hold the first/last keyframe value outside `[0, 1]` instead of
    /// extrapolating the boundary segments
    pub clamp_segment_progress: bool,
    /// Run an out-of-band tick on `play` so the initial values are applied
    /// before the next frame
    pub sync_play: bool,
    /// Timeline time at construction; `None` reads the clock
    pub initial_time: Option<f64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            clamp_segment_progress: true,
            sync_play: true,
            initial_time: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"clamp_segment_progress": false}"#).unwrap();
        assert!(!config.clamp_segment_progress);
        assert!(config.sync_play);
        assert_eq!(config.initial_time, None);
    }
}
