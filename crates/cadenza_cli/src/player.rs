//! Headless scene playback
//!
//! Drives a scheduler with a manual clock, one fixed-length frame at a
//! time, and reports the animated state of every target after each frame.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Write;
use std::rc::Rc;

use anyhow::{Context, Result};
use cadenza_animation::{FrameCounter, ManualClock, Scheduler, TargetId};
use cadenza_core::StyleMap;
use serde::Serialize;

use crate::scene::SceneConfig;

/// Playback settings from the command line
#[derive(Clone, Copy, Debug)]
pub struct PlayOptions {
    pub fps: u32,
    pub max_frames: u64,
    pub json: bool,
}

/// Target state after one frame
#[derive(Debug, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub time: f64,
    /// Target name to animated property values
    pub targets: BTreeMap<String, BTreeMap<String, String>>,
}

/// Outcome of a whole run
#[derive(Debug, PartialEq)]
pub struct PlaySummary {
    pub frames: u64,
    pub end_time: f64,
    /// Animations still registered when playback stopped
    pub live_animations: usize,
    /// Stopped by `max_frames` rather than by the scheduler going idle
    pub truncated: bool,
}

struct Target {
    name: String,
    style: Rc<RefCell<StyleMap>>,
}

pub struct Player {
    scheduler: Scheduler,
    clock: ManualClock,
    frames: FrameCounter,
    targets: Vec<Target>,
}

impl Player {
    /// Build the scheduler and play every animation of the scene
    pub fn new(scene: &SceneConfig) -> Result<Self> {
        let clock = ManualClock::new(0.0);
        let frames = FrameCounter::new();
        let mut scheduler =
            Scheduler::with_config(scene.scheduler.clone(), clock.clone(), frames.clone());

        let mut targets = Vec::new();
        let mut ids: BTreeMap<&str, TargetId> = BTreeMap::new();
        for config in &scene.targets {
            let mut style = StyleMap::new();
            for (name, raw) in &config.base {
                let property = name
                    .parse()
                    .with_context(|| format!("Invalid base value on target `{}`", config.name))?;
                style = style.with_base(property, scheduler.registry().parse(property, raw)?);
            }
            let style = Rc::new(RefCell::new(style));
            ids.insert(&config.name, scheduler.add_sink(style.clone()));
            targets.push(Target {
                name: config.name.clone(),
                style,
            });
        }

        for (i, animation) in scene.resolve(scheduler.registry())?.into_iter().enumerate() {
            let target = ids
                .get(animation.target.as_str())
                .copied()
                .with_context(|| format!("Unknown target `{}`", animation.target))?;
            let id = scheduler
                .play(target, &animation.effect, animation.timing)
                .with_context(|| format!("Failed to play animation #{i}"))?;
            tracing::debug!(?id, target_name = %animation.target, "scene animation playing");
        }

        Ok(Self {
            scheduler,
            clock,
            frames,
            targets,
        })
    }

    /// Run until the scheduler stops asking for frames or `max_frames` is hit
    pub fn run(&mut self, options: PlayOptions, out: &mut impl Write) -> Result<PlaySummary> {
        let frame_ms = 1000.0 / f64::from(options.fps.max(1));
        self.emit(&self.report(0), options.json, out)?;

        let mut frame = 0;
        while self.frames.take_request() {
            if frame == options.max_frames {
                tracing::info!(frame, "frame limit reached");
                return Ok(self.summary(frame, true));
            }
            frame += 1;
            let now = self.clock.advance(frame_ms);
            self.scheduler.frame(now);
            self.emit(&self.report(frame), options.json, out)?;
        }

        tracing::info!(frame, "scheduler went idle");
        Ok(self.summary(frame, false))
    }

    fn report(&self, frame: u64) -> FrameReport {
        let targets = self
            .targets
            .iter()
            .map(|target| {
                let values = target
                    .style
                    .borrow()
                    .animated()
                    .into_iter()
                    .map(|(property, value)| (property.to_string(), value.to_string()))
                    .collect();
                (target.name.clone(), values)
            })
            .collect();
        FrameReport {
            frame,
            time: self.scheduler.current_time(),
            targets,
        }
    }

    fn emit(&self, report: &FrameReport, json: bool, out: &mut impl Write) -> Result<()> {
        if json {
            serde_json::to_writer(&mut *out, report)?;
            writeln!(out)?;
            return Ok(());
        }

        write!(out, "frame {:>4}  t={:>8.1}ms", report.frame, report.time)?;
        for (name, values) in &report.targets {
            write!(out, "  {name}:")?;
            if values.is_empty() {
                write!(out, " -")?;
            }
            for (property, value) in values {
                write!(out, " {property}={value}")?;
            }
        }
        writeln!(out)?;
        Ok(())
    }

    fn summary(&self, frames: u64, truncated: bool) -> PlaySummary {
        PlaySummary {
            frames,
            end_time: self.scheduler.current_time(),
            live_animations: self.scheduler.live_animations().len(),
            truncated,
        }
    }
}
