//! Scene file handling
//!
//! A scene names a set of targets and the animations played on them:
//!
//! ```toml
//! [scheduler]
//! clamp_segment_progress = true
//!
//! [[target]]
//! name = "cube"
//!
//! [[animation]]
//! target = "cube"
//! timing = { duration = 1000, iterations = 2, direction = "alternate" }
//!
//! [[animation.keyframes]]
//! offset = 0.0
//! easing = "ease-in-out"
//! values = { left = "0px", opacity = "0" }
//!
//! [[animation.keyframes]]
//! offset = 1.0
//! values = { left = "120px", opacity = "1" }
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use cadenza_animation::{
    AnimationPreset, CompositeOperation, EffectInput, Easing, InterpolationRegistry,
    KeyframeSampler, RawKeyframe, SchedulerConfig, Timing,
};
use cadenza_core::PropertyId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Top-level scene file
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetConfig>,
    #[serde(default, rename = "animation")]
    pub animations: Vec<AnimationConfig>,
}

/// Something animations write to
#[derive(Debug, Deserialize, Serialize)]
pub struct TargetConfig {
    pub name: String,
    /// Un-animated property values, as raw strings
    #[serde(default)]
    pub base: IndexMap<String, String>,
}

/// One animation: a preset or explicit keyframes, plus timing
#[derive(Debug, Deserialize, Serialize)]
pub struct AnimationConfig {
    pub target: String,
    #[serde(default)]
    pub preset: Option<PresetConfig>,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub keyframes: Vec<KeyframeConfig>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PresetConfig {
    pub name: String,
    /// Overrides `timing.duration`
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct KeyframeConfig {
    #[serde(default)]
    pub offset: Option<f64>,
    #[serde(default)]
    pub easing: Easing,
    #[serde(default)]
    pub composite: CompositeOperation,
    /// Property name to raw value, in declaration order
    #[serde(default)]
    pub values: IndexMap<String, String>,
}

/// An animation with its effect resolved and ready to play
#[derive(Debug)]
pub struct ResolvedAnimation {
    pub target: String,
    pub effect: EffectInput,
    pub timing: Timing,
}

/// A resolved animation with its compiled effect
#[derive(Debug)]
pub struct CompiledAnimation {
    pub target: String,
    pub sampler: KeyframeSampler,
    pub timing: Timing,
}

impl SceneConfig {
    /// Load a scene file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let scene: SceneConfig = toml::from_str(content)?;
        scene.check_targets()?;
        Ok(scene)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize scene")
    }

    fn check_targets(&self) -> Result<()> {
        for (i, target) in self.targets.iter().enumerate() {
            if self.targets[..i].iter().any(|t| t.name == target.name) {
                anyhow::bail!("Duplicate target `{}`", target.name);
            }
        }
        for (i, animation) in self.animations.iter().enumerate() {
            if !self.targets.iter().any(|t| t.name == animation.target) {
                anyhow::bail!(
                    "Animation #{i} refers to unknown target `{}`",
                    animation.target
                );
            }
        }
        Ok(())
    }

    /// Resolve presets and raw values of every animation
    pub fn resolve(&self, registry: &InterpolationRegistry) -> Result<Vec<ResolvedAnimation>> {
        self.animations
            .iter()
            .enumerate()
            .map(|(i, animation)| {
                animation.resolve(registry).with_context(|| {
                    format!("Invalid animation #{i} (target `{}`)", animation.target)
                })
            })
            .collect()
    }

    /// Resolve and compile every animation without playing anything
    pub fn compile(&self, registry: &InterpolationRegistry) -> Result<Vec<CompiledAnimation>> {
        self.resolve(registry)?
            .into_iter()
            .enumerate()
            .map(|(i, animation)| {
                let mut sampler = KeyframeSampler::compile(&animation.effect, registry)
                    .with_context(|| format!("Failed to compile animation #{i}"))?;
                sampler.set_clamp_progress(self.scheduler.clamp_segment_progress);
                Ok(CompiledAnimation {
                    target: animation.target,
                    sampler,
                    timing: animation.timing,
                })
            })
            .collect()
    }
}

impl AnimationConfig {
    fn resolve(&self, registry: &InterpolationRegistry) -> Result<ResolvedAnimation> {
        let mut timing = self.timing.clone();
        let effect = match &self.preset {
            Some(_) if !self.keyframes.is_empty() => {
                anyhow::bail!("Use either a preset or keyframes, not both")
            }
            Some(preset) => {
                if let Some(duration) = preset.duration {
                    timing.duration = duration;
                }
                AnimationPreset::by_name(&preset.name)
                    .with_context(|| format!("Unknown preset `{}`", preset.name))?
            }
            None => {
                let mut effect = EffectInput::new();
                for keyframe in &self.keyframes {
                    effect.push(keyframe.resolve(registry)?);
                }
                effect
            }
        };
        timing.validate()?;

        Ok(ResolvedAnimation {
            target: self.target.clone(),
            effect,
            timing,
        })
    }
}

impl KeyframeConfig {
    fn resolve(&self, registry: &InterpolationRegistry) -> Result<RawKeyframe> {
        let mut keyframe = RawKeyframe::new()
            .easing(self.easing)
            .composite(self.composite);
        keyframe.offset = self.offset;
        for (name, raw) in &self.values {
            let property: PropertyId = name.parse()?;
            keyframe = keyframe.set(property, registry.parse(property, raw)?);
        }
        Ok(keyframe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_animation::{FillMode, PlaybackDirection};
    use cadenza_core::PropertyValue;
    use std::io::Write;

    const SCENE: &str = r#"
[scheduler]
sync_play = false

[[target]]
name = "cube"
base = { opacity = "0.5" }

[[target]]
name = "light"

[[animation]]
target = "cube"
timing = { duration = 1000, iterations = 2, direction = "alternate", fill = "forwards" }

[[animation.keyframes]]
offset = 0.0
easing = "ease-in-out"
values = { left = "0px", opacity = "0" }

[[animation.keyframes]]
values = { left = "60px" }

[[animation.keyframes]]
offset = 1.0
values = { left = "120px", opacity = "1" }

[[animation]]
target = "light"
preset = { name = "fade-in", duration = 250 }
"#;

    #[test]
    fn test_parse_scene() {
        let scene = SceneConfig::from_toml(SCENE).unwrap();
        assert!(!scene.scheduler.sync_play);
        assert!(scene.scheduler.clamp_segment_progress);
        assert_eq!(scene.targets.len(), 2);
        assert_eq!(scene.targets[0].base.get("opacity").map(String::as_str), Some("0.5"));

        let timing = &scene.animations[0].timing;
        assert_eq!(timing.duration, 1000.0);
        assert_eq!(timing.iterations, 2.0);
        assert_eq!(timing.direction, PlaybackDirection::Alternate);
        assert_eq!(timing.fill, FillMode::Forwards);
        assert_eq!(scene.animations[0].keyframes[0].easing, Easing::EaseInOut);
        assert_eq!(scene.animations[0].keyframes[1].offset, None);
    }

    #[test]
    fn test_resolve_keyframes_and_presets() {
        let scene = SceneConfig::from_toml(SCENE).unwrap();
        let resolved = scene.resolve(&InterpolationRegistry::new()).unwrap();
        assert_eq!(resolved.len(), 2);

        let first = &resolved[0].effect.keyframes()[0];
        assert_eq!(
            first.values.as_slice(),
            &[
                (PropertyId::Left, PropertyValue::Length(0.0)),
                (PropertyId::Opacity, PropertyValue::Number(0.0)),
            ]
        );
        assert_eq!(resolved[1].timing.duration, 250.0);
        assert_eq!(resolved[1].effect, AnimationPreset::fade_in());
    }

    #[test]
    fn test_compile_reports_segments() {
        let scene = SceneConfig::from_toml(SCENE).unwrap();
        let compiled = scene.compile(&InterpolationRegistry::new()).unwrap();
        assert_eq!(compiled.len(), 2);
        assert_eq!(compiled[0].target, "cube");
        // left: 0 -> 60 -> 120, opacity: 0 -> 1
        assert_eq!(compiled[0].sampler.properties().len(), 2);
        assert_eq!(compiled[0].sampler.segments().len(), 3);
        assert_eq!(compiled[1].timing.end_time(), 250.0);
    }

    #[test]
    fn test_compile_reports_partial_keyframes() {
        let scene = SceneConfig::from_toml(
            r#"
[[target]]
name = "cube"

[[animation]]
target = "cube"

[[animation.keyframes]]
offset = 0.0
values = { left = "0px", opacity = "0" }

[[animation.keyframes]]
offset = 1.0
values = { left = "10px" }
"#,
        )
        .unwrap();
        let err = scene.compile(&InterpolationRegistry::new()).unwrap_err();
        assert!(format!("{err:#}").contains("animation #0"));
    }

    #[test]
    fn test_rejects_unknown_target() {
        let err = SceneConfig::from_toml(
            r#"
[[animation]]
target = "ghost"
preset = { name = "spin" }
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_rejects_duplicate_target() {
        let err = SceneConfig::from_toml(
            r#"
[[target]]
name = "cube"

[[target]]
name = "cube"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_resolve_reports_bad_values() {
        let scene = SceneConfig::from_toml(
            r#"
[[target]]
name = "cube"

[[animation]]
target = "cube"

[[animation.keyframes]]
values = { left = "ten pixels" }
"#,
        )
        .unwrap();
        let err = scene.resolve(&InterpolationRegistry::new()).unwrap_err();
        assert!(format!("{err:#}").contains("ten pixels"));

        let scene = SceneConfig::from_toml(
            r#"
[[target]]
name = "cube"

[[animation]]
target = "cube"

[[animation.keyframes]]
values = { offset = "0" }
"#,
        )
        .unwrap();
        assert!(scene.resolve(&InterpolationRegistry::new()).is_err());
    }

    #[test]
    fn test_rejects_bad_easing() {
        let err = SceneConfig::from_toml(
            r#"
[[target]]
name = "cube"

[[animation]]
target = "cube"

[[animation.keyframes]]
easing = "wobbly"
values = { left = "0px" }
"#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("wobbly"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENE.as_bytes()).unwrap();

        let scene = SceneConfig::load(file.path()).unwrap();
        assert_eq!(scene.animations.len(), 2);

        let round_trip = SceneConfig::from_toml(&scene.to_toml().unwrap()).unwrap();
        assert_eq!(round_trip.animations.len(), 2);

        let missing = file.path().with_extension("missing");
        let err = SceneConfig::load(&missing).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
