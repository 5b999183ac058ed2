//! Scene files
//!
//! A scene is a TOML file with an optional `[controller]` table and a list of
//! `[[effect]]` tables, each moving one named attribute between two values.

use anyhow::{Context, Result};
use cadence_animation::{ControllerConfig, Delay, Easing, EffectSpec, Strategy};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level scene
#[derive(Debug, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default, rename = "effect")]
    pub effects: Vec<EffectConfig>,
}

/// One animated attribute
#[derive(Debug, Deserialize)]
pub struct EffectConfig {
    pub attribute: String,
    /// Milliseconds, or `"+=N"` / `"-=N"` relative to the previous effect
    #[serde(default)]
    pub delay: Delay,
    /// Milliseconds; one tick when omitted
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub from: f64,
    pub to: f64,
    #[serde(default)]
    pub easing: Easing,
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let scene: Scene = toml::from_str(content)?;
        Ok(scene)
    }

    /// Built-in scene: an element drifting right, then down, on repeat
    pub fn demo() -> Self {
        Self {
            controller: ControllerConfig::new(Strategy::Loop),
            effects: vec![
                EffectConfig {
                    attribute: "left".to_string(),
                    delay: Delay::Absolute(50.0),
                    duration: Some(1000.0),
                    from: 0.0,
                    to: 500.0,
                    easing: Easing::Cosine,
                },
                EffectConfig {
                    attribute: "top".to_string(),
                    delay: Delay::Absolute(500.0),
                    duration: Some(1000.0),
                    from: 0.0,
                    to: 300.0,
                    easing: Easing::Cosine,
                },
            ],
        }
    }
}

impl EffectConfig {
    /// Build an effect that logs the eased value on every tick
    pub fn into_spec(self) -> EffectSpec {
        let EffectConfig {
            attribute,
            delay,
            duration,
            from,
            to,
            easing,
        } = self;

        let label = attribute.clone();
        let spec = EffectSpec::new()
            .attribute(attribute)
            .delay(delay)
            .callback(move |t| {
                let value = easing.interpolate(from, to, t);
                tracing::info!(attribute = %label, "{value:.1} (t={t:.3})");
            });

        match duration {
            Some(ms) => spec.duration(ms),
            None => spec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_animation::Sign;

    #[test]
    fn test_parse_bundled_scene() {
        let scene = Scene::parse(include_str!("../scenes/stagger.toml")).unwrap();

        assert_eq!(scene.controller.strategy, Strategy::Parallel);
        assert_eq!(scene.effects.len(), 3);
        assert_eq!(scene.effects[0].easing, Easing::Cosine);
        assert_eq!(
            scene.effects[1].delay,
            Delay::Relative {
                sign: Sign::Plus,
                ms: 100.0
            }
        );
        assert_eq!(scene.effects[2].from, 1.0);
    }

    #[test]
    fn test_parse_defaults() {
        let scene = Scene::parse("[[effect]]\nattribute = \"x\"\nto = 10").unwrap();

        assert_eq!(scene.controller, ControllerConfig::default());
        let effect = &scene.effects[0];
        assert_eq!(effect.delay, Delay::ZERO);
        assert_eq!(effect.duration, None);
        assert_eq!(effect.easing, Easing::Linear);
    }

    #[test]
    fn test_parse_rejects_bad_delay() {
        let result = Scene::parse("[[effect]]\nattribute = \"x\"\nto = 1\ndelay = \"+=soon\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_demo_scene_loops() {
        let scene = Scene::demo();
        assert_eq!(scene.controller.strategy, Strategy::Loop);
        assert_eq!(scene.effects.len(), 2);
    }
}
