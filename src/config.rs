use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::aim::AimConfig;
use crate::detectors::burst::{deserialize_clench, deserialize_flick};
use crate::detectors::{BurstConfig, ShakeConfig};
use crate::error::{GResult, GestureError};

/// Which burst detector feeds the public Select output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectSource {
    Flick,
    Clench,
    Both,
}

impl SelectSource {
    pub fn uses_flick(&self) -> bool {
        matches!(self, SelectSource::Flick | SelectSource::Both)
    }

    pub fn uses_clench(&self) -> bool {
        matches!(self, SelectSource::Clench | SelectSource::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of arcs on the selection ring
    pub arc_count: usize,
    pub aim: AimConfig,
    pub select_source: SelectSource,
    #[serde(deserialize_with = "deserialize_flick")]
    pub flick: BurstConfig,
    #[serde(deserialize_with = "deserialize_clench")]
    pub clench: BurstConfig,
    pub delete_enabled: bool,
    pub shake: ShakeConfig,
    /// Capacity of each outbound channel; a full channel drops new items
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            arc_count: 4,
            aim: AimConfig::default(),
            select_source: SelectSource::Flick,
            flick: BurstConfig::flick(),
            clench: BurstConfig::clench(),
            delete_enabled: true,
            shake: ShakeConfig::default(),
            channel_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Load a JSON config; missing fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> GResult<Self> {
        let text = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GResult<()> {
        if self.arc_count < 2 {
            return Err(GestureError::InvalidConfig(format!(
                "arc_count must be at least 2, got {}",
                self.arc_count
            )));
        }
        if self.channel_capacity == 0 {
            return Err(GestureError::InvalidConfig(
                "channel_capacity must be non-zero".to_string(),
            ));
        }
        self.aim.validate()?;
        self.flick.validate("flick")?;
        self.clench.validate("clench")?;
        self.shake.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aim::AimMode;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.flick.peak_threshold, 2.8);
        assert_eq!(config.shake.threshold, 27.0);
        assert_eq!(config.aim.alpha, 0.14);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let json = r#"{
            "arc_count": 6,
            "select_source": "both",
            "aim": { "mode": "pitch-roll", "reach_assist": null },
            "flick": { "cooldown_ms": 300 }
        }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.arc_count, 6);
        assert_eq!(config.select_source, SelectSource::Both);
        assert_eq!(config.aim.mode, AimMode::PitchRoll);
        assert!(config.aim.reach_assist.is_none());
        assert_eq!(config.flick.cooldown_ms, 300);
        assert_eq!(config.flick.window_ms, 120);
        assert!(config.delete_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_clench_keeps_clench_defaults() {
        let json = r#"{ "clench": { "peak_threshold": 18.0 } }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.clench.peak_threshold, 18.0);
        assert_eq!(config.clench.start_threshold, 12.5);
        assert_eq!(config.flick, BurstConfig::flick());
    }

    #[test]
    fn test_unknown_detector_field_rejected() {
        let json = r#"{ "flick": { "peak": 3.0 } }"#;
        assert!(serde_json::from_str::<EngineConfig>(json).is_err());
    }

    #[test]
    fn test_negative_duration_fails_to_parse() {
        let json = r#"{ "flick": { "window_ms": -5 } }"#;
        assert!(serde_json::from_str::<EngineConfig>(json).is_err());
    }

    #[test]
    fn test_validation_failures() {
        let config = EngineConfig {
            arc_count: 1,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            channel_capacity: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.clench.window_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!(
            "wristflick_config_{}.json",
            std::process::id()
        ));
        let mut file = fs::File::create(&path).unwrap();
        write!(file, r#"{{ "arc_count": 8, "delete_enabled": false }}"#).unwrap();
        drop(file);

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.arc_count, 8);
        assert!(!config.delete_enabled);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_select_source_wiring() {
        assert!(SelectSource::Flick.uses_flick());
        assert!(!SelectSource::Flick.uses_clench());
        assert!(SelectSource::Both.uses_flick() && SelectSource::Both.uses_clench());
    }
}
