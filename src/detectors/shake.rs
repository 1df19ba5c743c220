//! Shake-to-delete: a leaky energy integrator on |a|.
//!
//! There is no cooldown. Resetting the energy after a firing and decaying it on
//! calm samples rate-limits repeated deletes, but continuous hard shaking can
//! fire again within a few samples.
// TODO: revisit with product tuning whether sustained shaking should be capped
// to one delete per gesture instead of re-firing every ENERGY_LIMIT of excess.

use log::debug;
use serde::{Deserialize, Serialize};

use super::burst::validate_alpha;
use super::{Detection, MotionDetector};
use crate::error::{GResult, GestureError};
use crate::types::{DetectorKind, GestureKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShakeConfig {
    /// Only the part of |a| above this accumulates (m/s²)
    pub threshold: f64,
    /// Per-sample energy multiplier on calm samples, in (0, 1)
    pub decay: f64,
    /// Fire once accumulated energy exceeds this
    pub energy_limit: f64,
    /// Smoothing applied to the raw vector before taking its magnitude; 1.0 = raw
    pub input_alpha: f64,
}

impl Default for ShakeConfig {
    fn default() -> Self {
        Self {
            threshold: 27.0,
            decay: 0.9,
            energy_limit: 12.0,
            input_alpha: 1.0,
        }
    }
}

impl ShakeConfig {
    pub fn validate(&self) -> GResult<()> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(GestureError::InvalidConfig(format!(
                "shake.threshold must be finite and positive, got {}",
                self.threshold
            )));
        }
        if !(self.decay > 0.0 && self.decay < 1.0) {
            return Err(GestureError::InvalidConfig(format!(
                "shake.decay must be in (0, 1), got {}",
                self.decay
            )));
        }
        if !self.energy_limit.is_finite() || self.energy_limit <= 0.0 {
            return Err(GestureError::InvalidConfig(format!(
                "shake.energy_limit must be finite and positive, got {}",
                self.energy_limit
            )));
        }
        validate_alpha("shake", self.input_alpha)
    }
}

pub struct ShakeDetector {
    config: ShakeConfig,
    energy: f64,
}

impl ShakeDetector {
    pub fn new(config: ShakeConfig) -> Self {
        Self { config, energy: 0.0 }
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }
}

impl MotionDetector for ShakeDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Shake
    }

    fn update(&mut self, magnitude: f64, timestamp_ns: i64) -> Option<Detection> {
        if !magnitude.is_finite() {
            return None;
        }

        if magnitude > self.config.threshold {
            self.energy += magnitude - self.config.threshold;
            if self.energy > self.config.energy_limit {
                let energy = self.energy;
                self.energy = 0.0;
                debug!("Shake fired: energy {:.2}", energy);
                return Some(Detection {
                    kind: GestureKind::Delete,
                    detector: DetectorKind::Shake,
                    magnitude: energy,
                    timestamp_ns,
                });
            }
        } else {
            self.energy *= self.config.decay;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP_NS: i64 = 10_000_000;

    #[test]
    fn test_at_threshold_never_accumulates() {
        let mut detector = ShakeDetector::new(ShakeConfig::default());
        for i in 0..1000 {
            assert!(detector.update(27.0, i * STEP_NS).is_none());
        }
        assert_eq!(detector.energy(), 0.0);
    }

    #[test]
    fn test_sustained_excess_fires_once_then_resets() {
        let mut detector = ShakeDetector::new(ShakeConfig::default());
        // 5 m/s² over: 5, 10, 15 > 12 fires on the third sample
        let fired: Vec<Detection> = (0..3)
            .filter_map(|i| detector.update(32.0, i * STEP_NS))
            .collect();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, GestureKind::Delete);
        assert!((fired[0].magnitude - 15.0).abs() < 1e-9);
        assert_eq!(detector.energy(), 0.0);
    }

    #[test]
    fn test_calm_samples_decay_energy() {
        let mut detector = ShakeDetector::new(ShakeConfig::default());
        detector.update(37.0, 0);
        assert!((detector.energy() - 10.0).abs() < 1e-9);
        detector.update(9.8, STEP_NS);
        assert!((detector.energy() - 9.0).abs() < 1e-9);
        for i in 2..100 {
            detector.update(9.8, i * STEP_NS);
        }
        assert!(detector.energy() < 1e-3);
        // A decayed history no longer carries a single spike over the limit
        assert!(detector.update(30.0, 100 * STEP_NS).is_none());
    }

    #[test]
    fn test_continuous_shaking_refires() {
        let mut detector = ShakeDetector::new(ShakeConfig::default());
        let count = (0..12)
            .filter_map(|i| detector.update(32.0, i * STEP_NS))
            .count();
        assert_eq!(count, 4);
    }

    #[test]
    fn test_config_validation() {
        assert!(ShakeConfig::default().validate().is_ok());
        let config = ShakeConfig {
            decay: 1.0,
            ..ShakeConfig::default()
        };
        assert!(config.validate().is_err());
        let config = ShakeConfig {
            energy_limit: -1.0,
            ..ShakeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
