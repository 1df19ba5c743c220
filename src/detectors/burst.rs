//! Arm / peak / settle burst detector.
//!
//! A single threshold on instantaneous magnitude fires on sustained motion and
//! misses short flicks. Instead the detector arms on a rising edge, tracks the
//! peak inside a bounded window, and only fires if the peak was high enough once
//! the signal settles. Used for wrist flicks (gyroscope |ω|) and clenches
//! (accelerometer |a|, which settles back near gravity).

use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

use super::{Detection, MotionDetector, NANOS_PER_MILLI};
use crate::error::{GResult, GestureError};
use crate::types::{DetectorKind, GestureKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurstConfig {
    /// Arm when magnitude rises above this
    pub start_threshold: f64,
    /// The window must reach this peak to fire
    pub peak_threshold: f64,
    /// Magnitude considered settled (near zero for ω, near gravity for |a|)
    pub end_threshold: f64,
    /// Earliest the window may close on a settled signal (ms)
    pub min_arm_ms: u64,
    /// Window closes unconditionally after this long (ms)
    pub window_ms: u64,
    /// Dead time after a firing (ms)
    pub cooldown_ms: u64,
    /// Smoothing applied to the raw vector before taking its magnitude; 1.0 = raw
    pub input_alpha: f64,
}

impl BurstConfig {
    /// Longest duration whose nanosecond count fits an `i64` timestamp
    pub const MAX_DURATION_MS: u64 = (i64::MAX / NANOS_PER_MILLI) as u64;

    /// Wrist flick on the gyroscope, rad/s
    pub fn flick() -> Self {
        Self {
            start_threshold: 1.8,
            peak_threshold: 2.8,
            end_threshold: 1.2,
            min_arm_ms: 30,
            window_ms: 120,
            cooldown_ms: 260,
            input_alpha: 1.0,
        }
    }

    /// Muscle clench on the accelerometer, m/s² including gravity
    pub fn clench() -> Self {
        Self {
            start_threshold: 12.5,
            peak_threshold: 15.0,
            end_threshold: 10.5,
            min_arm_ms: 20,
            window_ms: 150,
            cooldown_ms: 400,
            input_alpha: 1.0,
        }
    }

    pub fn validate(&self, name: &str) -> GResult<()> {
        let thresholds = [
            ("start_threshold", self.start_threshold),
            ("peak_threshold", self.peak_threshold),
            ("end_threshold", self.end_threshold),
        ];
        for (field, value) in thresholds {
            if !value.is_finite() || value <= 0.0 {
                return Err(GestureError::InvalidConfig(format!(
                    "{}.{} must be finite and positive, got {}",
                    name, field, value
                )));
            }
        }
        if self.end_threshold > self.start_threshold {
            return Err(GestureError::InvalidConfig(format!(
                "{}: end_threshold {} exceeds start_threshold {}",
                name, self.end_threshold, self.start_threshold
            )));
        }
        if self.start_threshold > self.peak_threshold {
            return Err(GestureError::InvalidConfig(format!(
                "{}: start_threshold {} exceeds peak_threshold {}",
                name, self.start_threshold, self.peak_threshold
            )));
        }
        let max_ms = Self::MAX_DURATION_MS;
        for (field, value) in [
            ("min_arm_ms", self.min_arm_ms),
            ("window_ms", self.window_ms),
            ("cooldown_ms", self.cooldown_ms),
        ] {
            if value > max_ms {
                return Err(GestureError::InvalidConfig(format!(
                    "{}.{} {} exceeds the {} ms limit",
                    name, field, value, max_ms
                )));
            }
        }
        if self.window_ms == 0 {
            return Err(GestureError::InvalidConfig(format!(
                "{}.window_ms must be non-zero",
                name
            )));
        }
        if self.min_arm_ms >= self.window_ms {
            return Err(GestureError::InvalidConfig(format!(
                "{}: min_arm_ms {} must be shorter than window_ms {}",
                name, self.min_arm_ms, self.window_ms
            )));
        }
        validate_alpha(name, self.input_alpha)
    }
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self::flick()
    }
}

/// Partial burst settings from a config file, laid over a detector's own defaults
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BurstOverrides {
    start_threshold: Option<f64>,
    peak_threshold: Option<f64>,
    end_threshold: Option<f64>,
    min_arm_ms: Option<u64>,
    window_ms: Option<u64>,
    cooldown_ms: Option<u64>,
    input_alpha: Option<f64>,
}

impl BurstOverrides {
    fn apply(self, base: BurstConfig) -> BurstConfig {
        BurstConfig {
            start_threshold: self.start_threshold.unwrap_or(base.start_threshold),
            peak_threshold: self.peak_threshold.unwrap_or(base.peak_threshold),
            end_threshold: self.end_threshold.unwrap_or(base.end_threshold),
            min_arm_ms: self.min_arm_ms.unwrap_or(base.min_arm_ms),
            window_ms: self.window_ms.unwrap_or(base.window_ms),
            cooldown_ms: self.cooldown_ms.unwrap_or(base.cooldown_ms),
            input_alpha: self.input_alpha.unwrap_or(base.input_alpha),
        }
    }
}

pub(crate) fn deserialize_flick<'de, D: Deserializer<'de>>(d: D) -> Result<BurstConfig, D::Error> {
    Ok(BurstOverrides::deserialize(d)?.apply(BurstConfig::flick()))
}

pub(crate) fn deserialize_clench<'de, D: Deserializer<'de>>(d: D) -> Result<BurstConfig, D::Error> {
    Ok(BurstOverrides::deserialize(d)?.apply(BurstConfig::clench()))
}

pub(crate) fn validate_alpha(name: &str, alpha: f64) -> GResult<()> {
    if !(alpha > 0.0 && alpha <= 1.0) {
        return Err(GestureError::InvalidConfig(format!(
            "{}.input_alpha must be in (0, 1], got {}",
            name, alpha
        )));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DetectorState {
    Idle,
    Arming { start_ns: i64, peak: f64 },
    Cooldown { until_ns: i64 },
}

pub struct BurstDetector {
    kind: DetectorKind,
    config: BurstConfig,
    state: DetectorState,
    cooldown_until_ns: i64,
}

impl BurstDetector {
    pub fn new(kind: DetectorKind, config: BurstConfig) -> Self {
        Self {
            kind,
            config,
            state: DetectorState::Idle,
            cooldown_until_ns: i64::MIN,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    fn ms(value: u64) -> i64 {
        i64::try_from(value)
            .ok()
            .and_then(|ms| ms.checked_mul(NANOS_PER_MILLI))
            .unwrap_or(i64::MAX)
    }
}

impl MotionDetector for BurstDetector {
    fn kind(&self) -> DetectorKind {
        self.kind
    }

    fn update(&mut self, magnitude: f64, now_ns: i64) -> Option<Detection> {
        if !magnitude.is_finite() {
            return None;
        }

        match self.state {
            DetectorState::Idle => {
                if now_ns >= self.cooldown_until_ns && magnitude > self.config.start_threshold {
                    self.state = DetectorState::Arming {
                        start_ns: now_ns,
                        peak: magnitude,
                    };
                }
                None
            }
            DetectorState::Arming { start_ns, peak } => {
                let peak = peak.max(magnitude);
                let elapsed = now_ns.saturating_sub(start_ns);
                let settled = magnitude < self.config.end_threshold
                    && elapsed > Self::ms(self.config.min_arm_ms);
                let expired = elapsed > Self::ms(self.config.window_ms);

                if !(settled || expired) {
                    self.state = DetectorState::Arming { start_ns, peak };
                    return None;
                }

                if peak >= self.config.peak_threshold {
                    self.cooldown_until_ns = now_ns.saturating_add(Self::ms(self.config.cooldown_ms));
                    self.state = DetectorState::Cooldown {
                        until_ns: self.cooldown_until_ns,
                    };
                    debug!(
                        "{:?} burst fired: peak {:.2} after {:.1} ms",
                        self.kind,
                        peak,
                        elapsed as f64 / NANOS_PER_MILLI as f64
                    );
                    Some(Detection {
                        kind: GestureKind::Select,
                        detector: self.kind,
                        magnitude: peak,
                        timestamp_ns: now_ns,
                    })
                } else {
                    debug!(
                        "{:?} burst rejected: peak {:.2} below {:.2}",
                        self.kind, peak, self.config.peak_threshold
                    );
                    self.state = DetectorState::Idle;
                    None
                }
            }
            DetectorState::Cooldown { until_ns } => {
                // Must be quiescent too, otherwise a long burst would re-arm mid-motion
                if now_ns >= until_ns && magnitude < self.config.end_threshold {
                    self.state = DetectorState::Idle;
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP_NS: i64 = 5 * NANOS_PER_MILLI; // 200 Hz gyro

    /// ω rising 0 → 3.5 rad/s over 20 ms then back to 0 over 30 ms, then quiet
    fn flick_trace(start_ns: i64, quiet_ms: i64) -> Vec<(i64, f64)> {
        let mut trace = Vec::new();
        let mut t = 0;
        while t <= 50 {
            let omega = if t <= 20 {
                3.5 * t as f64 / 20.0
            } else {
                3.5 * (1.0 - (t - 20) as f64 / 30.0)
            };
            trace.push((start_ns + t * NANOS_PER_MILLI, omega));
            t += 5;
        }
        let mut t = 55;
        while t <= 50 + quiet_ms {
            trace.push((start_ns + t * NANOS_PER_MILLI, 0.0));
            t += 5;
        }
        trace
    }

    fn run(detector: &mut BurstDetector, trace: &[(i64, f64)]) -> usize {
        trace
            .iter()
            .filter_map(|&(t, omega)| detector.update(omega, t))
            .count()
    }

    #[test]
    fn test_flick_fires_once() {
        let mut detector = BurstDetector::new(DetectorKind::Flick, BurstConfig::flick());
        assert_eq!(run(&mut detector, &flick_trace(0, 0)), 1);
        assert!(matches!(detector.state(), DetectorState::Cooldown { .. }));
    }

    #[test]
    fn test_flick_reports_peak() {
        let mut detector = BurstDetector::new(DetectorKind::Flick, BurstConfig::flick());
        let detection = flick_trace(0, 0)
            .into_iter()
            .find_map(|(t, omega)| detector.update(omega, t))
            .expect("flick should fire");
        assert_eq!(detection.kind, GestureKind::Select);
        assert_eq!(detection.detector, DetectorKind::Flick);
        assert!((detection.magnitude - 3.5).abs() < 1e-9);
        // Settles at 50 ms: ω < END at 40 ms but the 30 ms minimum arm time holds it open
        assert_eq!(detection.timestamp_ns, 50 * NANOS_PER_MILLI);
    }

    #[test]
    fn test_repeat_within_cooldown_is_suppressed() {
        let mut detector = BurstDetector::new(DetectorKind::Flick, BurstConfig::flick());
        assert_eq!(run(&mut detector, &flick_trace(0, 0)), 1);
        // Fired at 50 ms, cooldown until 310 ms
        assert_eq!(run(&mut detector, &flick_trace(55 * NANOS_PER_MILLI, 0)), 0);
        assert_eq!(run(&mut detector, &flick_trace(110 * NANOS_PER_MILLI, 0)), 0);
    }

    #[test]
    fn test_repeat_after_cooldown_fires_again() {
        let mut detector = BurstDetector::new(DetectorKind::Flick, BurstConfig::flick());
        assert_eq!(run(&mut detector, &flick_trace(0, 300)), 1);
        assert_eq!(detector.state(), DetectorState::Idle);
        assert_eq!(run(&mut detector, &flick_trace(400 * NANOS_PER_MILLI, 0)), 1);
    }

    #[test]
    fn test_weak_burst_returns_to_idle() {
        let mut detector = BurstDetector::new(DetectorKind::Flick, BurstConfig::flick());
        let trace: Vec<(i64, f64)> = (0..40)
            .map(|i| (i * STEP_NS, if i < 10 { 2.2 } else { 0.1 }))
            .collect();
        assert_eq!(run(&mut detector, &trace), 0);
        assert_eq!(detector.state(), DetectorState::Idle);
    }

    #[test]
    fn test_sustained_motion_closes_window_once() {
        let mut detector = BurstDetector::new(DetectorKind::Flick, BurstConfig::flick());
        // Elevated motion that never settles: window expires at 120 ms and fires once,
        // then the detector stays in cooldown while the motion continues.
        let trace: Vec<(i64, f64)> = (0..200).map(|i| (i * STEP_NS, 3.0)).collect();
        assert_eq!(run(&mut detector, &trace), 1);
        assert!(matches!(detector.state(), DetectorState::Cooldown { .. }));
    }

    #[test]
    fn test_cooldown_waits_for_quiet() {
        let mut detector = BurstDetector::new(DetectorKind::Flick, BurstConfig::flick());
        run(&mut detector, &flick_trace(0, 0));
        // Past the deadline but still moving
        detector.update(1.5, 400 * NANOS_PER_MILLI);
        assert!(matches!(detector.state(), DetectorState::Cooldown { .. }));
        detector.update(0.2, 405 * NANOS_PER_MILLI);
        assert_eq!(detector.state(), DetectorState::Idle);
    }

    #[test]
    fn test_non_finite_samples_ignored() {
        let mut detector = BurstDetector::new(DetectorKind::Flick, BurstConfig::flick());
        assert!(detector.update(f64::NAN, 0).is_none());
        assert!(detector.update(f64::INFINITY, STEP_NS).is_none());
        assert_eq!(detector.state(), DetectorState::Idle);
    }

    #[test]
    fn test_clench_settles_near_gravity() {
        let mut detector = BurstDetector::new(DetectorKind::Clench, BurstConfig::clench());
        let samples = [9.8, 13.0, 16.5, 14.0, 11.0, 10.2, 9.9, 9.8, 9.8];
        let fired: Vec<Detection> = samples
            .iter()
            .enumerate()
            .filter_map(|(i, &a)| detector.update(a, i as i64 * STEP_NS))
            .collect();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].detector, DetectorKind::Clench);
    }

    #[test]
    fn test_config_validation() {
        assert!(BurstConfig::flick().validate("flick").is_ok());
        assert!(BurstConfig::clench().validate("clench").is_ok());

        let mut config = BurstConfig::flick();
        config.min_arm_ms = 200;
        assert!(config.validate("flick").is_err());

        let mut config = BurstConfig::flick();
        config.peak_threshold = f64::NAN;
        assert!(config.validate("flick").is_err());

        let mut config = BurstConfig::flick();
        config.end_threshold = 2.0;
        assert!(config.validate("flick").is_err());

        let mut config = BurstConfig::flick();
        config.input_alpha = 0.0;
        assert!(config.validate("flick").is_err());
    }

    #[test]
    fn test_oversized_durations_rejected() {
        let mut config = BurstConfig::flick();
        config.cooldown_ms = 10_000_000_000_000;
        let err = config.validate("flick").unwrap_err();
        assert!(err.to_string().contains("flick.cooldown_ms"));

        let mut config = BurstConfig::clench();
        config.window_ms = u64::MAX;
        assert!(config.validate("clench").is_err());
    }

    #[test]
    fn test_longest_cooldown_saturates() {
        let mut config = BurstConfig::flick();
        config.cooldown_ms = BurstConfig::MAX_DURATION_MS;
        assert!(config.validate("flick").is_ok());

        let mut detector = BurstDetector::new(DetectorKind::Flick, config);
        let base = 1_000_000 * NANOS_PER_MILLI;
        let fired = [0.5, 3.5, 3.0, 0.2, 0.1]
            .iter()
            .enumerate()
            .filter_map(|(i, &w)| detector.update(w, base + i as i64 * 20 * NANOS_PER_MILLI))
            .count();
        assert_eq!(fired, 1);
        assert_eq!(
            detector.state(),
            DetectorState::Cooldown { until_ns: i64::MAX }
        );
    }
}
