//! Motion event detectors
//!
//! Each detector owns its own state and is driven by a single sensor's
//! magnitude stream plus that stream's timestamps.

pub mod burst;
pub mod shake;

pub use burst::{BurstConfig, BurstDetector, DetectorState};
pub use shake::{ShakeConfig, ShakeDetector};

use crate::types::{DetectorKind, GestureKind};

pub(crate) const NANOS_PER_MILLI: i64 = 1_000_000;

/// A detector firing, before the engine attaches aim context
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub kind: GestureKind,
    pub detector: DetectorKind,
    pub magnitude: f64,
    pub timestamp_ns: i64,
}

pub trait MotionDetector: Send {
    fn kind(&self) -> DetectorKind;

    /// Feed one magnitude sample; returns a detection at most once per cycle
    fn update(&mut self, magnitude: f64, timestamp_ns: i64) -> Option<Detection>;
}
