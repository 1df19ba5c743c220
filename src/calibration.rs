use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::error::{lock_poisoned, GResult};

/// Neutral pose subtracted from live orientation
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationOffset {
    /// Smoothed pointer angle (vector-projection aim)
    Angle(f64),
    /// Smoothed tilt (pitch/roll aim)
    PitchRoll { pitch: f64, roll: f64 },
}

impl CalibrationOffset {
    pub fn angle(&self) -> f64 {
        match self {
            CalibrationOffset::Angle(angle) => *angle,
            CalibrationOffset::PitchRoll { .. } => 0.0,
        }
    }

    pub fn pitch_roll(&self) -> (f64, f64) {
        match self {
            CalibrationOffset::PitchRoll { pitch, roll } => (*pitch, *roll),
            CalibrationOffset::Angle(_) => (0.0, 0.0),
        }
    }
}

impl Default for CalibrationOffset {
    fn default() -> Self {
        CalibrationOffset::Angle(0.0)
    }
}

/// Single-writer / multi-reader holder for the calibration offset.
///
/// Written only by an explicit calibrate command; read on every orientation sample.
#[derive(Debug, Default)]
pub struct CalibrationStore {
    offset: RwLock<CalibrationOffset>,
    generation: AtomicU64,
}

impl CalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> GResult<CalibrationOffset> {
        let offset = self.offset.read().map_err(|_| lock_poisoned("calibration"))?;
        Ok(*offset)
    }

    pub fn set(&self, offset: CalibrationOffset) -> GResult<()> {
        let mut current = self.offset.write().map_err(|_| lock_poisoned("calibration"))?;
        *current = offset;
        self.generation.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Number of calibrations applied so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
