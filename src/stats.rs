use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free engine counters, bumped from the sensor callbacks
#[derive(Debug, Default)]
pub struct EngineStats {
    orientation_samples: AtomicU64,
    gyro_samples: AtomicU64,
    accel_samples: AtomicU64,
    rejected_samples: AtomicU64,
    aim_updates: AtomicU64,
    selects: AtomicU64,
    deletes: AtomicU64,
    dropped_outputs: AtomicU64,
    calibrations: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub orientation_samples: u64,
    pub gyro_samples: u64,
    pub accel_samples: u64,
    pub rejected_samples: u64,
    pub aim_updates: u64,
    pub selects: u64,
    pub deletes: u64,
    pub dropped_outputs: u64,
    pub calibrations: u64,
}

fn bump(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::Relaxed) + 1
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_orientation(&self) {
        bump(&self.orientation_samples);
    }

    pub fn record_gyro(&self) {
        bump(&self.gyro_samples);
    }

    pub fn record_accel(&self) {
        bump(&self.accel_samples);
    }

    pub fn record_rejected(&self) {
        bump(&self.rejected_samples);
    }

    pub fn record_aim(&self) {
        bump(&self.aim_updates);
    }

    pub fn record_select(&self) {
        bump(&self.selects);
    }

    pub fn record_delete(&self) {
        bump(&self.deletes);
    }

    /// Returns the running total of dropped outputs
    pub fn record_dropped(&self) -> u64 {
        bump(&self.dropped_outputs)
    }

    pub fn record_calibration(&self) {
        bump(&self.calibrations);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            orientation_samples: self.orientation_samples.load(Ordering::Relaxed),
            gyro_samples: self.gyro_samples.load(Ordering::Relaxed),
            accel_samples: self.accel_samples.load(Ordering::Relaxed),
            rejected_samples: self.rejected_samples.load(Ordering::Relaxed),
            aim_updates: self.aim_updates.load(Ordering::Relaxed),
            selects: self.selects.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            dropped_outputs: self.dropped_outputs.load(Ordering::Relaxed),
            calibrations: self.calibrations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let stats = EngineStats::new();
        stats.record_gyro();
        stats.record_gyro();
        stats.record_select();
        assert_eq!(stats.record_dropped(), 1);
        assert_eq!(stats.record_dropped(), 2);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.gyro_samples, 2);
        assert_eq!(snapshot.selects, 1);
        assert_eq!(snapshot.dropped_outputs, 2);
        assert_eq!(snapshot.deletes, 0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_string(&EngineStats::new().snapshot()).unwrap();
        assert!(json.contains("\"aim_updates\":0"));
    }
}
