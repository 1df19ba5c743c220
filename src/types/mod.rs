pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

/// One inertial or orientation reading, tagged by sensor.
///
/// Timestamps are monotonic nanoseconds as delivered by the sensor stack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SensorSample {
    Orientation { rotation: Rotation, timestamp_ns: i64 },
    AngularVelocity { omega: Vec3, timestamp_ns: i64 },
    LinearAcceleration { accel: Vec3, timestamp_ns: i64 },
}

impl SensorSample {
    pub fn orientation(x: f64, y: f64, z: f64, w: f64, timestamp_ns: i64) -> Self {
        SensorSample::Orientation {
            rotation: rotation_from_xyzw(x, y, z, w),
            timestamp_ns,
        }
    }

    pub fn angular_velocity(x: f64, y: f64, z: f64, timestamp_ns: i64) -> Self {
        SensorSample::AngularVelocity {
            omega: Vec3::new(x, y, z),
            timestamp_ns,
        }
    }

    pub fn linear_acceleration(x: f64, y: f64, z: f64, timestamp_ns: i64) -> Self {
        SensorSample::LinearAcceleration {
            accel: Vec3::new(x, y, z),
            timestamp_ns,
        }
    }

    pub fn timestamp_ns(&self) -> i64 {
        match self {
            SensorSample::Orientation { timestamp_ns, .. }
            | SensorSample::AngularVelocity { timestamp_ns, .. }
            | SensorSample::LinearAcceleration { timestamp_ns, .. } => *timestamp_ns,
        }
    }
}

/// Discrete typing action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    /// Commit the highlighted character group
    Select,
    /// Remove the last committed word
    Delete,
}

/// Which motion detector produced an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Flick,
    Clench,
    Shake,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub kind: GestureKind,
    pub detector: DetectorKind,
    /// Arc highlighted when a Select fired; `None` for Delete or before any aim
    pub arc: Option<usize>,
    /// Peak angular velocity / acceleration of the burst, or shake energy
    pub magnitude: f64,
    pub timestamp_ns: i64,
}

/// Continuous aim output, one per processed orientation sample
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AimUpdate {
    /// Visible angle in radians relative to the calibrated pose, clockwise from north
    pub angle: f64,
    pub arc: usize,
    /// Smoothed angular rate of the aim estimate (rad/s)
    pub rate: f64,
    pub timestamp_ns: i64,
}
