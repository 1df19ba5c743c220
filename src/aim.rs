//! Aim estimation: orientation → continuous pointer angle → arc index.
//!
//! Two interchangeable modes:
//! - vector projection: the screen normal projected on the horizontal plane gives
//!   a bearing, unwrapped and smoothed, with optional reach assist for the side of
//!   the ring that is physically harder to point at;
//! - pitch/roll: smoothed tilt relative to the neutral pose snapped to one of four
//!   cardinal directions, emitted only when the direction changes.
//!
//! All output angles are radians, 0 = north, increasing clockwise.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

use crate::calibration::CalibrationOffset;
use crate::error::{GResult, GestureError};
use crate::smoothing::ExpSmoother;
use crate::types::{
    is_finite_rotation, pitch_roll, screen_normal_in_world, unwrap_delta, AimUpdate, Rotation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AimMode {
    VectorProjection,
    PitchRoll,
}

/// Anisotropic gain toward the hard-to-reach (left) side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReachAssist {
    pub gain_left: f64,
    pub gain_right: f64,
    pub gain_y: f64,
    /// Clockwise rotation applied to leftward bearings (rad). Pushes the west
    /// sectors out to where the amplified bearing changes slowly, widening them.
    pub left_bias_rad: f64,
}

impl Default for ReachAssist {
    fn default() -> Self {
        Self {
            gain_left: 1.65,
            gain_right: 1.15,
            gain_y: 1.0,
            left_bias_rad: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimConfig {
    pub mode: AimMode,
    /// Angle / tilt smoothing factor, higher is snappier
    pub alpha: f64,
    /// Visible sweep multiplier so every arc is reachable in a comfortable range
    pub gain: f64,
    /// `None` disables reach assist
    pub reach_assist: Option<ReachAssist>,
    /// Minimum projected magnitude for a usable bearing, left half-plane
    pub deadzone_left: f64,
    /// Minimum projected magnitude for a usable bearing, right half-plane
    pub deadzone_right: f64,
    /// Smoothing for the angular rate estimate
    pub rate_alpha: f64,
    /// Pitch/roll mode: tilt change from neutral (rad) needed to leave the held direction
    pub min_tilt_change: f64,
}

impl Default for AimConfig {
    fn default() -> Self {
        Self {
            mode: AimMode::VectorProjection,
            alpha: 0.14,
            gain: 2.0,
            reach_assist: Some(ReachAssist::default()),
            deadzone_left: 0.02,
            deadzone_right: 0.04,
            rate_alpha: 0.3,
            min_tilt_change: 0.15,
        }
    }
}

impl AimConfig {
    pub fn validate(&self) -> GResult<()> {
        for (field, value) in [("alpha", self.alpha), ("rate_alpha", self.rate_alpha)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(GestureError::InvalidConfig(format!(
                    "aim.{} must be in (0, 1], got {}",
                    field, value
                )));
            }
        }
        if !self.gain.is_finite() || self.gain < 1.0 {
            return Err(GestureError::InvalidConfig(format!(
                "aim.gain must be at least 1, got {}",
                self.gain
            )));
        }
        for (field, value) in [
            ("deadzone_left", self.deadzone_left),
            ("deadzone_right", self.deadzone_right),
            ("min_tilt_change", self.min_tilt_change),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(GestureError::InvalidConfig(format!(
                    "aim.{} must be finite and non-negative, got {}",
                    field, value
                )));
            }
        }
        if let Some(assist) = &self.reach_assist {
            for (field, value) in [
                ("gain_left", assist.gain_left),
                ("gain_right", assist.gain_right),
                ("gain_y", assist.gain_y),
            ] {
                if !value.is_finite() || value <= 0.0 {
                    return Err(GestureError::InvalidConfig(format!(
                        "aim.reach_assist.{} must be finite and positive, got {}",
                        field, value
                    )));
                }
            }
            if !assist.left_bias_rad.is_finite() || assist.left_bias_rad.abs() >= FRAC_PI_2 {
                return Err(GestureError::InvalidConfig(format!(
                    "aim.reach_assist.left_bias_rad out of range: {}",
                    assist.left_bias_rad
                )));
            }
        }
        Ok(())
    }
}

/// Cardinal directions of the pitch/roll mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinal {
    Up,
    Right,
    Down,
    Left,
}

impl Cardinal {
    pub fn angle(&self) -> f64 {
        match self {
            Cardinal::Up => 0.0,
            Cardinal::Right => FRAC_PI_2,
            Cardinal::Down => PI,
            Cardinal::Left => -FRAC_PI_2,
        }
    }
}

/// Arc containing `angle_rad` when a full turn is split into `arc_count` sectors
/// centered on 0, 360/N, ... degrees. Index 0 spans [-half, +half).
pub fn arc_index(angle_rad: f64, arc_count: usize) -> usize {
    let n = arc_count.max(1) as i64;
    let width = 360.0 / n as f64;
    let sector = ((angle_rad.to_degrees() + width / 2.0) / width).floor() as i64;
    sector.rem_euclid(n) as usize
}

#[derive(Debug)]
struct BearingTracker {
    unwrapped: Option<f64>,
    smoothed: ExpSmoother<f64>,
    rate: ExpSmoother<f64>,
    last: Option<(i64, f64)>,
}

#[derive(Debug)]
struct TiltTracker {
    pitch: ExpSmoother<f64>,
    roll: ExpSmoother<f64>,
    direction: Option<Cardinal>,
}

#[derive(Debug)]
enum Tracker {
    Bearing(BearingTracker),
    Tilt(TiltTracker),
}

/// Per-estimator aim state. Uninitialized until the first usable orientation sample.
#[derive(Debug)]
pub struct AimEstimator {
    config: AimConfig,
    arc_count: usize,
    tracker: Tracker,
}

impl AimEstimator {
    pub fn new(config: AimConfig, arc_count: usize) -> Self {
        let tracker = match config.mode {
            AimMode::VectorProjection => Tracker::Bearing(BearingTracker {
                unwrapped: None,
                smoothed: ExpSmoother::new(config.alpha),
                rate: ExpSmoother::new(config.rate_alpha),
                last: None,
            }),
            AimMode::PitchRoll => Tracker::Tilt(TiltTracker {
                pitch: ExpSmoother::new(config.alpha),
                roll: ExpSmoother::new(config.alpha),
                direction: None,
            }),
        };
        Self {
            config,
            arc_count,
            tracker,
        }
    }

    pub fn is_initialized(&self) -> bool {
        match &self.tracker {
            Tracker::Bearing(b) => b.smoothed.is_initialized(),
            Tracker::Tilt(t) => t.pitch.is_initialized(),
        }
    }

    /// Process one orientation sample.
    ///
    /// Returns `None` while uninitialized, for non-finite input, and in pitch/roll
    /// mode when the resolved direction has not changed.
    pub fn update(
        &mut self,
        rotation: &Rotation,
        timestamp_ns: i64,
        offset: &CalibrationOffset,
    ) -> Option<AimUpdate> {
        if !is_finite_rotation(rotation) {
            return None;
        }
        let (angle, rate) = match &mut self.tracker {
            Tracker::Bearing(b) => Self::update_bearing(&self.config, b, rotation, timestamp_ns, offset)?,
            Tracker::Tilt(t) => (Self::update_tilt(&self.config, t, rotation, offset)?, 0.0),
        };
        Some(AimUpdate {
            angle,
            arc: arc_index(angle, self.arc_count),
            rate,
            timestamp_ns,
        })
    }

    fn update_bearing(
        config: &AimConfig,
        b: &mut BearingTracker,
        rotation: &Rotation,
        timestamp_ns: i64,
        offset: &CalibrationOffset,
    ) -> Option<(f64, f64)> {
        let normal = screen_normal_in_world(rotation);
        let mut vx = normal.x;
        let mut vy = normal.y;
        if let Some(assist) = &config.reach_assist {
            vx *= if vx < 0.0 { assist.gain_left } else { assist.gain_right };
            vy *= assist.gain_y;
        }

        let magnitude = vx.hypot(vy);
        if !magnitude.is_finite() {
            return None;
        }
        let deadzone = if vx < 0.0 {
            config.deadzone_left
        } else {
            config.deadzone_right
        };
        if magnitude < deadzone {
            // Flat wrist: hold the current estimate instead of a noisy bearing
            let smoothed = b.smoothed.value()?;
            let rate = b.rate.value().unwrap_or(0.0);
            return Some((config.gain * (smoothed - offset.angle()), rate));
        }

        let mut raw = vx.atan2(vy);
        if let Some(assist) = &config.reach_assist {
            if vx < 0.0 {
                raw += assist.left_bias_rad;
            }
        }

        // A fresh estimator seeds on the turn nearest the stored offset, which
        // may be several turns out after a restart
        let unwrapped = match b.unwrapped {
            Some(previous) => previous + unwrap_delta(previous, raw),
            None => offset.angle() + unwrap_delta(offset.angle(), raw),
        };
        b.unwrapped = Some(unwrapped);
        let smoothed = b.smoothed.update(unwrapped);

        let rate = match b.last {
            Some((last_ns, last_smoothed)) if timestamp_ns > last_ns => {
                let dt = (timestamp_ns - last_ns) as f64 * 1e-9;
                b.rate.update((smoothed - last_smoothed) / dt)
            }
            _ => b.rate.value().unwrap_or(0.0),
        };
        b.last = Some((timestamp_ns, smoothed));

        Some((config.gain * (smoothed - offset.angle()), rate))
    }

    fn update_tilt(
        config: &AimConfig,
        t: &mut TiltTracker,
        rotation: &Rotation,
        offset: &CalibrationOffset,
    ) -> Option<f64> {
        let (pitch, roll) = pitch_roll(rotation);
        if !(pitch.is_finite() && roll.is_finite()) {
            return None;
        }
        let pitch = t.pitch.update(pitch);
        let roll = t.roll.update(roll);
        let (neutral_pitch, neutral_roll) = offset.pitch_roll();
        let d_pitch = pitch - neutral_pitch;
        let d_roll = roll - neutral_roll;

        let resolved = if d_pitch.abs() < config.min_tilt_change
            && d_roll.abs() < config.min_tilt_change
        {
            t.direction.unwrap_or(Cardinal::Up)
        } else if d_pitch.abs() >= d_roll.abs() {
            if d_pitch > 0.0 {
                Cardinal::Up
            } else {
                Cardinal::Down
            }
        } else if d_roll > 0.0 {
            Cardinal::Right
        } else {
            Cardinal::Left
        };

        if t.direction == Some(resolved) {
            return None;
        }
        t.direction = Some(resolved);
        Some(resolved.angle())
    }

    /// Snapshot of the current smoothed pose for use as the new neutral offset
    pub fn capture(&self) -> Option<CalibrationOffset> {
        match &self.tracker {
            Tracker::Bearing(b) => b.smoothed.value().map(CalibrationOffset::Angle),
            Tracker::Tilt(t) => match (t.pitch.value(), t.roll.value()) {
                (Some(pitch), Some(roll)) => Some(CalibrationOffset::PitchRoll { pitch, roll }),
                _ => None,
            },
        }
    }

    /// Called after a new offset is stored so the next sample re-resolves the direction
    pub fn on_calibrated(&mut self) {
        if let Tracker::Tilt(t) = &mut self.tracker {
            t.direction = None;
        }
    }
}
