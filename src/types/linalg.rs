//! Geometry helpers shared by the aim estimator and the sample types
//!
//! Device frame follows the wearable sensor convention: +z is the screen
//! normal, world +y is north and world +x is east.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use std::f64::consts::{PI, TAU};

pub type Vec3 = Vector3<f64>;
pub type Rotation = UnitQuaternion<f64>;

/// Build a rotation from an Android-style rotation vector `[x, y, z, w]`.
///
/// The quaternion is normalized; a zero or non-finite input yields a rotation
/// with non-finite components, which consumers reject via [`is_finite_rotation`].
pub fn rotation_from_xyzw(x: f64, y: f64, z: f64, w: f64) -> Rotation {
    UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z))
}

/// Recover the scalar part of a rotation vector that only reports `[x, y, z]`.
pub fn scalar_part(x: f64, y: f64, z: f64) -> f64 {
    (1.0 - x * x - y * y - z * z).max(0.0).sqrt()
}

pub fn is_finite_rotation(rotation: &Rotation) -> bool {
    rotation.coords.iter().all(|c| c.is_finite())
}

/// Device screen normal expressed in world coordinates
/// (third column of the device-to-world rotation matrix).
pub fn screen_normal_in_world(rotation: &Rotation) -> Vec3 {
    rotation * Vector3::<f64>::z()
}

/// Tilt of the device as `(pitch, roll)` in radians.
///
/// Pitch is rotation about the device x axis (top edge raised is positive),
/// roll is rotation about the device y axis (right edge lowered is positive).
pub fn pitch_roll(rotation: &Rotation) -> (f64, f64) {
    let (about_x, about_y, _about_z) = rotation.euler_angles();
    (about_x, about_y)
}

/// Shortest signed step from `previous` to `current`, in (-π, π].
///
/// `previous` may be an unwrapped angle many turns away from `current`.
pub fn unwrap_delta(previous: f64, current: f64) -> f64 {
    let delta = (current - previous).rem_euclid(TAU);
    if delta > PI {
        delta - TAU
    } else {
        delta
    }
}
