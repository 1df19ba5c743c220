use std::ops::{Add, Mul, Sub};

use crate::types::Vec3;

/// Values the exponential smoother can run over (scalars and 3-vectors)
pub trait Smoothable: Copy + Add<Output = Self> + Sub<Output = Self> + Mul<f64, Output = Self> {}

impl Smoothable for f64 {}
impl Smoothable for Vec3 {}

/// One-pole exponential moving average
///
/// `smoothed' = smoothed + alpha * (raw - smoothed)`. The first sample seeds the
/// estimate directly so there is no warm-up transient.
#[derive(Clone, Debug)]
pub struct ExpSmoother<T> {
    alpha: f64,
    value: Option<T>,
}

impl<T: Smoothable> ExpSmoother<T> {
    /// `alpha` in (0, 1]; higher is snappier. Range is checked by the engine config.
    pub fn new(alpha: f64) -> Self {
        ExpSmoother { alpha, value: None }
    }

    /// Feed a raw value and return the updated estimate
    pub fn update(&mut self, raw: T) -> T {
        let next = match self.value {
            Some(current) => current + (raw - current) * self.alpha,
            None => raw,
        };
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<T> {
        self.value
    }

    pub fn is_initialized(&self) -> bool {
        self.value.is_some()
    }
}
