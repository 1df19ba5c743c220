use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::{lock_poisoned, GResult, GestureError};
use crate::types::SensorSample;

/// Hardware sensors the engine can listen to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Fused orientation without magnetometer (preferred, no heading drift from magnets)
    GameRotationVector,
    RotationVector,
    Gyroscope,
    Accelerometer,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorKind::GameRotationVector => "game rotation vector",
            SensorKind::RotationVector => "rotation vector",
            SensorKind::Gyroscope => "gyroscope",
            SensorKind::Accelerometer => "accelerometer",
        };
        f.write_str(name)
    }
}

/// Receives samples from a sensor source.
///
/// Called from the source's delivery threads; each sensor's callbacks must not
/// overlap with themselves, but different sensors may be delivered concurrently.
pub trait SensorListener: Send + Sync {
    fn on_sample(&self, sample: SensorSample);
}

/// Push-based provider of sensor samples
pub trait SensorSource: Send {
    fn supports(&self, kind: SensorKind) -> bool;

    /// Start delivering samples for `kinds` to `listener`
    fn register(&mut self, kinds: &[SensorKind], listener: Arc<dyn SensorListener>) -> GResult<()>;

    /// Stop all delivery. Must be safe to call repeatedly.
    fn unregister_all(&mut self);
}

type ListenerSlot = Arc<Mutex<Option<Arc<dyn SensorListener>>>>;

/// Source for hosts that receive sensor callbacks themselves.
///
/// The host keeps a [`SampleInjector`] and forwards each callback through it.
pub struct ManualSource {
    available: Vec<SensorKind>,
    registered: Vec<SensorKind>,
    listener: ListenerSlot,
}

impl ManualSource {
    pub fn new(available: &[SensorKind]) -> Self {
        Self {
            available: available.to_vec(),
            registered: Vec::new(),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Every sensor kind available
    pub fn full() -> Self {
        Self::new(&[
            SensorKind::GameRotationVector,
            SensorKind::RotationVector,
            SensorKind::Gyroscope,
            SensorKind::Accelerometer,
        ])
    }

    pub fn injector(&self) -> SampleInjector {
        SampleInjector {
            listener: Arc::clone(&self.listener),
        }
    }

    pub fn registered(&self) -> &[SensorKind] {
        &self.registered
    }
}

impl SensorSource for ManualSource {
    fn supports(&self, kind: SensorKind) -> bool {
        self.available.contains(&kind)
    }

    fn register(&mut self, kinds: &[SensorKind], listener: Arc<dyn SensorListener>) -> GResult<()> {
        if let Some(missing) = kinds.iter().find(|k| !self.supports(**k)) {
            return Err(GestureError::SensorUnavailable(*missing));
        }
        let mut slot = self.listener.lock().map_err(|_| lock_poisoned("listener"))?;
        *slot = Some(listener);
        self.registered = kinds.to_vec();
        Ok(())
    }

    fn unregister_all(&mut self) {
        if let Ok(mut slot) = self.listener.lock() {
            *slot = None;
        }
        self.registered.clear();
    }
}

/// Cloneable handle that forwards samples into a [`ManualSource`]'s listener
#[derive(Clone)]
pub struct SampleInjector {
    listener: ListenerSlot,
}

impl SampleInjector {
    /// Deliver one sample. Returns false if nothing is registered.
    pub fn push(&self, sample: SensorSample) -> bool {
        // Clone out of the slot so the callback runs without holding the lock
        let listener = match self.listener.lock() {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };
        match listener {
            Some(listener) => {
                listener.on_sample(sample);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl SensorListener for Counter {
        fn on_sample(&self, _sample: SensorSample) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_manual_source_delivers_until_unregistered() {
        let mut source = ManualSource::full();
        let injector = source.injector();
        let counter = Arc::new(Counter::default());

        assert!(!injector.push(SensorSample::angular_velocity(0.0, 0.0, 0.0, 0)));

        source
            .register(&[SensorKind::Gyroscope], counter.clone())
            .unwrap();
        assert!(injector.push(SensorSample::angular_velocity(0.0, 0.0, 0.0, 1)));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        source.unregister_all();
        source.unregister_all();
        assert!(!injector.push(SensorSample::angular_velocity(0.0, 0.0, 0.0, 2)));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(source.registered().is_empty());
    }

    #[test]
    fn test_register_rejects_missing_sensor() {
        let mut source = ManualSource::new(&[SensorKind::RotationVector]);
        let err = source
            .register(&[SensorKind::Gyroscope], Arc::new(Counter::default()))
            .unwrap_err();
        assert!(matches!(err, GestureError::SensorUnavailable(SensorKind::Gyroscope)));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(SensorKind::GameRotationVector.to_string(), "game rotation vector");
        assert_eq!(SensorKind::Accelerometer.to_string(), "accelerometer");
    }
}
