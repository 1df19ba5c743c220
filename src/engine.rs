//! Gesture engine: fans sensor samples out to the aim estimator and motion
//! detectors and publishes their outputs on bounded channels.
//!
//! Each sensor's state sits behind its own mutex, so orientation, gyroscope and
//! accelerometer callbacks may run concurrently on different threads. The only
//! cross-sensor state is the calibration offset, the latest aim update and
//! the output senders.

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::aim::AimEstimator;
use crate::calibration::{CalibrationOffset, CalibrationStore};
use crate::config::EngineConfig;
use crate::detectors::{BurstDetector, Detection, MotionDetector, ShakeDetector};
use crate::error::{lock_poisoned, GResult, GestureError};
use crate::sensors::{SensorKind, SensorListener, SensorSource};
use crate::smoothing::ExpSmoother;
use crate::stats::{EngineStats, StatsSnapshot};
use crate::types::{
    is_finite_rotation, AimUpdate, DetectorKind, GestureEvent, GestureKind, Rotation, SensorSample,
    Vec3,
};

/// Receiving ends handed to the application by [`GestureEngine::start`].
///
/// Both channels disconnect when the engine stops.
pub struct GestureStreams {
    pub aim: Receiver<AimUpdate>,
    pub gestures: Receiver<GestureEvent>,
}

struct Outputs {
    aim: Sender<AimUpdate>,
    gestures: Sender<GestureEvent>,
}

/// One detector plus the smoothing applied to its raw input vector
struct DetectorChannel {
    input: ExpSmoother<Vec3>,
    detector: Box<dyn MotionDetector>,
}

impl DetectorChannel {
    fn new(alpha: f64, detector: Box<dyn MotionDetector>) -> Self {
        Self {
            input: ExpSmoother::new(alpha),
            detector,
        }
    }

    fn feed(&mut self, raw: Vec3, timestamp_ns: i64) -> Option<Detection> {
        let smoothed = self.input.update(raw);
        self.detector.update(smoothed.norm(), timestamp_ns)
    }
}

/// Per-run processing state; registered with the sensor source as its listener
struct EngineCore {
    live: AtomicBool,
    calibration: Arc<CalibrationStore>,
    stats: Arc<EngineStats>,
    aim: Mutex<AimEstimator>,
    gyro: Mutex<Vec<DetectorChannel>>,
    accel: Mutex<Vec<DetectorChannel>>,
    last_aim: Arc<Mutex<Option<AimUpdate>>>,
    outputs: RwLock<Option<Outputs>>,
}

impl EngineCore {
    fn new(
        config: &EngineConfig,
        calibration: Arc<CalibrationStore>,
        stats: Arc<EngineStats>,
        last_aim: Arc<Mutex<Option<AimUpdate>>>,
    ) -> Self {
        let mut gyro = Vec::new();
        if config.select_source.uses_flick() {
            gyro.push(DetectorChannel::new(
                config.flick.input_alpha,
                Box::new(BurstDetector::new(DetectorKind::Flick, config.flick.clone())),
            ));
        }

        let mut accel = Vec::new();
        if config.select_source.uses_clench() {
            accel.push(DetectorChannel::new(
                config.clench.input_alpha,
                Box::new(BurstDetector::new(DetectorKind::Clench, config.clench.clone())),
            ));
        }
        if config.delete_enabled {
            accel.push(DetectorChannel::new(
                config.shake.input_alpha,
                Box::new(ShakeDetector::new(config.shake.clone())),
            ));
        }

        let kinds = |channels: &[DetectorChannel]| -> Vec<DetectorKind> {
            channels.iter().map(|c| c.detector.kind()).collect()
        };
        debug!(
            "Detectors: gyro {:?}, accel {:?}",
            kinds(&gyro),
            kinds(&accel)
        );

        Self {
            live: AtomicBool::new(false),
            calibration,
            stats,
            aim: Mutex::new(AimEstimator::new(config.aim.clone(), config.arc_count)),
            gyro: Mutex::new(gyro),
            accel: Mutex::new(accel),
            last_aim,
            outputs: RwLock::new(None),
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn on_orientation(&self, rotation: &Rotation, timestamp_ns: i64) {
        self.stats.record_orientation();
        if !is_finite_rotation(rotation) {
            self.stats.record_rejected();
            return;
        }

        let update = {
            let mut aim = match self.aim.lock() {
                Ok(aim) => aim,
                Err(_) => {
                    error!("Aim estimator lock poisoned, discarding orientation sample");
                    return;
                }
            };
            // Read under the aim lock so a concurrent calibrate cannot interleave
            let offset = match self.calibration.offset() {
                Ok(offset) => offset,
                Err(e) => {
                    error!("{}, discarding orientation sample", e);
                    return;
                }
            };
            aim.update(rotation, timestamp_ns, &offset)
        };

        if let Some(update) = update {
            if let Ok(mut last) = self.last_aim.lock() {
                *last = Some(update);
            }
            self.stats.record_aim();
            self.deliver("aim", |outputs| outputs.aim.try_send(update));
        }
    }

    fn on_impulse(&self, channels: &Mutex<Vec<DetectorChannel>>, sensor: &str, raw: Vec3, timestamp_ns: i64) {
        if !raw.iter().all(|c| c.is_finite()) {
            self.stats.record_rejected();
            return;
        }

        let detections: Vec<Detection> = {
            let mut channels = match channels.lock() {
                Ok(channels) => channels,
                Err(_) => {
                    error!("{} detector lock poisoned, discarding sample", sensor);
                    return;
                }
            };
            channels
                .iter_mut()
                .filter_map(|channel| channel.feed(raw, timestamp_ns))
                .collect()
        };

        for detection in detections {
            self.publish(detection);
        }
    }

    fn current_arc(&self) -> Option<usize> {
        self.last_aim.lock().ok().and_then(|last| last.map(|u| u.arc))
    }

    fn publish(&self, detection: Detection) {
        let arc = match detection.kind {
            GestureKind::Select => {
                self.stats.record_select();
                self.current_arc()
            }
            GestureKind::Delete => {
                self.stats.record_delete();
                None
            }
        };
        let event = GestureEvent {
            kind: detection.kind,
            detector: detection.detector,
            arc,
            magnitude: detection.magnitude,
            timestamp_ns: detection.timestamp_ns,
        };
        debug!(
            "{:?} from {:?} at {} ns (arc {:?})",
            event.kind, event.detector, event.timestamp_ns, event.arc
        );
        self.deliver("gesture", |outputs| outputs.gestures.try_send(event));
    }

    /// Non-blocking send; a full channel drops the item
    fn deliver<T, F>(&self, stream: &str, send: F)
    where
        F: FnOnce(&Outputs) -> Result<(), TrySendError<T>>,
    {
        if !self.is_live() {
            return;
        }
        let outputs = match self.outputs.read() {
            Ok(outputs) => outputs,
            Err(_) => {
                error!("Output lock poisoned, discarding {} output", stream);
                return;
            }
        };
        let Some(outputs) = outputs.as_ref() else {
            return;
        };
        match send(outputs) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.stats.record_dropped();
                if dropped == 1 || dropped % 100 == 0 {
                    warn!(
                        "{} channel full, dropping output ({} dropped so far)",
                        stream, dropped
                    );
                }
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    fn open(&self, outputs: Outputs) -> GResult<()> {
        let mut slot = self.outputs.write().map_err(|_| lock_poisoned("output"))?;
        *slot = Some(outputs);
        self.live.store(true, Ordering::Release);
        Ok(())
    }

    /// After this returns no callback can emit, even one already in flight
    fn close(&self) {
        self.live.store(false, Ordering::Release);
        let mut slot = self.outputs.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }
}

impl SensorListener for EngineCore {
    fn on_sample(&self, sample: SensorSample) {
        if !self.is_live() {
            return;
        }
        match sample {
            SensorSample::Orientation {
                rotation,
                timestamp_ns,
            } => self.on_orientation(&rotation, timestamp_ns),
            SensorSample::AngularVelocity {
                omega,
                timestamp_ns,
            } => {
                self.stats.record_gyro();
                self.on_impulse(&self.gyro, "gyro", omega, timestamp_ns);
            }
            SensorSample::LinearAcceleration {
                accel,
                timestamp_ns,
            } => {
                self.stats.record_accel();
                self.on_impulse(&self.accel, "accel", accel, timestamp_ns);
            }
        }
    }
}

struct Session {
    core: Arc<EngineCore>,
    source: Box<dyn SensorSource>,
}

/// Composition root. One instance per device; `start`/`stop` may be repeated.
///
/// The calibration offset and statistics survive restarts; estimator and
/// detector state are rebuilt on every `start`.
pub struct GestureEngine {
    config: EngineConfig,
    calibration: Arc<CalibrationStore>,
    stats: Arc<EngineStats>,
    last_aim: Arc<Mutex<Option<AimUpdate>>>,
    session: Mutex<Option<Session>>,
}

impl GestureEngine {
    pub fn new(config: EngineConfig) -> GResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            calibration: Arc::new(CalibrationStore::new()),
            stats: Arc::new(EngineStats::new()),
            last_aim: Arc::new(Mutex::new(None)),
            session: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Sensors this configuration needs from `source`, orientation first
    pub fn required_sensors(&self, source: &dyn SensorSource) -> GResult<Vec<SensorKind>> {
        let orientation = [SensorKind::GameRotationVector, SensorKind::RotationVector]
            .into_iter()
            .find(|kind| source.supports(*kind))
            .ok_or(GestureError::SensorUnavailable(SensorKind::RotationVector))?;
        let mut kinds = vec![orientation];

        if self.config.select_source.uses_flick() {
            kinds.push(SensorKind::Gyroscope);
        }
        if self.config.select_source.uses_clench() || self.config.delete_enabled {
            kinds.push(SensorKind::Accelerometer);
        }
        if let Some(missing) = kinds.iter().find(|kind| !source.supports(**kind)) {
            return Err(GestureError::SensorUnavailable(*missing));
        }
        Ok(kinds)
    }

    /// Register with `source` and begin publishing aim updates and gestures
    pub fn start(&self, mut source: Box<dyn SensorSource>) -> GResult<GestureStreams> {
        let mut session = self.session.lock().map_err(|_| lock_poisoned("session"))?;
        if session.is_some() {
            return Err(GestureError::AlreadyRunning);
        }

        let kinds = self.required_sensors(source.as_ref())?;
        *self.last_aim.lock().map_err(|_| lock_poisoned("aim"))? = None;
        let core = Arc::new(EngineCore::new(
            &self.config,
            Arc::clone(&self.calibration),
            Arc::clone(&self.stats),
            Arc::clone(&self.last_aim),
        ));

        let (aim_tx, aim_rx) = bounded(self.config.channel_capacity);
        let (gesture_tx, gesture_rx) = bounded(self.config.channel_capacity);
        core.open(Outputs {
            aim: aim_tx,
            gestures: gesture_tx,
        })?;

        let listener: Arc<dyn SensorListener> = core.clone();
        if let Err(e) = source.register(&kinds, listener) {
            core.close();
            source.unregister_all();
            return Err(e);
        }

        info!(
            "Gesture engine started: sensors {:?}, select via {:?}, delete {}",
            kinds,
            self.config.select_source,
            if self.config.delete_enabled { "on" } else { "off" }
        );
        *session = Some(Session { core, source });

        Ok(GestureStreams {
            aim: aim_rx,
            gestures: gesture_rx,
        })
    }

    /// Unregister from the sensor source and disconnect both streams.
    /// Safe to call repeatedly or before `start`.
    pub fn stop(&self) {
        let taken = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut session) = taken {
            session.core.close();
            session.source.unregister_all();
            info!("Gesture engine stopped: {:?}", self.stats.snapshot());
        }
    }

    pub fn is_running(&self) -> bool {
        self.session
            .lock()
            .map(|session| session.is_some())
            .unwrap_or(false)
    }

    /// Capture the current smoothed pose as the neutral offset.
    ///
    /// Before the first orientation sample (or while stopped) the stored offset
    /// is left unchanged and returned as is.
    pub fn calibrate(&self) -> GResult<CalibrationOffset> {
        let core = self
            .session
            .lock()
            .map_err(|_| lock_poisoned("session"))?
            .as_ref()
            .map(|session| Arc::clone(&session.core));
        let Some(core) = core else {
            warn!("Calibrate ignored: engine not running");
            return self.calibration.offset();
        };

        let mut aim = core.aim.lock().map_err(|_| lock_poisoned("aim"))?;
        match aim.capture() {
            Some(offset) => {
                self.calibration.set(offset)?;
                aim.on_calibrated();
                self.stats.record_calibration();
                info!(
                    "Calibrated neutral pose: {:?} (calibration #{})",
                    offset,
                    self.calibration.generation()
                );
                Ok(offset)
            }
            None => {
                info!("Calibrate before first orientation sample, keeping current offset");
                self.calibration.offset()
            }
        }
    }

    pub fn calibration_offset(&self) -> GResult<CalibrationOffset> {
        self.calibration.offset()
    }

    /// Most recent aim update of the current or last run, whether or not it
    /// made it through the aim channel
    pub fn last_aim(&self) -> Option<AimUpdate> {
        self.last_aim.lock().ok().and_then(|last| *last)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for GestureEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
