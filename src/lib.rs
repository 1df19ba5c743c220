//! Wrist-worn gesture engine: turns orientation, gyroscope and accelerometer
//! streams into a continuous aim angle over a ring of arcs plus discrete
//! Select / Delete events.

pub mod aim;
pub mod calibration;
pub mod config;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod recording;
pub mod replay;
pub mod sensors;
pub mod smoothing;
pub mod stats;
pub mod types;

pub use aim::{arc_index, AimConfig, AimEstimator, AimMode, ReachAssist};
pub use calibration::{CalibrationOffset, CalibrationStore};
pub use config::{EngineConfig, SelectSource};
pub use engine::{GestureEngine, GestureStreams};
pub use error::{GResult, GestureError};
pub use replay::{replay, ReplayReport};
pub use sensors::{ManualSource, SampleInjector, SensorKind, SensorListener, SensorSource};
pub use stats::StatsSnapshot;
pub use types::{AimUpdate, DetectorKind, GestureEvent, GestureKind, SensorSample};
