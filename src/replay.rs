//! Offline replay of a recording through a live engine.
//!
//! Samples are pushed through a [`ManualSource`] and processed synchronously,
//! so the output channels are drained after every record and nothing is lost
//! to a full channel however long the recording is.

use log::debug;
use serde::Serialize;

use crate::calibration::CalibrationOffset;
use crate::config::EngineConfig;
use crate::engine::GestureEngine;
use crate::error::GResult;
use crate::recording::Record;
use crate::sensors::ManualSource;
use crate::stats::StatsSnapshot;
use crate::types::{AimUpdate, GestureEvent};

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub records: usize,
    pub stats: StatsSnapshot,
    pub aim_updates_received: usize,
    pub final_aim: Option<AimUpdate>,
    pub calibrations: Vec<CalibrationOffset>,
    pub events: Vec<GestureEvent>,
}

/// Run `records` in file order; `on_event` sees each gesture as it is drained
pub fn replay<F>(config: &EngineConfig, records: &[Record], mut on_event: F) -> GResult<ReplayReport>
where
    F: FnMut(&GestureEvent),
{
    let engine = GestureEngine::new(config.clone())?;
    let source = ManualSource::full();
    let injector = source.injector();
    let streams = engine.start(Box::new(source))?;

    let mut aim_updates_received = 0;
    let mut calibrations = Vec::new();
    let mut events = Vec::new();

    for record in records {
        match record {
            Record::Sample(sample) => {
                injector.push(*sample);
            }
            Record::Calibrate { timestamp_ns } => {
                let offset = engine.calibrate()?;
                debug!("Replay calibrate at {} ns: {:?}", timestamp_ns, offset);
                calibrations.push(offset);
            }
        }
        aim_updates_received += streams.aim.try_iter().count();
        for event in streams.gestures.try_iter() {
            on_event(&event);
            events.push(event);
        }
    }

    engine.stop();
    Ok(ReplayReport {
        records: records.len(),
        stats: engine.stats(),
        aim_updates_received,
        final_aim: engine.last_aim(),
        calibrations,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GestureKind, SensorSample};

    const MS: i64 = 1_000_000;

    /// Wrist rolled 0.5 rad about y, screen normal pointing east
    fn east(t_ns: i64) -> Record {
        let half = 0.25f64;
        Record::Sample(SensorSample::orientation(0.0, half.sin(), 0.0, half.cos(), t_ns))
    }

    #[test]
    fn test_long_replay_keeps_every_output() {
        let mut records: Vec<Record> = (0..300).map(|i| east(i * 10 * MS)).collect();
        records.push(Record::Calibrate { timestamp_ns: 2_995 * MS });
        records.push(east(2_999 * MS));
        let omega = [0.0, 2.0, 3.5, 2.5, 1.0, 0.5, 0.2, 0.0, 0.0, 0.0];
        for (i, w) in omega.iter().enumerate() {
            let t = 3_000 * MS + i as i64 * 5 * MS;
            records.push(Record::Sample(SensorSample::angular_velocity(0.0, 0.0, *w, t)));
        }

        let mut seen = 0;
        let report = replay(&EngineConfig::default(), &records, |_| seen += 1).unwrap();

        assert!(records.len() > EngineConfig::default().channel_capacity);
        assert_eq!(report.aim_updates_received, 301);
        assert_eq!(report.stats.aim_updates, 301);
        assert_eq!(report.stats.dropped_outputs, 0);
        assert_eq!(report.final_aim.unwrap().timestamp_ns, 2_999 * MS);
        assert_eq!(report.calibrations.len(), 1);
        assert_eq!(seen, 1);
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].kind, GestureKind::Select);
        // Calibrated on the same pose, so the flick lands on the neutral arc
        assert_eq!(report.events[0].arc, Some(0));
    }

    #[test]
    fn test_empty_recording() {
        let report = replay(&EngineConfig::default(), &[], |_| {}).unwrap();
        assert_eq!(report.records, 0);
        assert!(report.final_aim.is_none());
        assert!(report.events.is_empty());
    }
}
