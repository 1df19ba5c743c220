//! JSON-lines sensor recordings, optionally gzip-compressed.
//!
//! One record per line:
//!
//! ```text
//! {"type":"orientation","t_ns":0,"q":[0.0,0.0,0.0,1.0]}
//! {"type":"gyro","t_ns":5000000,"v":[0.1,2.9,0.0]}
//! {"type":"accel","t_ns":5000000,"v":[0.0,0.3,9.8]}
//! {"type":"calibrate","t_ns":6000000}
//! ```
//!
//! Orientation quaternions are `[x, y, z, w]`; a three-element rotation vector
//! gets its scalar part reconstructed.

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::{GResult, GestureError};
use crate::types::{scalar_part, SensorSample};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RecordLine {
    Orientation { t_ns: i64, q: Vec<f64> },
    Gyro { t_ns: i64, v: [f64; 3] },
    Accel { t_ns: i64, v: [f64; 3] },
    Calibrate { t_ns: i64 },
}

/// One replayable step of a recording
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Record {
    Sample(SensorSample),
    Calibrate { timestamp_ns: i64 },
}

impl Record {
    pub fn timestamp_ns(&self) -> i64 {
        match self {
            Record::Sample(sample) => sample.timestamp_ns(),
            Record::Calibrate { timestamp_ns } => *timestamp_ns,
        }
    }
}

/// Parse one non-empty line; `line_no` is 1-based and only used in errors
pub fn parse_line(line: &str, line_no: usize) -> GResult<Record> {
    let parsed: RecordLine = serde_json::from_str(line)
        .map_err(|e| GestureError::Recording(format!("line {}: {}", line_no, e)))?;

    let record = match parsed {
        RecordLine::Orientation { t_ns, q } => match q.as_slice() {
            [x, y, z, w] => Record::Sample(SensorSample::orientation(*x, *y, *z, *w, t_ns)),
            [x, y, z] => Record::Sample(SensorSample::orientation(
                *x,
                *y,
                *z,
                scalar_part(*x, *y, *z),
                t_ns,
            )),
            other => {
                return Err(GestureError::Recording(format!(
                    "line {}: orientation needs 3 or 4 components, got {}",
                    line_no,
                    other.len()
                )))
            }
        },
        RecordLine::Gyro { t_ns, v: [x, y, z] } => {
            Record::Sample(SensorSample::angular_velocity(x, y, z, t_ns))
        }
        RecordLine::Accel { t_ns, v: [x, y, z] } => {
            Record::Sample(SensorSample::linear_acceleration(x, y, z, t_ns))
        }
        RecordLine::Calibrate { t_ns } => Record::Calibrate { timestamp_ns: t_ns },
    };
    Ok(record)
}

pub fn read_records<R: Read>(reader: R) -> GResult<Vec<Record>> {
    let mut records = Vec::new();
    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        records.push(parse_line(trimmed, idx + 1)?);
    }
    Ok(records)
}

/// Load a recording, decompressing when the file ends in `.gz`
pub fn load_recording(path: &Path) -> GResult<Vec<Record>> {
    let file = File::open(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        read_records(GzDecoder::new(file))
    } else {
        read_records(file)
    }
}
