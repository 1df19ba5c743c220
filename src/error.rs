use thiserror::Error;

use crate::sensors::SensorKind;

/// Gesture engine error types
#[derive(Error, Debug)]
pub enum GestureError {
    #[error("Engine already running")]
    AlreadyRunning,

    #[error("Required sensor unavailable: {0}")]
    SensorUnavailable(SensorKind),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed recording: {0}")]
    Recording(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for engine operations
pub type GResult<T> = Result<T, GestureError>;

/// Shorthand for a poisoned-lock error on a named piece of engine state
pub(crate) fn lock_poisoned(what: &str) -> GestureError {
    GestureError::Internal(format!("Failed to acquire {} lock", what))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GestureError::SensorUnavailable(SensorKind::Gyroscope);
        assert_eq!(err.to_string(), "Required sensor unavailable: gyroscope");

        let err = lock_poisoned("aim");
        assert_eq!(err.to_string(), "Internal error: Failed to acquire aim lock");
    }

    #[test]
    fn test_json_error_converts() {
        let parse: Result<u32, _> = serde_json::from_str("not json");
        let err: GestureError = parse.unwrap_err().into();
        assert!(matches!(err, GestureError::Json(_)));
    }
}
