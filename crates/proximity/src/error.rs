//! Error types for the proximity monitor.

use thiserror::Error;

/// Errors surfaced by the proximity monitor and its platform providers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProximityError {
    /// The platform enumerated no proximity sensor.
    #[error("no proximity sensor available")]
    NoSensorAvailable,

    /// The sensor was registered but never reported a reading.
    #[error("proximity sensor did not report within {timeout_ms}ms of starting")]
    StartTimeout { timeout_ms: u64 },

    /// The session was stopped while a start attempt was still pending.
    #[error("proximity sensor was stopped before it reported")]
    StartCancelled,

    /// A platform service call failed.
    #[error("platform error: {0}")]
    Platform(String),
}

pub type Result<T> = std::result::Result<T, ProximityError>;
