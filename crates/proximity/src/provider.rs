//! Provider traits for the platform services the monitor consumes.
//!
//! These traits abstract platform-specific implementations,
//! allowing the session logic to remain pure and testable.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;

/// A proximity sensor as enumerated by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorInfo {
    /// Platform identifier used to register for readings
    pub id: String,

    /// Display name (e.g., "iio-sensor-proxy")
    pub name: String,
}

/// Receives raw sensor readings (distance, 0.0 when covered).
pub type ReadingCallback = Arc<dyn Fn(f32) + Send + Sync + 'static>;

pub fn new_reading_callback<F>(f: F) -> ReadingCallback
where
    F: Fn(f32) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Platform sensor enumeration and subscription.
pub trait SensorService: Send + Sync {
    /// List the proximity sensors currently available.
    fn proximity_sensors(&self) -> Vec<SensorInfo>;

    /// Start delivering readings for `sensor` to `callback`.
    ///
    /// Readings must be delivered from another thread or after this call
    /// returns, never from inside `register` itself.
    fn register(&self, sensor: &SensorInfo, callback: ReadingCallback) -> Result<()>;

    /// Stop delivering readings. Safe to call when nothing is registered.
    fn unregister(&self);
}

/// Wake-locks the monitor may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WakeLockKind {
    /// Turns the screen off while something is near, held for the whole session.
    ProximityScreenOff,
    /// Keeps the CPU awake, held while the reading is Near.
    Partial,
}

/// Why a wake-lock kind cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedReason {
    /// The platform does not offer this kind of wake-lock.
    NotAvailable,
    /// Asking the platform failed; the lock is treated as unavailable.
    ProbeFailed(String),
}

/// Result of probing the platform for a wake-lock kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeLockCapability {
    Supported,
    Unsupported(UnsupportedReason),
}

impl WakeLockCapability {
    pub fn is_supported(&self) -> bool {
        matches!(self, WakeLockCapability::Supported)
    }
}

/// Platform power management.
pub trait PowerService: Send + Sync {
    /// Report whether `kind` can be acquired on this device.
    fn capability(&self, kind: WakeLockKind) -> WakeLockCapability;

    fn acquire(&self, kind: WakeLockKind) -> Result<()>;

    fn release(&self, kind: WakeLockKind) -> Result<()>;
}

/// Null implementation for unsupported platforms: no sensors, no wake-locks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProvider;

impl NullProvider {
    pub fn new() -> Self {
        Self
    }
}

impl SensorService for NullProvider {
    fn proximity_sensors(&self) -> Vec<SensorInfo> {
        Vec::new()
    }

    fn register(&self, _sensor: &SensorInfo, _callback: ReadingCallback) -> Result<()> {
        Err(crate::ProximityError::NoSensorAvailable)
    }

    fn unregister(&self) {}
}

impl PowerService for NullProvider {
    fn capability(&self, _kind: WakeLockKind) -> WakeLockCapability {
        WakeLockCapability::Unsupported(UnsupportedReason::NotAvailable)
    }

    fn acquire(&self, _kind: WakeLockKind) -> Result<()> {
        Err(crate::ProximityError::Platform(
            "wake-locks are not available on this platform".to_string(),
        ))
    }

    fn release(&self, _kind: WakeLockKind) -> Result<()> {
        Ok(())
    }
}
