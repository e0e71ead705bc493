//! Monitor configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unread duration after which a running idle-timeout session stops itself.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 30_000;

/// How long a start attempt may wait for its first reading.
pub const DEFAULT_START_TIMEOUT_MS: u64 = 2_000;

/// Which power strategy the monitor follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MonitorMode {
    /// Hold wake-locks while running; queries never start the sensor.
    WakeLock,

    /// Queries start the sensor on demand; unread sessions stop themselves.
    #[default]
    IdleTimeout,
}

/// Configuration for a [`ProximityMonitor`](crate::ProximityMonitor).
///
/// Deserialises from the `plugins.proximity` section of `tauri.conf.json`;
/// every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorConfig {
    pub mode: MonitorMode,
    pub idle_timeout_ms: u64,
    pub start_timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            mode: MonitorMode::default(),
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            start_timeout_ms: DEFAULT_START_TIMEOUT_MS,
        }
    }
}

impl MonitorConfig {
    pub fn wake_lock() -> Self {
        Self {
            mode: MonitorMode::WakeLock,
            ..Default::default()
        }
    }

    pub fn idle_timeout(idle_timeout_ms: u64) -> Self {
        Self {
            mode: MonitorMode::IdleTimeout,
            idle_timeout_ms,
            ..Default::default()
        }
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }
}
