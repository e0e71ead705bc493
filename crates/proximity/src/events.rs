use serde::Serialize;
use std::sync::Arc;

use crate::state::{Proximity, SessionState};

/// Why a start attempt ended in `FailedToStart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StartFailure {
    NoSensor,
    Timeout,
}

/// Notifications pushed by the monitor as the session changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum MonitorEvent {
    #[serde(rename = "stateChanged")]
    StateChanged { state: SessionState },
    #[serde(rename = "proximityChanged")]
    ProximityChanged { proximity: Proximity },
    #[serde(rename = "startFailed")]
    StartFailed { reason: StartFailure },
}

pub type EventCallback = Arc<dyn Fn(MonitorEvent) + Send + Sync + 'static>;

pub fn new_event_callback<F>(f: F) -> EventCallback
where
    F: Fn(MonitorEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}
