use proximity_core::MonitorEvent;
use serde::Serialize;
use tauri::{AppHandle, Emitter, Runtime};

/// Topic the webview listens on for monitor events.
pub const EVENT_TOPIC: &str = "proximity:event";

/// Monitor event as delivered to the webview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityEvent {
    #[serde(flatten)]
    pub event: MonitorEvent,
    pub ts_ms: i64,
}

impl From<MonitorEvent> for ProximityEvent {
    fn from(event: MonitorEvent) -> Self {
        Self {
            event,
            ts_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

pub(crate) fn forward<R: Runtime>(app: &AppHandle<R>, event: MonitorEvent) {
    let payload = ProximityEvent::from(event);
    if let Err(e) = app.emit(EVENT_TOPIC, &payload) {
        tracing::error!("failed to emit proximity event: {:?}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proximity_core::{Proximity, SessionState, StartFailure};

    #[test]
    fn test_payload_shape() {
        let payload = ProximityEvent {
            event: MonitorEvent::ProximityChanged {
                proximity: Proximity::Near,
            },
            ts_ms: 42,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"type": "proximityChanged", "proximity": 1, "tsMs": 42})
        );

        let payload = ProximityEvent {
            event: MonitorEvent::StateChanged {
                state: SessionState::FailedToStart,
            },
            ts_ms: 7,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"type": "stateChanged", "state": 3, "tsMs": 7})
        );
    }

    #[test]
    fn test_start_failure_payload() {
        let payload = ProximityEvent {
            event: MonitorEvent::StartFailed {
                reason: StartFailure::Timeout,
            },
            ts_ms: 0,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"type": "startFailed", "reason": "timeout", "tsMs": 0})
        );
    }
}
