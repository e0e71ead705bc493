//! Typed request surface.
//!
//! Hosts hand the monitor a [`Command`] instead of an action string; the
//! JSON form is `{"action": "getProximityState"}` or
//! `{"action": "setTimeout", "ms": 5000}`.

use serde::{Deserialize, Serialize};

use crate::attempt::StartCheck;
use crate::error::Result;
use crate::monitor::ProximityMonitor;
use crate::state::{Proximity, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    Start,
    Stop,
    GetProximityState,
    GetState,
    SetTimeout { ms: u64 },
    GetTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Response {
    State(SessionState),
    Stopped,
    Proximity(Proximity),
    Timeout(u64),
}

/// Response to a command plus the pending start attempt, if the command armed one.
#[derive(Debug)]
pub struct Reply {
    pub response: Response,
    pub start_check: Option<StartCheck>,
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self {
            response,
            start_check: None,
        }
    }
}

impl ProximityMonitor {
    /// Run one command against the session.
    ///
    /// # Errors
    ///
    /// Only `GetProximityState` can fail, see [`ProximityMonitor::query`].
    pub fn execute(&self, command: Command) -> Result<Reply> {
        tracing::debug!(?command, "execute");

        let reply = match command {
            Command::Start => Response::State(self.start()).into(),
            Command::Stop => {
                self.stop();
                Response::Stopped.into()
            }
            Command::GetProximityState => {
                let query = self.query()?;
                Reply {
                    response: Response::Proximity(query.proximity),
                    start_check: query.start_check,
                }
            }
            Command::GetState => Response::State(self.state()).into(),
            Command::SetTimeout { ms } => {
                self.set_idle_timeout_ms(ms);
                Response::Timeout(ms).into()
            }
            Command::GetTimeout => Response::Timeout(self.idle_timeout_ms()).into(),
        };

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::memory::{InMemoryPowerService, InMemorySensorService};
    use std::sync::Arc;

    fn monitor() -> ProximityMonitor {
        ProximityMonitor::new(
            MonitorConfig::default(),
            Arc::new(InMemorySensorService::with_sensor("test")),
            Arc::new(InMemoryPowerService::new()),
        )
    }

    #[test]
    fn test_command_json() {
        let command: Command = serde_json::from_str(r#"{"action": "getProximityState"}"#).unwrap();
        assert_eq!(command, Command::GetProximityState);

        let command: Command =
            serde_json::from_str(r#"{"action": "setTimeout", "ms": 5000}"#).unwrap();
        assert_eq!(command, Command::SetTimeout { ms: 5000 });

        assert!(serde_json::from_str::<Command>(r#"{"action": "explode"}"#).is_err());
    }

    #[test]
    fn test_response_json() {
        let json = serde_json::to_value(Response::Proximity(Proximity::Near)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "proximity", "value": 1}));

        let json = serde_json::to_value(Response::Stopped).unwrap();
        assert_eq!(json, serde_json::json!({"type": "stopped"}));
    }

    #[test]
    fn test_timeout_commands() {
        let monitor = monitor();

        let reply = monitor.execute(Command::SetTimeout { ms: 1234 }).unwrap();
        assert_eq!(reply.response, Response::Timeout(1234));

        let reply = monitor.execute(Command::GetTimeout).unwrap();
        assert_eq!(reply.response, Response::Timeout(1234));
    }

    #[test]
    fn test_start_and_stop_commands() {
        let monitor = monitor();

        let reply = monitor.execute(Command::Start).unwrap();
        assert_eq!(reply.response, Response::State(SessionState::Starting));

        let reply = monitor.execute(Command::Stop).unwrap();
        assert_eq!(reply.response, Response::Stopped);

        let reply = monitor.execute(Command::GetState).unwrap();
        assert_eq!(reply.response, Response::State(SessionState::Stopped));
    }

    #[tokio::test]
    async fn test_get_proximity_state_arms_start_check() {
        let monitor = monitor();

        let reply = monitor.execute(Command::GetProximityState).unwrap();
        assert_eq!(reply.response, Response::Proximity(Proximity::Far));
        assert!(reply.start_check.is_some());
        assert_eq!(monitor.state(), SessionState::Starting);

        monitor.stop();
    }

    #[test]
    fn test_get_proximity_state_outside_runtime() {
        let config = MonitorConfig {
            start_timeout_ms: 20,
            ..MonitorConfig::default()
        };
        let sensors = Arc::new(InMemorySensorService::with_sensor("test"));
        let monitor = ProximityMonitor::new(
            config,
            sensors.clone(),
            Arc::new(InMemoryPowerService::new()),
        );

        let reply = monitor.execute(Command::GetProximityState).unwrap();
        assert_eq!(reply.response, Response::Proximity(Proximity::Far));
        let check = reply.start_check.unwrap();
        assert!(check.is_pending());
        assert_eq!(monitor.state(), SessionState::Starting);

        // The timer thread expires the attempt without any runtime.
        std::thread::sleep(std::time::Duration::from_millis(300));
        assert_eq!(monitor.state(), SessionState::FailedToStart);
        assert!(!check.is_pending());

        monitor.stop();
        assert!(!sensors.is_registered());
    }
}
