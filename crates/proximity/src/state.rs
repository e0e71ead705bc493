//! Session state structures.
//!
//! Pure domain types - no I/O, no platform dependencies. Both enums travel
//! over the wire as the small integers the web layer has always used.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_IDLE_TIMEOUT_MS;

/// Lifecycle of the sensor subscription (not of the reading itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SessionState {
    #[default]
    Stopped,
    /// Registered with the platform, waiting for the first reading.
    Starting,
    /// At least one reading arrived since the last start.
    Running,
    FailedToStart,
}

impl SessionState {
    pub fn code(self) -> u8 {
        match self {
            SessionState::Stopped => 0,
            SessionState::Starting => 1,
            SessionState::Running => 2,
            SessionState::FailedToStart => 3,
        }
    }

    /// Starting or Running: a subscription exists and `start` is a no-op.
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Starting | SessionState::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Stopped => "stopped",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::FailedToStart => "failed_to_start",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<SessionState> for u8 {
    fn from(state: SessionState) -> Self {
        state.code()
    }
}

impl TryFrom<u8> for SessionState {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(SessionState::Stopped),
            1 => Ok(SessionState::Starting),
            2 => Ok(SessionState::Running),
            3 => Ok(SessionState::FailedToStart),
            other => Err(format!("unknown session state code {}", other)),
        }
    }
}

/// Binary proximity reading. Near is 1 and Far is 0 on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Proximity {
    Near,
    #[default]
    Far,
}

impl Proximity {
    /// Sensors report a distance; exactly zero means something is covering it.
    pub fn from_raw(raw: f32) -> Self {
        if raw == 0.0 {
            Proximity::Near
        } else {
            Proximity::Far
        }
    }

    pub fn value(self) -> u8 {
        match self {
            Proximity::Near => 1,
            Proximity::Far => 0,
        }
    }

    pub fn is_near(self) -> bool {
        self == Proximity::Near
    }
}

impl From<Proximity> for u8 {
    fn from(proximity: Proximity) -> Self {
        proximity.value()
    }
}

impl TryFrom<u8> for Proximity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Proximity::Far),
            1 => Ok(Proximity::Near),
            other => Err(format!("unknown proximity value {}", other)),
        }
    }
}

/// Snapshot of the single sensor session a monitor owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSession {
    pub state: SessionState,

    /// Last observed reading (Far until the first event)
    pub proximity: Proximity,

    /// Wall-clock ms of the most recent hardware event
    pub last_event_ms: i64,

    /// Wall-clock ms of the most recent external read
    pub last_read_ms: i64,

    /// Unread duration after which a running session stops itself
    pub idle_timeout_ms: u64,
}

impl Default for SensorSession {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT_MS)
    }
}

impl SensorSession {
    pub fn new(idle_timeout_ms: u64) -> Self {
        Self {
            state: SessionState::Stopped,
            proximity: Proximity::Far,
            last_event_ms: 0,
            last_read_ms: 0,
            idle_timeout_ms,
        }
    }

    /// True when the latest event came more than the idle timeout after the
    /// latest read.
    pub fn idle_elapsed(&self) -> bool {
        let unread_ms = self.last_event_ms.saturating_sub(self.last_read_ms);
        unread_ms > i64::try_from(self.idle_timeout_ms).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_reading_is_near() {
        assert_eq!(Proximity::from_raw(0.0), Proximity::Near);
        assert_eq!(Proximity::from_raw(5.0), Proximity::Far);
        assert_eq!(Proximity::from_raw(0.5), Proximity::Far);
    }

    #[test]
    fn test_wire_values() {
        assert_eq!(serde_json::to_string(&Proximity::Near).unwrap(), "1");
        assert_eq!(serde_json::to_string(&Proximity::Far).unwrap(), "0");
        assert_eq!(
            serde_json::to_string(&SessionState::FailedToStart).unwrap(),
            "3"
        );

        let state: SessionState = serde_json::from_str("2").unwrap();
        assert_eq!(state, SessionState::Running);
        assert!(serde_json::from_str::<SessionState>("7").is_err());
    }

    #[test]
    fn test_active_states() {
        assert!(SessionState::Starting.is_active());
        assert!(SessionState::Running.is_active());
        assert!(!SessionState::Stopped.is_active());
        assert!(!SessionState::FailedToStart.is_active());
    }

    #[test]
    fn test_new_session_defaults_to_far() {
        let session = SensorSession::default();
        assert_eq!(session.state, SessionState::Stopped);
        assert_eq!(session.proximity, Proximity::Far);
        assert_eq!(session.idle_timeout_ms, DEFAULT_IDLE_TIMEOUT_MS);
    }

    #[test]
    fn test_idle_elapsed_is_strict() {
        let mut session = SensorSession::new(1000);
        session.last_read_ms = 10_000;

        session.last_event_ms = 11_000;
        assert!(!session.idle_elapsed());

        session.last_event_ms = 11_001;
        assert!(session.idle_elapsed());
    }
}
