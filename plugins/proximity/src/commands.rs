use proximity_core::{Command, Proximity, ProximityMonitor, Response, SensorSession, SessionState};
use tauri::{command, Runtime, State, Webview};

use crate::error::Result;
use crate::owners::SessionOwners;

#[command]
pub async fn start<R: Runtime>(
    webview: Webview<R>,
    monitor: State<'_, ProximityMonitor>,
    owners: State<'_, SessionOwners>,
) -> Result<SessionState> {
    owners.claim(webview.label());
    Ok(monitor.start())
}

#[command]
pub async fn stop(monitor: State<'_, ProximityMonitor>) -> Result<()> {
    monitor.stop();
    Ok(())
}

/// Current proximity value (1 near, 0 far).
///
/// In idle-timeout mode this starts the sensor when needed. With `wait` set,
/// a call that had to start the sensor resolves only after the first reading
/// and fails if none arrives within the start timeout; otherwise the cached
/// value is returned at once and a timeout is reported as a `startFailed`
/// event.
#[command]
pub async fn get_proximity_state<R: Runtime>(
    webview: Webview<R>,
    monitor: State<'_, ProximityMonitor>,
    owners: State<'_, SessionOwners>,
    wait: Option<bool>,
) -> Result<Proximity> {
    owners.claim(webview.label());
    let reply = monitor.query()?;

    match reply.start_check {
        Some(check) if wait.unwrap_or(false) => {
            check.wait().await?;
            Ok(monitor.get_proximity())
        }
        _ => Ok(reply.proximity),
    }
}

#[command]
pub async fn get_state(monitor: State<'_, ProximityMonitor>) -> Result<SessionState> {
    Ok(monitor.state())
}

#[command]
pub async fn get_session(monitor: State<'_, ProximityMonitor>) -> Result<SensorSession> {
    Ok(monitor.session())
}

#[command]
pub async fn set_timeout(monitor: State<'_, ProximityMonitor>, ms: u64) -> Result<()> {
    tracing::debug!(ms, "idle timeout updated");
    monitor.set_idle_timeout_ms(ms);
    Ok(())
}

#[command]
pub async fn get_timeout(monitor: State<'_, ProximityMonitor>) -> Result<u64> {
    Ok(monitor.idle_timeout_ms())
}

/// Run a tagged command, e.g. `{"action": "setTimeout", "ms": 5000}`.
#[command]
pub async fn execute<R: Runtime>(
    webview: Webview<R>,
    monitor: State<'_, ProximityMonitor>,
    owners: State<'_, SessionOwners>,
    command: Command,
) -> Result<Response> {
    if matches!(command, Command::Start | Command::GetProximityState) {
        owners.claim(webview.label());
    }
    let reply = monitor.execute(command)?;
    Ok(reply.response)
}
