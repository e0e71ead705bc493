//! Linux backend.
//!
//! Readings come from iio-sensor-proxy over the system bus; the partial
//! wake-lock is a systemd-logind sleep inhibitor, held for as long as its
//! file descriptor stays open. There is no proximity screen-off lock on
//! Linux, so that kind is reported as unavailable.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use zbus::blocking::Connection;
use zbus::zvariant::OwnedFd;

use super::reader::forward_readings;
use crate::error::{ProximityError, Result};
use crate::provider::{
    PowerService, ReadingCallback, SensorInfo, SensorService, UnsupportedReason,
    WakeLockCapability, WakeLockKind,
};

const SENSOR_ID: &str = "net.hadess.SensorProxy";

#[zbus::proxy(
    interface = "net.hadess.SensorProxy",
    default_service = "net.hadess.SensorProxy",
    default_path = "/net/hadess/SensorProxy"
)]
trait SensorProxy {
    fn claim_proximity(&self) -> zbus::Result<()>;

    fn release_proximity(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn has_proximity(&self) -> zbus::Result<bool>;

    #[zbus(property)]
    fn proximity_near(&self) -> zbus::Result<bool>;
}

#[zbus::proxy(
    interface = "org.freedesktop.login1.Manager",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1"
)]
trait LoginManager {
    fn inhibit(&self, what: &str, who: &str, why: &str, mode: &str) -> zbus::Result<OwnedFd>;
}

fn platform_error(e: zbus::Error) -> ProximityError {
    ProximityError::Platform(e.to_string())
}

/// iio-sensor-proxy readings and logind wake-locks.
pub struct LinuxProvider {
    connection: Option<Connection>,
    /// Cancels the reader thread of the current registration.
    reader: Mutex<Option<CancellationToken>>,
    inhibitors: Mutex<HashMap<WakeLockKind, OwnedFd>>,
}

impl Default for LinuxProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LinuxProvider {
    pub fn new() -> Self {
        let connection = match Connection::system() {
            Ok(connection) => Some(connection),
            Err(e) => {
                tracing::warn!(error = %e, "system bus unavailable, proximity sensor disabled");
                None
            }
        };

        Self {
            connection,
            reader: Mutex::new(None),
            inhibitors: Mutex::new(HashMap::new()),
        }
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| ProximityError::Platform("system bus unavailable".to_string()))
    }

    fn reader(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.reader.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sensor_proxy(&self) -> Result<SensorProxyProxyBlocking<'static>> {
        SensorProxyProxyBlocking::new(self.connection()?).map_err(platform_error)
    }
}

impl SensorService for LinuxProvider {
    fn proximity_sensors(&self) -> Vec<SensorInfo> {
        let has_proximity = self
            .sensor_proxy()
            .and_then(|proxy| proxy.has_proximity().map_err(platform_error));

        match has_proximity {
            Ok(true) => vec![SensorInfo {
                id: SENSOR_ID.to_string(),
                name: "iio-sensor-proxy".to_string(),
            }],
            Ok(false) => Vec::new(),
            Err(e) => {
                tracing::debug!(error = %e, "iio-sensor-proxy not reachable");
                Vec::new()
            }
        }
    }

    fn register(&self, sensor: &SensorInfo, callback: ReadingCallback) -> Result<()> {
        self.sensor_proxy()?
            .claim_proximity()
            .map_err(platform_error)?;

        let connection = self.connection()?.inner().clone();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(|e| ProximityError::Platform(e.to_string()))?;

        let token = CancellationToken::new();
        if let Some(previous) = self.reader().replace(token.clone()) {
            previous.cancel();
        }
        let sensor_id = sensor.id.clone();

        std::thread::Builder::new()
            .name("proximity-iio".to_string())
            .spawn(move || {
                tracing::debug!(sensor = %sensor_id, "proximity reader started");

                runtime.block_on(async move {
                    let proxy = match SensorProxyProxy::new(&connection).await {
                        Ok(proxy) => proxy,
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to open iio-sensor-proxy");
                            return;
                        }
                    };

                    // Subscribe before the first read so no change slips between them.
                    let changes = proxy
                        .receive_proximity_near_changed()
                        .await
                        .filter_map(|change| async move {
                            match change.get().await {
                                Ok(near) => Some(near),
                                Err(e) => {
                                    tracing::warn!(error = %e, "failed to read ProximityNear");
                                    None
                                }
                            }
                        });
                    let initial = proxy.proximity_near().await.ok();

                    forward_readings(initial, changes, token, callback).await;
                });

                tracing::debug!(sensor = %sensor_id, "proximity reader stopped");
            })
            .map_err(|e| ProximityError::Platform(e.to_string()))?;

        Ok(())
    }

    fn unregister(&self) {
        if let Some(token) = self.reader().take() {
            token.cancel();
        }

        match self.sensor_proxy() {
            Ok(proxy) => {
                if let Err(e) = proxy.release_proximity() {
                    tracing::warn!(error = %e, "failed to release proximity claim");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to release proximity claim"),
        }
    }
}

impl PowerService for LinuxProvider {
    fn capability(&self, kind: WakeLockKind) -> WakeLockCapability {
        match kind {
            WakeLockKind::ProximityScreenOff => {
                WakeLockCapability::Unsupported(UnsupportedReason::NotAvailable)
            }
            WakeLockKind::Partial => match self.connection() {
                Ok(_) => WakeLockCapability::Supported,
                Err(e) => WakeLockCapability::Unsupported(UnsupportedReason::ProbeFailed(
                    e.to_string(),
                )),
            },
        }
    }

    fn acquire(&self, kind: WakeLockKind) -> Result<()> {
        if kind == WakeLockKind::ProximityScreenOff {
            return Err(ProximityError::Platform(
                "proximity screen-off wake-lock is not available on Linux".to_string(),
            ));
        }

        let manager = LoginManagerProxyBlocking::new(self.connection()?).map_err(platform_error)?;
        let fd = manager
            .inhibit(
                "sleep",
                "proximity",
                "An object is near the proximity sensor",
                "block",
            )
            .map_err(platform_error)?;

        let mut inhibitors = self.inhibitors.lock().unwrap_or_else(|e| e.into_inner());
        inhibitors.insert(kind, fd);
        Ok(())
    }

    fn release(&self, kind: WakeLockKind) -> Result<()> {
        let mut inhibitors = self.inhibitors.lock().unwrap_or_else(|e| e.into_inner());
        // Closing the descriptor ends the inhibitor.
        inhibitors.remove(&kind);
        Ok(())
    }
}
