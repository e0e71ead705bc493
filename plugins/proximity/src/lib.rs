//! Tauri plugin exposing the device proximity sensor to the webview.
//!
//! Register with `.plugin(tauri_plugin_proximity::init())`; behaviour is read
//! from `plugins.proximity` in `tauri.conf.json`:
//!
//! ```json
//! { "plugins": { "proximity": { "mode": "idleTimeout", "idleTimeoutMs": 30000 } } }
//! ```
//!
//! Monitor events are pushed to the webview on [`EVENT_TOPIC`].
//!
//! The monitor is shared by every webview of the app. It is stopped when the
//! last webview that started or queried it navigates away, and when the
//! plugin is dropped.

use std::sync::Arc;

use proximity_core::{new_event_callback, platform::PlatformProvider, ProximityMonitor};
use serde::de::DeserializeOwned;
use tauri::{
    plugin::{Builder, TauriPlugin},
    AppHandle, Manager, Runtime,
};

use crate::owners::SessionOwners;

mod commands;
mod error;
mod events;
mod owners;

pub use error::{Error, Result};
pub use events::{ProximityEvent, EVENT_TOPIC};
pub use proximity_core::{
    Command, MonitorConfig, MonitorMode, Proximity, Response, SensorSession, SessionState,
};

const PLUGIN_NAME: &str = "proximity";

/// Initialise with the configuration from `tauri.conf.json`.
pub fn init<R: Runtime>() -> TauriPlugin<R, Option<MonitorConfig>> {
    build(|config: &Option<MonitorConfig>| config.clone().unwrap_or_default())
}

/// Initialise with an explicit configuration, ignoring `tauri.conf.json`.
pub fn init_with_config<R: Runtime>(config: MonitorConfig) -> TauriPlugin<R> {
    build(move |_: &()| config)
}

fn build<R, C, F>(resolve: F) -> TauriPlugin<R, C>
where
    R: Runtime,
    C: DeserializeOwned + 'static,
    F: FnOnce(&C) -> MonitorConfig + Send + 'static,
{
    Builder::<R, C>::new(PLUGIN_NAME)
        .invoke_handler(tauri::generate_handler![
            commands::start,
            commands::stop,
            commands::get_proximity_state,
            commands::get_state,
            commands::get_session,
            commands::set_timeout,
            commands::get_timeout,
            commands::execute,
        ])
        .setup(move |app, api| {
            let config = resolve(api.config());
            manage_monitor(app, config);
            Ok(())
        })
        .on_navigation(|webview, _url| {
            let last_owner = webview
                .try_state::<SessionOwners>()
                .is_some_and(|owners| owners.release(webview.label()));
            if last_owner {
                tracing::debug!(webview = webview.label(), "owning webview navigated away");
                stop_monitor(webview);
            }
            true
        })
        .on_drop(|app| stop_monitor(&app))
        .build()
}

fn manage_monitor<R: Runtime>(app: &AppHandle<R>, config: MonitorConfig) {
    tracing::info!(mode = ?config.mode, "proximity plugin setup");

    let provider = Arc::new(PlatformProvider::new());
    let monitor = ProximityMonitor::new(config, provider.clone(), provider);

    let app_handle = app.clone();
    monitor.set_listener(new_event_callback(move |event| {
        events::forward(&app_handle, event);
    }));

    app.manage(monitor);
    app.manage(SessionOwners::default());
}

/// Release the sensor, as a fresh plugin instance would find it.
fn stop_monitor<R: Runtime, M: Manager<R>>(manager: &M) {
    if let Some(monitor) = manager.try_state::<ProximityMonitor>() {
        monitor.stop();
    }
}
