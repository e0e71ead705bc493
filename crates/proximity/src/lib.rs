//! Proximity sensor monitoring for the proximity bridge.
//!
//! This crate owns the single sensor session behind the plugin: it subscribes
//! to a binary proximity signal, caches the latest reading, and relays it to
//! whoever asks. Two behaviours are selected through [`MonitorMode`]:
//! - **Wake-lock**: hold a proximity screen-off wake-lock while running, and a
//!   partial wake-lock while something is near.
//! - **Idle timeout**: queries auto-start the sensor, a start attempt fails if
//!   no reading confirms it in time, and an unread session stops itself.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Domain Layer                             │
//! │  state.rs    - SessionState, Proximity, SensorSession        │
//! │  config.rs   - MonitorMode and timeouts                      │
//! │  command.rs  - Typed request/response surface                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Application Layer                          │
//! │  monitor.rs  - ProximityMonitor state machine                │
//! │  attempt.rs  - In-flight start attempt and its deferred check│
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Infrastructure Layer                        │
//! │  provider.rs - SensorService / PowerService traits           │
//! │  platform/   - Linux iio-sensor-proxy backend, null fallback │
//! │  memory.rs   - In-memory providers for tests and demos       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use proximity_core::{platform::PlatformProvider, MonitorConfig, ProximityMonitor};
//! use std::sync::Arc;
//!
//! let provider = Arc::new(PlatformProvider::new());
//! let monitor = ProximityMonitor::new(MonitorConfig::default(), provider.clone(), provider);
//!
//! monitor.start();
//! println!("{:?}", monitor.get_proximity());
//! ```

mod attempt;
mod clock;
mod command;
mod config;
mod error;
mod events;
mod memory;
mod monitor;
mod provider;
mod state;

pub mod platform;

pub use attempt::StartCheck;
pub use clock::{Clock, ClockRef, ManualClock, SystemClock};
pub use command::{Command, Reply, Response};
pub use config::{MonitorConfig, MonitorMode, DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_START_TIMEOUT_MS};
pub use error::{ProximityError, Result};
pub use events::{new_event_callback, EventCallback, MonitorEvent, StartFailure};
pub use memory::{InMemoryPowerService, InMemorySensorService};
pub use monitor::{ProximityMonitor, QueryReply};
pub use provider::{
    new_reading_callback, NullProvider, PowerService, ReadingCallback, SensorInfo, SensorService,
    UnsupportedReason, WakeLockCapability, WakeLockKind,
};
pub use state::{Proximity, SensorSession, SessionState};
