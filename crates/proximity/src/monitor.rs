//! Proximity monitor - owns the sensor session and its wake-locks.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::attempt::{AttemptStatus, StartAttempt, StartCheck};
use crate::clock::{ClockRef, SystemClock};
use crate::config::{MonitorConfig, MonitorMode};
use crate::error::{ProximityError, Result};
use crate::events::{EventCallback, MonitorEvent, StartFailure};
use crate::provider::{
    new_reading_callback, PowerService, SensorService, UnsupportedReason, WakeLockCapability,
    WakeLockKind,
};
use crate::state::{Proximity, SensorSession, SessionState};

/// Answer to a `getProximityState` query.
#[derive(Debug)]
pub struct QueryReply {
    pub proximity: Proximity,

    /// Present when the query had to start the sensor (idle-timeout mode).
    pub start_check: Option<StartCheck>,
}

struct Inner {
    session: SensorSession,
    registered: bool,
    screen_lock_held: bool,
    partial_lock_held: bool,
    attempt: Option<StartAttempt>,
    next_attempt_id: u64,
}

impl Inner {
    fn transition(&mut self, next: SessionState, events: &mut Vec<MonitorEvent>) {
        if self.session.state != next {
            tracing::debug!(from = %self.session.state, to = %next, "session state");
            self.session.state = next;
            events.push(MonitorEvent::StateChanged { state: next });
        }
    }

    fn settle_attempt(&mut self, status: AttemptStatus) {
        if let Some(attempt) = self.attempt.take() {
            attempt.settle(status);
        }
    }
}

struct Shared {
    config: MonitorConfig,
    sensors: Arc<dyn SensorService>,
    power: Arc<dyn PowerService>,
    clock: ClockRef,
    screen_lock_supported: bool,
    partial_lock_supported: bool,
    listener: Mutex<Option<EventCallback>>,
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(&self, kind: WakeLockKind) -> bool {
        match self.power.acquire(kind) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(?kind, error = %e, "failed to acquire wake-lock");
                false
            }
        }
    }

    fn release(&self, kind: WakeLockKind) {
        if let Err(e) = self.power.release(kind) {
            tracing::warn!(?kind, error = %e, "failed to release wake-lock");
        }
    }

    /// Undo everything a running session holds. Leaves the state untouched.
    fn release_all(&self, inner: &mut Inner) {
        if inner.registered {
            self.sensors.unregister();
            inner.registered = false;
        }
        if inner.partial_lock_held {
            self.release(WakeLockKind::Partial);
            inner.partial_lock_held = false;
        }
        if inner.screen_lock_held {
            self.release(WakeLockKind::ProximityScreenOff);
            inner.screen_lock_held = false;
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        let mut inner = std::mem::replace(inner, new_inner(self.config.idle_timeout_ms));
        inner.settle_attempt(AttemptStatus::Cancelled);
        self.release_all(&mut inner);
    }
}

fn new_inner(idle_timeout_ms: u64) -> Inner {
    Inner {
        session: SensorSession::new(idle_timeout_ms),
        registered: false,
        screen_lock_held: false,
        partial_lock_held: false,
        attempt: None,
        next_attempt_id: 0,
    }
}

fn probe(power: &dyn PowerService, kind: WakeLockKind) -> bool {
    match power.capability(kind) {
        WakeLockCapability::Supported => true,
        WakeLockCapability::Unsupported(UnsupportedReason::NotAvailable) => {
            tracing::debug!(?kind, "wake-lock not available on this platform");
            false
        }
        WakeLockCapability::Unsupported(UnsupportedReason::ProbeFailed(reason)) => {
            tracing::warn!(?kind, %reason, "could not probe wake-lock support, not using it");
            false
        }
    }
}

fn expire(weak: &Weak<Shared>, id: u64) {
    if let Some(shared) = weak.upgrade() {
        ProximityMonitor { shared }.expire_start_attempt(id);
    }
}

/// Owns one proximity sensor session.
///
/// Cheap to clone; clones share the session. The platform callback holds a
/// weak reference, so dropping the last clone unregisters the sensor and
/// releases any wake-lock.
#[derive(Clone)]
pub struct ProximityMonitor {
    shared: Arc<Shared>,
}

impl ProximityMonitor {
    pub fn new(
        config: MonitorConfig,
        sensors: Arc<dyn SensorService>,
        power: Arc<dyn PowerService>,
    ) -> Self {
        Self::with_clock(config, sensors, power, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: MonitorConfig,
        sensors: Arc<dyn SensorService>,
        power: Arc<dyn PowerService>,
        clock: ClockRef,
    ) -> Self {
        // Wake-locks only matter in wake-lock mode; skip probing otherwise.
        let (screen_lock_supported, partial_lock_supported) = match config.mode {
            MonitorMode::WakeLock => (
                probe(power.as_ref(), WakeLockKind::ProximityScreenOff),
                probe(power.as_ref(), WakeLockKind::Partial),
            ),
            MonitorMode::IdleTimeout => (false, false),
        };

        let inner = new_inner(config.idle_timeout_ms);

        Self {
            shared: Arc::new(Shared {
                config,
                sensors,
                power,
                clock,
                screen_lock_supported,
                partial_lock_supported,
                listener: Mutex::new(None),
                inner: Mutex::new(inner),
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.shared.config
    }

    /// Install the listener that receives [`MonitorEvent`]s.
    pub fn set_listener(&self, listener: EventCallback) {
        let mut guard = self
            .shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Some(listener);
    }

    /// Start listening to the proximity sensor.
    ///
    /// A no-op while Starting or Running. Returns the resulting state:
    /// `Starting` once registered, `FailedToStart` when no sensor exists or
    /// the platform refuses the registration.
    pub fn start(&self) -> SessionState {
        let mut events = Vec::new();
        let state = {
            let mut inner = self.shared.lock();
            self.start_locked(&mut inner, &mut events)
        };
        self.emit_all(events);
        state
    }

    fn start_locked(&self, inner: &mut Inner, events: &mut Vec<MonitorEvent>) -> SessionState {
        let current = inner.session.state;
        if current.is_active() {
            return current;
        }

        // A timed-out attempt may still be subscribed.
        self.shared.release_all(inner);

        let Some(sensor) = self.shared.sensors.proximity_sensors().into_iter().next() else {
            tracing::warn!("no proximity sensor available");
            inner.transition(SessionState::FailedToStart, events);
            events.push(MonitorEvent::StartFailed {
                reason: StartFailure::NoSensor,
            });
            return SessionState::FailedToStart;
        };

        if self.shared.screen_lock_supported && !inner.screen_lock_held {
            inner.screen_lock_held = self.shared.acquire(WakeLockKind::ProximityScreenOff);
        }

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let callback = new_reading_callback(move |raw| {
            if let Some(shared) = weak.upgrade() {
                ProximityMonitor { shared }.on_reading(raw);
            }
        });

        if let Err(e) = self.shared.sensors.register(&sensor, callback) {
            tracing::warn!(sensor = %sensor.name, error = %e, "failed to register proximity listener");
            self.shared.release_all(inner);
            inner.transition(SessionState::FailedToStart, events);
            events.push(MonitorEvent::StartFailed {
                reason: StartFailure::NoSensor,
            });
            return SessionState::FailedToStart;
        }
        inner.registered = true;

        let now = self.shared.clock.now_ms();
        inner.session.last_event_ms = now;
        inner.session.last_read_ms = now;
        inner.transition(SessionState::Starting, events);

        tracing::info!(
            sensor = %sensor.name,
            mode = ?self.shared.config.mode,
            screen_lock = inner.screen_lock_held,
            "proximity sensor started"
        );

        SessionState::Starting
    }

    /// Stop listening and release every wake-lock. Idempotent.
    pub fn stop(&self) {
        let mut events = Vec::new();
        {
            let mut inner = self.shared.lock();
            self.stop_locked(&mut inner, &mut events);
        }
        self.emit_all(events);
    }

    fn stop_locked(&self, inner: &mut Inner, events: &mut Vec<MonitorEvent>) {
        if inner.session.state == SessionState::Stopped {
            return;
        }

        inner.settle_attempt(AttemptStatus::Cancelled);
        self.shared.release_all(inner);
        inner.transition(SessionState::Stopped, events);
        tracing::info!("proximity sensor stopped");
    }

    /// Handle a raw reading from the platform.
    ///
    /// Platform backends call this through the registered callback; it is
    /// public so hosts with their own event plumbing can feed readings in.
    pub fn on_reading(&self, raw: f32) {
        let proximity = Proximity::from_raw(raw);
        let mut events = Vec::new();

        {
            let mut inner = self.shared.lock();

            // Late delivery after stop or a timed-out start.
            if !inner.session.state.is_active() {
                tracing::trace!(raw, state = %inner.session.state, "ignoring reading");
                return;
            }

            if self.shared.partial_lock_supported {
                match proximity {
                    Proximity::Near if !inner.partial_lock_held => {
                        inner.partial_lock_held = self.shared.acquire(WakeLockKind::Partial);
                    }
                    Proximity::Far if inner.partial_lock_held => {
                        self.shared.release(WakeLockKind::Partial);
                        inner.partial_lock_held = false;
                    }
                    _ => {}
                }
            }

            if inner.session.proximity != proximity {
                events.push(MonitorEvent::ProximityChanged { proximity });
            }
            inner.session.proximity = proximity;
            inner.session.last_event_ms = self.shared.clock.now_ms();
            inner.transition(SessionState::Running, &mut events);
            inner.settle_attempt(AttemptStatus::Confirmed);

            if self.shared.config.mode == MonitorMode::IdleTimeout && inner.session.idle_elapsed() {
                tracing::info!(
                    idle_timeout_ms = inner.session.idle_timeout_ms,
                    "proximity value unread past idle timeout, stopping"
                );
                self.stop_locked(&mut inner, &mut events);
            }
        }

        self.emit_all(events);
    }

    /// Most recent reading. Marks it as read, restarting the idle window.
    pub fn get_proximity(&self) -> Proximity {
        let mut inner = self.shared.lock();
        inner.session.last_read_ms = self.shared.clock.now_ms();
        inner.session.proximity
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().session.state
    }

    pub fn session(&self) -> SensorSession {
        self.shared.lock().session
    }

    pub fn idle_timeout_ms(&self) -> u64 {
        self.shared.lock().session.idle_timeout_ms
    }

    pub fn set_idle_timeout_ms(&self, idle_timeout_ms: u64) {
        self.shared.lock().session.idle_timeout_ms = idle_timeout_ms;
    }

    /// Answer a `getProximityState` request.
    ///
    /// In wake-lock mode this only returns the cached value. In idle-timeout
    /// mode a session that is not Running is started first and a start
    /// attempt is armed; the returned [`StartCheck`] settles when the first
    /// reading arrives or the start timeout expires.
    ///
    /// The deferred check runs on the current Tokio runtime, or on a timer
    /// thread when called from outside one.
    ///
    /// # Errors
    ///
    /// - `ProximityError::NoSensorAvailable` if the sensor could not be started
    /// - `ProximityError::Platform` if the deferred check could not be scheduled;
    ///   the session is stopped again
    pub fn query(&self) -> Result<QueryReply> {
        let mut events = Vec::new();
        let reply = {
            let mut inner = self.shared.lock();
            let start_check = match self.shared.config.mode {
                MonitorMode::WakeLock => None,
                MonitorMode::IdleTimeout if inner.session.state == SessionState::Running => None,
                MonitorMode::IdleTimeout => {
                    if self.start_locked(&mut inner, &mut events) == SessionState::FailedToStart {
                        drop(inner);
                        self.emit_all(events);
                        return Err(ProximityError::NoSensorAvailable);
                    }
                    match self.arm_start_attempt(&mut inner) {
                        Ok(check) => Some(check),
                        Err(e) => {
                            self.stop_locked(&mut inner, &mut events);
                            drop(inner);
                            self.emit_all(events);
                            return Err(e);
                        }
                    }
                }
            };

            inner.session.last_read_ms = self.shared.clock.now_ms();
            QueryReply {
                proximity: inner.session.proximity,
                start_check,
            }
        };
        self.emit_all(events);
        Ok(reply)
    }

    /// Join the pending start attempt, or arm a new one with its deferred check.
    fn arm_start_attempt(&self, inner: &mut Inner) -> Result<StartCheck> {
        if let Some(attempt) = &inner.attempt {
            return Ok(attempt.subscribe());
        }

        inner.next_attempt_id += 1;
        let attempt = StartAttempt::new(inner.next_attempt_id, self.shared.config.start_timeout_ms);
        let check = attempt.subscribe();

        let id = attempt.id();
        let token = attempt.token();
        let timeout = self.shared.config.start_timeout();
        let weak = Arc::downgrade(&self.shared);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => {}
                        _ = tokio::time::sleep(timeout) => expire(&weak, id),
                    }
                });
            }
            Err(_) => {
                tracing::debug!(id, "no async runtime, start check runs on a timer thread");
                std::thread::Builder::new()
                    .name("proximity-start-check".to_string())
                    .spawn(move || {
                        std::thread::sleep(timeout);
                        if !token.is_cancelled() {
                            expire(&weak, id);
                        }
                    })
                    .map_err(|e| {
                        tracing::warn!(error = %e, "failed to schedule start check");
                        ProximityError::Platform(e.to_string())
                    })?;
            }
        }

        inner.attempt = Some(attempt);
        Ok(check)
    }

    fn expire_start_attempt(&self, id: u64) {
        let mut events = Vec::new();
        {
            let mut inner = self.shared.lock();
            if inner.attempt.as_ref().map(StartAttempt::id) != Some(id) {
                return;
            }

            if inner.session.state == SessionState::Starting {
                tracing::warn!(
                    timeout_ms = self.shared.config.start_timeout_ms,
                    "proximity sensor did not report in time"
                );
                inner.transition(SessionState::FailedToStart, &mut events);
                events.push(MonitorEvent::StartFailed {
                    reason: StartFailure::Timeout,
                });
                inner.settle_attempt(AttemptStatus::TimedOut);
            } else {
                inner.settle_attempt(AttemptStatus::Confirmed);
            }
        }
        self.emit_all(events);
    }

    fn emit_all(&self, events: Vec<MonitorEvent>) {
        if events.is_empty() {
            return;
        }

        let listener = self
            .shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let Some(listener) = listener else {
            return;
        };
        for event in events {
            listener(event);
        }
    }
}

impl std::fmt::Debug for ProximityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProximityMonitor")
            .field("config", &self.shared.config)
            .field("session", &self.session())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::{InMemoryPowerService, InMemorySensorService};

    fn monitor(config: MonitorConfig) -> (ProximityMonitor, Arc<InMemorySensorService>) {
        let sensors = Arc::new(InMemorySensorService::with_sensor("test"));
        let power = Arc::new(InMemoryPowerService::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let monitor = ProximityMonitor::with_clock(config, sensors.clone(), power, clock);
        (monitor, sensors)
    }

    #[test]
    fn test_new_monitor_is_stopped() {
        let (monitor, sensors) = monitor(MonitorConfig::default());
        assert_eq!(monitor.state(), SessionState::Stopped);
        assert_eq!(monitor.get_proximity(), Proximity::Far);
        assert!(!sensors.is_registered());
    }

    #[test]
    fn test_reading_while_stopped_is_ignored() {
        let (monitor, _sensors) = monitor(MonitorConfig::default());
        monitor.on_reading(0.0);
        assert_eq!(monitor.state(), SessionState::Stopped);
        assert_eq!(monitor.get_proximity(), Proximity::Far);
    }

    #[test]
    fn test_dropping_monitor_unregisters() {
        let (monitor, sensors) = monitor(MonitorConfig::wake_lock());
        monitor.start();
        assert!(sensors.is_registered());

        drop(monitor);
        assert!(!sensors.is_registered());
    }

    #[test]
    fn test_idle_timeout_setting() {
        let (monitor, _sensors) = monitor(MonitorConfig::idle_timeout(1000));
        assert_eq!(monitor.idle_timeout_ms(), 1000);

        monitor.set_idle_timeout_ms(4500);
        assert_eq!(monitor.idle_timeout_ms(), 4500);
        assert_eq!(monitor.session().idle_timeout_ms, 4500);
    }

    #[test]
    fn test_failed_registration_reports_failed_to_start() {
        let sensors = Arc::new(InMemorySensorService::with_sensor("test").failing_registration());
        let power = Arc::new(InMemoryPowerService::new());
        let monitor = ProximityMonitor::new(MonitorConfig::wake_lock(), sensors.clone(), power.clone());

        assert_eq!(monitor.start(), SessionState::FailedToStart);
        assert!(!sensors.is_registered());
        assert!(!power.is_held(WakeLockKind::ProximityScreenOff));
    }
}
