//! In-memory platform providers.
//!
//! Record every call and let the caller inject readings, so the monitor can
//! be exercised without hardware.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::error::{ProximityError, Result};
use crate::provider::{
    PowerService, ReadingCallback, SensorInfo, SensorService, WakeLockCapability, WakeLockKind,
};

#[derive(Default)]
struct Subscription {
    callback: Option<ReadingCallback>,
    registrations: usize,
    unregistrations: usize,
}

/// Sensor service whose readings are pushed by hand with [`emit`](Self::emit).
#[derive(Default)]
pub struct InMemorySensorService {
    sensors: Vec<SensorInfo>,
    fail_registration: bool,
    subscription: Mutex<Subscription>,
}

impl InMemorySensorService {
    /// A device without any proximity sensor.
    pub fn new() -> Self {
        Self::default()
    }

    /// A device with one proximity sensor.
    pub fn with_sensor(name: &str) -> Self {
        Self {
            sensors: vec![SensorInfo {
                id: format!("memory:{}", name),
                name: name.to_string(),
            }],
            ..Default::default()
        }
    }

    /// Make every `register` call fail.
    pub fn failing_registration(mut self) -> Self {
        self.fail_registration = true;
        self
    }

    /// Deliver a raw reading to the registered callback.
    ///
    /// Returns false when nothing is registered.
    pub fn emit(&self, raw: f32) -> bool {
        let callback = self.subscription.lock().unwrap().callback.clone();
        match callback {
            Some(callback) => {
                callback(raw);
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.subscription.lock().unwrap().callback.is_some()
    }

    pub fn registrations(&self) -> usize {
        self.subscription.lock().unwrap().registrations
    }

    pub fn unregistrations(&self) -> usize {
        self.subscription.lock().unwrap().unregistrations
    }
}

impl SensorService for InMemorySensorService {
    fn proximity_sensors(&self) -> Vec<SensorInfo> {
        self.sensors.clone()
    }

    fn register(&self, sensor: &SensorInfo, callback: ReadingCallback) -> Result<()> {
        if self.fail_registration {
            return Err(ProximityError::Platform(format!(
                "sensor {} refused registration",
                sensor.id
            )));
        }

        let mut subscription = self.subscription.lock().unwrap();
        subscription.callback = Some(callback);
        subscription.registrations += 1;
        Ok(())
    }

    fn unregister(&self) {
        let mut subscription = self.subscription.lock().unwrap();
        subscription.callback = None;
        subscription.unregistrations += 1;
    }
}

#[derive(Default)]
struct PowerLedger {
    held: HashSet<WakeLockKind>,
    acquisitions: HashMap<WakeLockKind, usize>,
    releases: HashMap<WakeLockKind, usize>,
}

/// Power service that tracks which wake-locks are held.
///
/// Every kind is supported unless configured otherwise.
#[derive(Default)]
pub struct InMemoryPowerService {
    capabilities: HashMap<WakeLockKind, WakeLockCapability>,
    failing: HashSet<WakeLockKind>,
    ledger: Mutex<PowerLedger>,
}

impl InMemoryPowerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the capability reported for `kind`.
    pub fn with_capability(mut self, kind: WakeLockKind, capability: WakeLockCapability) -> Self {
        self.capabilities.insert(kind, capability);
        self
    }

    /// Make acquire/release of `kind` fail with a platform error.
    pub fn failing(mut self, kind: WakeLockKind) -> Self {
        self.failing.insert(kind);
        self
    }

    pub fn is_held(&self, kind: WakeLockKind) -> bool {
        self.ledger.lock().unwrap().held.contains(&kind)
    }

    pub fn acquisitions(&self, kind: WakeLockKind) -> usize {
        let ledger = self.ledger.lock().unwrap();
        ledger.acquisitions.get(&kind).copied().unwrap_or(0)
    }

    pub fn releases(&self, kind: WakeLockKind) -> usize {
        let ledger = self.ledger.lock().unwrap();
        ledger.releases.get(&kind).copied().unwrap_or(0)
    }
}

impl PowerService for InMemoryPowerService {
    fn capability(&self, kind: WakeLockKind) -> WakeLockCapability {
        self.capabilities
            .get(&kind)
            .cloned()
            .unwrap_or(WakeLockCapability::Supported)
    }

    fn acquire(&self, kind: WakeLockKind) -> Result<()> {
        if self.failing.contains(&kind) {
            return Err(ProximityError::Platform(format!("cannot acquire {:?}", kind)));
        }

        let mut ledger = self.ledger.lock().unwrap();
        ledger.held.insert(kind);
        *ledger.acquisitions.entry(kind).or_default() += 1;
        Ok(())
    }

    fn release(&self, kind: WakeLockKind) -> Result<()> {
        if self.failing.contains(&kind) {
            return Err(ProximityError::Platform(format!("cannot release {:?}", kind)));
        }

        let mut ledger = self.ledger.lock().unwrap();
        ledger.held.remove(&kind);
        *ledger.releases.entry(kind).or_default() += 1;
        Ok(())
    }
}
