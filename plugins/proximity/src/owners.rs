//! Webviews that have used the sensor since it was last released.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
pub(crate) struct SessionOwners {
    labels: Mutex<HashSet<String>>,
}

impl SessionOwners {
    /// Record that `label` may have started the sensor.
    pub(crate) fn claim(&self, label: &str) {
        let mut labels = self.labels.lock().unwrap_or_else(PoisonError::into_inner);
        if !labels.contains(label) {
            labels.insert(label.to_string());
        }
    }

    /// Forget `label`. Returns true when it was the last owner.
    pub(crate) fn release(&self, label: &str) -> bool {
        let mut labels = self.labels.lock().unwrap_or_else(PoisonError::into_inner);
        labels.remove(label) && labels.is_empty()
    }
}
