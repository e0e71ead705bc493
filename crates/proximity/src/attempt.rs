//! The single in-flight start attempt of an idle-timeout session.
//!
//! A start attempt is armed when a query has to start the sensor. It settles
//! exactly once: confirmed by the first reading, timed out by its deferred
//! check, or cancelled by `stop`. Queries issued while it is pending share it
//! instead of arming another timer.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{ProximityError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttemptStatus {
    Pending,
    Confirmed,
    TimedOut,
    Cancelled,
}

pub(crate) struct StartAttempt {
    id: u64,
    timeout_ms: u64,
    token: CancellationToken,
    status: watch::Sender<AttemptStatus>,
}

impl StartAttempt {
    pub(crate) fn new(id: u64, timeout_ms: u64) -> Self {
        let (status, _) = watch::channel(AttemptStatus::Pending);
        Self {
            id,
            timeout_ms,
            token: CancellationToken::new(),
            status,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Token the deferred check listens on; cancelled when the attempt settles.
    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub(crate) fn subscribe(&self) -> StartCheck {
        StartCheck {
            status: self.status.subscribe(),
            timeout_ms: self.timeout_ms,
        }
    }

    pub(crate) fn settle(self, status: AttemptStatus) {
        self.token.cancel();
        self.status.send_replace(status);
    }
}

/// Handle on a pending start attempt, returned alongside a query reply.
///
/// Resolves once the sensor confirms with a reading, the start timeout
/// expires, or the session is stopped.
#[derive(Debug)]
pub struct StartCheck {
    status: watch::Receiver<AttemptStatus>,
    timeout_ms: u64,
}

impl StartCheck {
    pub fn is_pending(&self) -> bool {
        *self.status.borrow() == AttemptStatus::Pending
    }

    /// Wait for the attempt to settle.
    ///
    /// # Errors
    ///
    /// - `ProximityError::StartTimeout` if no reading arrived in time
    /// - `ProximityError::StartCancelled` if the session was stopped first
    pub async fn wait(mut self) -> Result<()> {
        let status = match self
            .status
            .wait_for(|status| *status != AttemptStatus::Pending)
            .await
        {
            Ok(status) => *status,
            Err(_) => AttemptStatus::Cancelled,
        };

        match status {
            AttemptStatus::Confirmed => Ok(()),
            AttemptStatus::TimedOut => Err(ProximityError::StartTimeout {
                timeout_ms: self.timeout_ms,
            }),
            AttemptStatus::Pending | AttemptStatus::Cancelled => {
                Err(ProximityError::StartCancelled)
            }
        }
    }
}
