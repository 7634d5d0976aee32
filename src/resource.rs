//! Resource Management
//!
//! Optional cap on concurrent sessions. Without a cap the supervisor fans out
//! one task per accepted connection with no limit.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Gates accept-to-dispatch on a semaphore when `max_connections` is set
#[derive(Debug, Clone)]
pub struct ConnectionLimiter {
    semaphore: Option<Arc<Semaphore>>,
    max_connections: Option<usize>,
}

impl ConnectionLimiter {
    pub fn new(max_connections: Option<usize>) -> Self {
        Self {
            semaphore: max_connections.map(|max| Arc::new(Semaphore::new(max))),
            max_connections,
        }
    }

    /// A limiter that never blocks
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn max_connections(&self) -> Option<usize> {
        self.max_connections
    }

    pub fn is_bounded(&self) -> bool {
        self.semaphore.is_some()
    }

    /// Wait for a free slot. Returns immediately when unbounded.
    ///
    /// The slot is released when the returned value is dropped.
    pub async fn acquire(&self) -> ConnectionSlot {
        let permit = match &self.semaphore {
            // The semaphore is never closed
            Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
            None => None,
        };

        if permit.is_some() {
            debug!(active = self.active(), "Acquired connection slot");
        }
        ConnectionSlot { _permit: permit }
    }

    /// Number of slots currently held, when bounded
    pub fn active(&self) -> usize {
        match (&self.semaphore, self.max_connections) {
            (Some(semaphore), Some(max)) => max - semaphore.available_permits(),
            _ => 0,
        }
    }
}

impl Default for ConnectionLimiter {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Held by a session for its whole lifetime
#[derive(Debug)]
pub struct ConnectionSlot {
    _permit: Option<OwnedSemaphorePermit>,
}
