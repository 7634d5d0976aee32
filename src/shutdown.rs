//! Shutdown Signalling
//!
//! A cloneable, cooperative shutdown signal shared by the supervisor and its
//! controller, plus a helper that waits for SIGTERM/SIGINT.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::Result;

/// Shutdown coordinator shared between the accept loop and whoever stops it
#[derive(Clone, Debug)]
pub struct ShutdownCoordinator {
    /// Set once shutdown has been requested; never cleared
    triggered: Arc<AtomicBool>,
    /// Wakes tasks blocked in `accept`
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Get a receiver that fires when shutdown is triggered.
    ///
    /// Subscribe before checking [`is_triggered`](Self::is_triggered) so a
    /// concurrent trigger cannot be missed.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            debug!("Shutdown triggered");
            // No receivers just means nothing is listening yet; the flag covers it
            let _ = self.shutdown_tx.send(());
        }
    }

    /// Check if shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Wait until SIGTERM, SIGINT or Ctrl+C arrives, then trigger shutdown
    pub async fn wait_for_os_signal(&self) -> Result<()> {
        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await?;
            info!("Received Ctrl+C, shutting down");
        }

        self.trigger();
        Ok(())
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
