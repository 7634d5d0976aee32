//! Connection Manager Implementation

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::session::{ClientSession, SessionContext};
use crate::config::Config;
use crate::resource::ConnectionLimiter;
use crate::shutdown::ShutdownCoordinator;
use crate::Result;

/// Owns the listening socket and dispatches each accepted connection to its
/// own session task
pub struct ConnectionManager {
    context: Arc<SessionContext>,
    limiter: ConnectionLimiter,
    shutdown: ShutdownCoordinator,
}

impl ConnectionManager {
    /// Create a new ConnectionManager
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_shutdown(config, ShutdownCoordinator::new())
    }

    /// Create a ConnectionManager stopped by an externally owned signal
    pub fn with_shutdown(config: Arc<Config>, shutdown: ShutdownCoordinator) -> Self {
        Self {
            context: Arc::new(SessionContext::from_config(&config)),
            limiter: ConnectionLimiter::new(config.server.max_connections),
            shutdown,
        }
    }

    /// Bind `listen_addr` and start accepting in the background
    pub async fn start(self, listen_addr: SocketAddr) -> Result<ServerHandle> {
        info!("Binding TCP listener to {}", listen_addr);
        let listener = TcpListener::bind(listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", listen_addr))?;
        let local_addr = listener.local_addr()?;

        info!(
            addr = %local_addr,
            max_connections = ?self.limiter.max_connections(),
            "socks5lite is running"
        );

        let shutdown = self.shutdown.clone();
        let join = tokio::spawn(self.accept_connections(listener));

        Ok(ServerHandle {
            local_addr,
            shutdown,
            join,
        })
    }

    /// Start, then block until the accept loop exits
    pub async fn run(self, listen_addr: SocketAddr) -> Result<()> {
        self.start(listen_addr).await?.wait().await
    }

    /// Main connection acceptance loop
    async fn accept_connections(self, listener: TcpListener) {
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            if self.shutdown.is_triggered() {
                break;
            }

            let slot = tokio::select! {
                slot = self.limiter.acquire() => slot,
                _ = shutdown_rx.recv() => break,
            };

            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = shutdown_rx.recv() => break,
            };

            match accepted {
                Ok((stream, peer)) => {
                    debug!("Accepted connection from {}", peer);
                    let session = ClientSession::new(stream, peer);
                    let context = Arc::clone(&self.context);
                    tokio::spawn(async move {
                        let _slot = slot;
                        session.run(context).await;
                    });
                }
                Err(e) => {
                    if self.shutdown.is_triggered() {
                        break;
                    }
                    error!("Error accepting connection: {}", e);
                }
            }
        }

        info!("Connection acceptance loop stopped");
    }
}

/// Control handle for a running supervisor
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: ShutdownCoordinator,
    join: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the listener is actually bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_coordinator(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Stop accepting and wait for the accept loop to exit.
    ///
    /// Sessions already in flight keep running to completion.
    pub async fn stop(self) -> Result<()> {
        self.shutdown.trigger();
        self.wait().await
    }

    /// Wait for the accept loop to exit
    pub async fn wait(self) -> Result<()> {
        self.join.await.context("Accept loop panicked")
    }
}
