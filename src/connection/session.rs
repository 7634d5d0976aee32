//! Per-connection Session

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::auth::{AuthNegotiator, AuthPolicy};
use crate::config::Config;
use crate::error::SessionError;
use crate::protocol::{ConnectedTarget, RequestHandler};
use crate::relay::RelayEngine;

/// Read-only state shared by every session of one supervisor
#[derive(Debug)]
pub struct SessionContext {
    pub negotiator: AuthNegotiator,
    pub handler: RequestHandler,
    pub relay: RelayEngine,
    pub handshake_timeout: Option<Duration>,
}

impl SessionContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            negotiator: AuthNegotiator::new(AuthPolicy::from_config(&config.auth)),
            handler: RequestHandler::with_connect_timeout(config.server.connect_timeout),
            relay: RelayEngine::new(),
            handshake_timeout: config.server.handshake_timeout,
        }
    }

    /// Negotiate, authenticate and serve the CONNECT request, in that order
    async fn handshake<S>(&self, client: &mut S) -> Result<ConnectedTarget, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let outcome = self.negotiator.negotiate(client).await?;
        if let Some(user) = &outcome.user {
            info!(user = %user, "Authentication successful");
        }
        self.handler.handle(client).await
    }
}

/// One accepted client connection
#[derive(Debug)]
pub struct ClientSession {
    id: Uuid,
    peer: SocketAddr,
    stream: TcpStream,
}

impl ClientSession {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
            stream,
        }
    }

    /// Drive the session to completion and log how it ended.
    ///
    /// Errors never escape; both sockets are closed when this returns.
    pub async fn run(self, ctx: Arc<SessionContext>) {
        let span = info_span!("session", id = %self.id, peer = %self.peer);

        async move {
            debug!("Session started");
            match self.serve(&ctx).await {
                Ok(()) => debug!("Session closed"),
                Err(e) if e.is_client_fault() => warn!(error = %e, "Session aborted"),
                Err(e) => error!(error = %e, "Session failed"),
            }
        }
        .instrument(span)
        .await
    }

    async fn serve(self, ctx: &SessionContext) -> Result<(), SessionError> {
        let mut client = self.stream;

        let connected = match ctx.handshake_timeout {
            Some(limit) => timeout(limit, ctx.handshake(&mut client))
                .await
                .map_err(|_| SessionError::HandshakeTimeout(limit))??,
            None => ctx.handshake(&mut client).await?,
        };

        debug!(dest = %connected.target, bound = %connected.bound, "Starting relay");
        let report = ctx.relay.relay(client, connected.stream).await;
        report.log_stats();
        report.result.map_err(SessionError::Relay)
    }
}
