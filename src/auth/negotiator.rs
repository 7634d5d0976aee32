//! Authentication Negotiator

use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::error::SessionError;
use crate::protocol::codec::{
    encode_auth_status, encode_method_selection, read_credentials, read_greeting,
};
use crate::protocol::{AuthMethod, Credentials};

/// Server-side authentication policy, fixed for the life of the process
#[derive(Clone, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Every client is admitted without credentials
    Open,
    /// Clients must present exactly these credentials
    UserPass { username: Vec<u8>, password: Vec<u8> },
}

impl AuthPolicy {
    /// Build the policy from configuration. Credentials are ignored when
    /// authentication is disabled.
    pub fn from_config(config: &AuthConfig) -> Self {
        if config.need_auth {
            AuthPolicy::UserPass {
                username: config.username.as_bytes().to_vec(),
                password: config.password.as_bytes().to_vec(),
            }
        } else {
            AuthPolicy::Open
        }
    }

    pub fn method(&self) -> AuthMethod {
        match self {
            AuthPolicy::Open => AuthMethod::NoAuth,
            AuthPolicy::UserPass { .. } => AuthMethod::UserPass,
        }
    }

    fn accepts(&self, credentials: &Credentials) -> bool {
        match self {
            AuthPolicy::Open => true,
            AuthPolicy::UserPass { username, password } => {
                credentials.username == *username && credentials.password == *password
            }
        }
    }
}

impl fmt::Debug for AuthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthPolicy::Open => f.write_str("Open"),
            AuthPolicy::UserPass { username, .. } => f
                .debug_struct("UserPass")
                .field("username", &String::from_utf8_lossy(username))
                .finish_non_exhaustive(),
        }
    }
}

/// Result of a completed negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub method: AuthMethod,
    pub user: Option<String>,
}

/// Runs the greeting and, when the policy demands it, the credential check
#[derive(Debug, Clone)]
pub struct AuthNegotiator {
    policy: AuthPolicy,
}

impl AuthNegotiator {
    pub fn new(policy: AuthPolicy) -> Self {
        Self { policy }
    }

    /// Negotiate the authentication method with the client.
    ///
    /// The method is chosen by policy alone; the client's offered list is
    /// not consulted. A client that cannot do username/password will fail
    /// at the credential read.
    pub async fn negotiate<S>(&self, stream: &mut S) -> Result<AuthOutcome, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let greeting = read_greeting(stream).await?;
        let method = self.policy.method();
        debug!(offered = ?greeting.methods, selected = ?method, "Client greeting received");

        stream
            .write_all(&encode_method_selection(method.method_code()))
            .await
            .map_err(SessionError::write("method selection"))?;

        match method {
            AuthMethod::NoAuth => Ok(AuthOutcome { method, user: None }),
            AuthMethod::UserPass => {
                let user = self.authenticate(stream).await?;
                Ok(AuthOutcome {
                    method,
                    user: Some(user),
                })
            }
        }
    }

    /// Username/password sub-negotiation. One attempt, no retry.
    async fn authenticate<S>(&self, stream: &mut S) -> Result<String, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let credentials = read_credentials(stream).await?;
        let success = self.policy.accepts(&credentials);

        stream
            .write_all(&encode_auth_status(success))
            .await
            .map_err(SessionError::write("auth status"))?;

        let user = credentials.username_lossy();
        if success {
            debug!(user = %user, "Client authenticated");
            Ok(user)
        } else {
            warn!(user = %user, "Rejected credentials");
            Err(SessionError::Auth(user))
        }
    }
}
