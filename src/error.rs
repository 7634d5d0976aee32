//! Session Error Types

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Malformed or truncated protocol frames.
///
/// Every variant is fatal to the session. None of them triggers a reply of
/// its own; the caller drops the connection.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("failed to read {what}: {source}")]
    Read {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("unsupported SOCKS version: {0:#04x}")]
    Version(u8),

    #[error("unsupported username/password auth version: {0:#04x}")]
    AuthVersion(u8),

    #[error("unsupported address type: {0:#04x}")]
    AddressType(u8),

    #[error("domain name length cannot be zero")]
    EmptyDomain,

    #[error("domain name is not valid UTF-8")]
    DomainEncoding,
}

impl ProtocolError {
    pub(crate) fn read(what: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| ProtocolError::Read { what, source }
    }
}

/// Everything that can end a client session early.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("authentication failed for user {0:?}")]
    Auth(String),

    #[error("unsupported command: {0:#04x}")]
    UnsupportedCommand(u8),

    #[error("target {target} unreachable: {source}")]
    Dial {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to send {what}: {source}")]
    Write {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("relay failed: {0}")]
    Relay(#[source] io::Error),

    #[error("handshake did not complete within {0:?}")]
    HandshakeTimeout(Duration),
}

impl SessionError {
    pub(crate) fn write(what: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| SessionError::Write { what, source }
    }

    /// Whether the session ended because of something the client sent (or
    /// failed to send), as opposed to a local or network fault.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            SessionError::Protocol(_)
                | SessionError::Auth(_)
                | SessionError::UnsupportedCommand(_)
                | SessionError::HandshakeTimeout(_)
        )
    }
}
