//! socks5lite Library
//!
//! A small SOCKS5 proxy server: method negotiation, optional
//! username/password authentication, CONNECT, and a two-way byte relay.

pub mod auth;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod resource;
pub mod shutdown;

pub use config::Config;
pub use connection::{ConnectionManager, ServerHandle};
pub use error::{ProtocolError, SessionError};
pub use resource::ConnectionLimiter;
pub use shutdown::ShutdownCoordinator;

/// Common error type for the proxy server
pub type Result<T> = anyhow::Result<T>;
