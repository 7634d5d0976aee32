//! Configuration Types

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_ip: IpAddr,
    pub port: u16,
    /// Cap on concurrent sessions; unbounded when unset
    pub max_connections: Option<usize>,
    /// Deadline for greeting, auth and request; none when unset
    #[serde(with = "humantime_serde")]
    pub handshake_timeout: Option<Duration>,
    /// Deadline for dialing the target; none when unset
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,
}

/// Authentication configuration
#[derive(Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub need_auth: bool,
    pub username: String,
    pub password: String,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 1080,
            max_connections: None,
            handshake_timeout: None,
            connect_timeout: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("need_auth", &self.need_auth)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Address the supervisor binds to
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.listen_ip, self.server.port)
    }
}
