//! SOCKS5 Protocol Types

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::protocol::constants::*;

/// Client greeting: `VER NMETHODS METHODS...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks5Greeting {
    pub version: u8,
    pub methods: Vec<u8>,
}

/// Username/password sub-negotiation frame (RFC 1929).
///
/// Kept as raw bytes so the comparison against the configured credentials
/// is byte-for-byte with no normalization.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: Vec<u8>,
    pub password: Vec<u8>,
}

impl Credentials {
    pub fn username_lossy(&self) -> String {
        String::from_utf8_lossy(&self.username).into_owned()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username_lossy())
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Fixed request header: `VER CMD RSV ATYP`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Socks5RequestHeader {
    pub version: u8,
    pub command: u8,
    pub reserved: u8,
    pub address_type: u8,
}

/// Target host as carried in a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    Ipv4(Ipv4Addr),
    Domain(String),
    Ipv6(Ipv6Addr),
}

impl TargetAddr {
    /// Host in textual form. Domain names are passed through unresolved.
    pub fn host(&self) -> String {
        match self {
            TargetAddr::Ipv4(ip) => ip.to_string(),
            TargetAddr::Domain(domain) => domain.clone(),
            TargetAddr::Ipv6(ip) => ip.to_string(),
        }
    }
}

/// Decoded destination of a request: host plus port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddress {
    pub addr: TargetAddr,
    pub port: u16,
}

impl TargetAddress {
    pub fn new(addr: TargetAddr, port: u16) -> Self {
        Self { addr, port }
    }
}

/// Renders `host:port`, bracketing IPv6 hosts so the string can be dialed.
impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.addr {
            TargetAddr::Ipv6(ip) => write!(f, "[{}]:{}", ip, self.port),
            other => write!(f, "{}:{}", other.host(), self.port),
        }
    }
}

/// Authentication method chosen by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    NoAuth,
    UserPass,
}

impl AuthMethod {
    /// Convert to method code
    pub fn method_code(&self) -> u8 {
        match self {
            AuthMethod::NoAuth => SOCKS5_AUTH_NONE,
            AuthMethod::UserPass => SOCKS5_AUTH_USERPASS,
        }
    }
}

/// Reply codes this server emits
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCode {
    Succeeded = SOCKS5_REPLY_SUCCESS,
    HostUnreachable = SOCKS5_REPLY_HOST_UNREACHABLE,
    CommandNotSupported = SOCKS5_REPLY_COMMAND_NOT_SUPPORTED,
    AddressTypeNotSupported = SOCKS5_REPLY_ADDRESS_TYPE_NOT_SUPPORTED,
}

/// SOCKS5 reply: `VER REP RSV ATYP BND.ADDR BND.PORT`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks5Reply {
    pub reply_code: ReplyCode,
    pub bound: SocketAddr,
}

impl Socks5Reply {
    /// Success reply carrying the proxy's local endpoint of the outbound connection
    pub fn success(bound: SocketAddr) -> Self {
        Self {
            reply_code: ReplyCode::Succeeded,
            bound,
        }
    }

    /// Error reply with a zeroed IPv4 placeholder
    pub fn error(reply_code: ReplyCode) -> Self {
        Self {
            reply_code,
            bound: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        }
    }

    /// Address type and raw address bytes of the bound endpoint.
    ///
    /// IPv4-mapped IPv6 addresses are reported in IPv4 form.
    pub fn bound_address(&self) -> (u8, Vec<u8>) {
        match self.bound.ip() {
            IpAddr::V4(ip) => (SOCKS5_ADDR_IPV4, ip.octets().to_vec()),
            IpAddr::V6(ip) => match ip.to_ipv4_mapped() {
                Some(v4) => (SOCKS5_ADDR_IPV4, v4.octets().to_vec()),
                None => (SOCKS5_ADDR_IPV6, ip.octets().to_vec()),
            },
        }
    }
}
