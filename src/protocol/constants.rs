//! SOCKS5 Protocol Constants (RFC 1928 / RFC 1929)

// Protocol versions
pub const SOCKS5_VERSION: u8 = 0x05;
pub const SOCKS5_USERPASS_VERSION: u8 = 0x01;

// Commands
pub const SOCKS5_CMD_CONNECT: u8 = 0x01;

// Address types
pub const SOCKS5_ADDR_IPV4: u8 = 0x01;
pub const SOCKS5_ADDR_DOMAIN: u8 = 0x03;
pub const SOCKS5_ADDR_IPV6: u8 = 0x04;

// Authentication methods
pub const SOCKS5_AUTH_NONE: u8 = 0x00;
pub const SOCKS5_AUTH_USERPASS: u8 = 0x02;

// Reply codes used by this server
pub const SOCKS5_REPLY_SUCCESS: u8 = 0x00;
pub const SOCKS5_REPLY_HOST_UNREACHABLE: u8 = 0x04;
pub const SOCKS5_REPLY_COMMAND_NOT_SUPPORTED: u8 = 0x07;
pub const SOCKS5_REPLY_ADDRESS_TYPE_NOT_SUPPORTED: u8 = 0x08;

// Reserved field value
pub const SOCKS5_RESERVED: u8 = 0x00;

// Username/password sub-negotiation status
pub const SOCKS5_USERPASS_SUCCESS: u8 = 0x00;
pub const SOCKS5_USERPASS_FAILURE: u8 = 0x01;
