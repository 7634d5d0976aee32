//! SOCKS5 Protocol Implementation
//!
//! Frame decoding/encoding, the wire-level types, and the CONNECT request handler.

pub mod codec;
pub mod constants;
pub mod handler;
pub mod types;

pub use constants::*;
pub use handler::{ConnectedTarget, RequestHandler};
pub use types::*;
