//! Connection Management Module
//!
//! Accept loop and per-connection session handling.

pub mod manager;
pub mod session;

pub use manager::{ConnectionManager, ServerHandle};
pub use session::{ClientSession, SessionContext};
