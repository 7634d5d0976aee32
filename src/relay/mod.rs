//! Data Relay Module
//!
//! Handles bidirectional data relay between client and target.

pub mod engine;
pub mod session;

pub use engine::RelayEngine;
pub use session::{Direction, RelayCounters, RelayReport};
