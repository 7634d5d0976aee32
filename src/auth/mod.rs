//! Authentication Module
//!
//! Method negotiation and RFC 1929 username/password verification.

pub mod negotiator;

pub use negotiator::{AuthNegotiator, AuthOutcome, AuthPolicy};
