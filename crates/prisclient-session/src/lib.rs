//! prisclient session library entry.
//!
//! This crate wires configuration, the TCP transport, the connection manager,
//! and the relay loops into a reconnecting hub session. It is intended to be
//! consumed by the `pris-client` binary, by adapters and responders, and by
//! integration tests.

pub mod config;
pub mod obs;
pub mod session;
pub mod transport;

pub use session::Session;
