//! prisclient core: envelope model, handshake credential, and envelope validation.
//!
//! This crate defines the wire-level contracts and error surface shared by the
//! session engine and any tooling that speaks the hub protocol. It carries no
//! transport or runtime dependencies so it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `PrisError`/`Result` so a long-running
//! adapter or responder does not crash on malformed traffic from the hub.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorKind, PrisError, Result};
