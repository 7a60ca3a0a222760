//! Top-level facade crate for prisclient.
//!
//! Re-exports the envelope/auth primitives and the session engine so users
//! can depend on a single crate.

pub mod core {
    pub use prisclient_core::*;
}

pub mod session {
    pub use prisclient_session::*;
}
