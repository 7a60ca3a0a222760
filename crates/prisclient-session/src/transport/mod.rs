//! Transport layer (plain TCP to the hub).
//!
//! Exposes the streaming JSON codec, the dialer seam, and the connection
//! manager that owns dial + engage handshake and the retry policy.

pub mod codec;
pub mod conn;
pub mod dial;

pub use codec::{Inbound, QueryCodec};
pub use conn::{ConnState, ConnectionManager, Link};
pub use dial::{BoxedStream, Dialer, TcpDialer};
