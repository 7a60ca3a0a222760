//! Shared error type across prisclient crates.

use std::io;

use thiserror::Error;

/// Failure classes of a hub session (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Dial failure or mid-stream I/O error.
    TransportError,
    /// Graceful end-of-stream from the hub.
    CleanDisconnect,
    /// Handshake reply was not a valid `proceed`.
    HandshakeRejected,
    /// Malformed envelope, inbound or outbound.
    ValidationRejected,
    /// Invalid construction-time configuration.
    ConfigurationError,
    /// Local invariant broken (channel closed, task died).
    Internal,
}

impl ErrorKind {
    /// String code used in diagnostics and metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::TransportError => "TRANSPORT",
            ErrorKind::CleanDisconnect => "DISCONNECTED",
            ErrorKind::HandshakeRejected => "HANDSHAKE_REJECTED",
            ErrorKind::ValidationRejected => "REJECTED",
            ErrorKind::ConfigurationError => "CONFIG",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    /// Whether the connection manager may retry after this failure.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::TransportError | ErrorKind::CleanDisconnect | ErrorKind::HandshakeRejected
        )
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PrisError>;

/// Unified error type used by core and session.
#[derive(Debug, Error)]
pub enum PrisError {
    #[error("config: {0}")]
    Config(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("hub closed the connection")]
    Disconnected,
    #[error("read timed out")]
    Timeout,
    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl PrisError {
    /// Map the error onto its failure class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PrisError::Config(_) => ErrorKind::ConfigurationError,
            PrisError::Transport(_) | PrisError::Timeout | PrisError::Decode(_) => {
                ErrorKind::TransportError
            }
            PrisError::Disconnected => ErrorKind::CleanDisconnect,
            PrisError::HandshakeRejected(_) => ErrorKind::HandshakeRejected,
            PrisError::Rejected(_) => ErrorKind::ValidationRejected,
            PrisError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<io::Error> for PrisError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => PrisError::Disconnected,
            io::ErrorKind::TimedOut => PrisError::Timeout,
            _ => PrisError::Transport(e.to_string()),
        }
    }
}
