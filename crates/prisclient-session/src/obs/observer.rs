use std::fmt;
use std::time::Duration;

use crate::transport::conn::ConnState;

/// Severity of a reported event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    /// Non-retried connection failure; the process is expected to stop.
    Fatal,
}

/// Which way an envelope was travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Hub -> application.
    Inbound,
    /// Application -> hub.
    Outbound,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic events emitted by the connection manager and session engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged { from: ConnState, to: ConnState },
    /// Handshake accepted; `source` is the identity assigned by the hub.
    Engaged { source: String },
    HandshakeFailed { reason: String },
    TransportError { reason: String },
    /// Clean end-of-stream from the hub.
    Disconnected,
    RetryScheduled { delay: Duration },
    Rejected { direction: Direction, reason: String },
    Relayed { direction: Direction },
    /// Validator minted a correlation id for a command that had none.
    IdAssigned { id: String },
    /// Outbound envelope dropped because the session is not connected.
    DroppedNotConnected,
    Fatal { reason: String },
}

impl SessionEvent {
    pub fn level(&self) -> Level {
        match self {
            SessionEvent::StateChanged { .. }
            | SessionEvent::Relayed { .. }
            | SessionEvent::DroppedNotConnected => Level::Debug,
            SessionEvent::Engaged { .. } => Level::Info,
            SessionEvent::Disconnected
            | SessionEvent::RetryScheduled { .. }
            | SessionEvent::IdAssigned { .. } => Level::Warn,
            SessionEvent::HandshakeFailed { .. }
            | SessionEvent::TransportError { .. }
            | SessionEvent::Rejected { .. } => Level::Error,
            SessionEvent::Fatal { .. } => Level::Fatal,
        }
    }

    /// Human-readable summary; the event's fields travel alongside it.
    pub fn message(&self) -> &'static str {
        match self {
            SessionEvent::StateChanged { .. } => "connection state changed",
            SessionEvent::Engaged { .. } => "hub engaged",
            SessionEvent::HandshakeFailed { .. } => "handshake failed",
            SessionEvent::TransportError { .. } => "hub connection error",
            SessionEvent::Disconnected => "hub disconnected",
            SessionEvent::RetryScheduled { .. } => "auto retry scheduled",
            SessionEvent::Rejected { .. } => "invalid query dropped",
            SessionEvent::Relayed { .. } => "query relayed",
            SessionEvent::IdAssigned { .. } => "missing request id, assigned",
            SessionEvent::DroppedNotConnected => "not connected, outbound query dropped",
            SessionEvent::Fatal { .. } => "hub connection failed and auto retry is off",
        }
    }
}

/// Sink for session diagnostics, passed to the session at construction.
pub trait Observer: Send + Sync {
    fn report(&self, event: &SessionEvent);
}

/// Forwards events to `tracing` with structured fields.
#[derive(Debug, Default, Clone)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn report(&self, event: &SessionEvent) {
        let msg = event.message();
        match event.level() {
            Level::Debug => tracing::debug!(?event, "{msg}"),
            Level::Info => tracing::info!(?event, "{msg}"),
            Level::Warn => tracing::warn!(?event, "{msg}"),
            Level::Error => tracing::error!(?event, "{msg}"),
            Level::Fatal => tracing::error!(fatal = true, ?event, "{msg}"),
        }
    }
}
