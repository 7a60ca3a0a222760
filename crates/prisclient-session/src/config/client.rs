//! Construction-time session options.

use std::time::Duration;

use prisclient_core::error::{PrisError, Result};
use prisclient_core::protocol::query::ClientType;

/// Fixed delay between reconnect attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Default depth of the inbound/outbound relay channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Immutable for the lifetime of one session: every reconnect reuses these
/// values with a fresh timestamp and credential.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub client_type: ClientType,
    pub source_id: String,
    /// Shared HMAC key; empty omits the credential from the engage command.
    pub secret: String,
    /// Reconnect after `retry_delay` instead of terminating on failure.
    pub auto_retry: bool,
    pub retry_delay: Duration,
    /// `None` waits forever on the handshake reply and on every read.
    pub read_timeout: Option<Duration>,
    pub channel_capacity: usize,
}

impl SessionConfig {
    /// Build a config, rejecting any client type other than adapter/responder.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        client_type: &str,
        source_id: impl Into<String>,
        secret: impl Into<String>,
        auto_retry: bool,
    ) -> Result<Self> {
        let cfg = Self {
            host: host.into(),
            port,
            client_type: client_type.parse()?,
            source_id: source_id.into(),
            secret: secret.into(),
            auto_retry,
            retry_delay: DEFAULT_RETRY_DELAY,
            read_timeout: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(PrisError::Config("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(PrisError::Config("port must not be 0".into()));
        }
        if self.channel_capacity == 0 {
            return Err(PrisError::Config("channel_capacity must be at least 1".into()));
        }
        Ok(())
    }
}
