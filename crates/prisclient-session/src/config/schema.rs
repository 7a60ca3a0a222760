use std::time::Duration;

use serde::Deserialize;
use prisclient_core::error::{PrisError, Result};
use prisclient_core::protocol::query::ClientType;

use super::client::{SessionConfig, DEFAULT_CHANNEL_CAPACITY};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub version: u32,

    pub hub: HubSection,

    pub client: ClientSection,

    #[serde(default)]
    pub session: SessionSection,
}

impl FileConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PrisError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.hub.validate()?;
        self.client.validate()?;
        self.session.validate()?;

        Ok(())
    }

    /// Flatten the file sections into runtime session options.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            host: self.hub.host.clone(),
            port: self.hub.port,
            client_type: self.client.client_type,
            source_id: self.client.source_id.clone(),
            secret: self.client.secret.clone(),
            auto_retry: self.client.auto_retry,
            retry_delay: Duration::from_millis(self.session.retry_delay_ms),
            read_timeout: match self.session.read_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            channel_capacity: self.session.channel_capacity,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubSection {
    pub host: String,
    pub port: u16,
}

impl HubSection {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(PrisError::Config("hub.host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(PrisError::Config("hub.port must not be 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    #[serde(rename = "type")]
    pub client_type: ClientType,

    pub source_id: String,

    #[serde(default)]
    pub secret: String,

    #[serde(default)]
    pub auto_retry: bool,
}

impl ClientSection {
    pub fn validate(&self) -> Result<()> {
        if self.source_id.is_empty() {
            return Err(PrisError::Config("client.source_id must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSection {
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// 0 disables the read timeout.
    #[serde(default)]
    pub read_timeout_ms: u64,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            retry_delay_ms: default_retry_delay_ms(),
            read_timeout_ms: 0,
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl SessionSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=600000).contains(&self.retry_delay_ms) {
            return Err(PrisError::Config(
                "session.retry_delay_ms must be between 100 and 600000".into(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(PrisError::Config(
                "session.channel_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_retry_delay_ms() -> u64 {
    5000
}
fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}
