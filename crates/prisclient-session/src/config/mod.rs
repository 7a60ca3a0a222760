//! Client config loader (strict parsing).

pub mod client;
pub mod schema;

use std::fs;

use prisclient_core::error::{PrisError, Result};

pub use client::{SessionConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_RETRY_DELAY};
pub use schema::{ClientSection, FileConfig, HubSection, SessionSection};

pub fn load_from_file(path: &str) -> Result<FileConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| PrisError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<FileConfig> {
    let cfg: FileConfig = serde_yaml::from_str(s)
        .map_err(|e| PrisError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
