//! Application configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::processing::DEFAULT_RECORD_BATCH_SIZE;

/// Largest accepted upload, 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection string
    pub database_url: String,
    /// Address the HTTP server listens on
    pub bind_addr: SocketAddr,
    pub max_upload_bytes: usize,
    /// Record points per bulk insert
    pub record_batch_size: usize,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            record_batch_size: DEFAULT_RECORD_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, reading `.env` first
    /// if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:fitvault.db".to_string()),
            bind_addr: parse_var("BIND_ADDR", "0.0.0.0:3000")?,
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", &DEFAULT_MAX_UPLOAD_BYTES.to_string())?,
            record_batch_size: parse_var(
                "RECORD_BATCH_SIZE",
                &DEFAULT_RECORD_BATCH_SIZE.to_string(),
            )?,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value: raw })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
