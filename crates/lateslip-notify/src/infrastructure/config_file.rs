//! TOML configuration file for the notification hub.
//!
//! Every field is optional; anything missing falls back to the same defaults
//! as [`NotifyConfig::default`].  Example:
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 8001
//! log_level = "info"
//!
//! [connection]
//! queue_capacity = 256
//! max_frame_bytes = 512
//! read_timeout_secs = 60
//! write_timeout_secs = 10
//! heartbeat_secs = 30
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent, so a partial file (or an empty one)
//! is always valid input.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ConfigError, ConnectionLimits, NotifyConfig};

/// Error type for loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid bind address {0:?}")]
    InvalidAddress(String),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ConfigError),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub connection: ConnectionSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// IP address to bind.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionSection {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            max_frame_bytes: default_max_frame_bytes(),
            read_timeout_secs: default_read_timeout_secs(),
            write_timeout_secs: default_write_timeout_secs(),
            heartbeat_secs: default_heartbeat_secs(),
        }
    }
}

// ── Default value functions ───────────────────────────────────────────────────

fn default_bind_address() -> String {
    NotifyConfig::default().bind_addr.ip().to_string()
}
fn default_port() -> u16 {
    NotifyConfig::default().bind_addr.port()
}
fn default_log_level() -> String {
    NotifyConfig::default().log_level
}
fn default_queue_capacity() -> usize {
    ConnectionLimits::default().queue_capacity
}
fn default_max_frame_bytes() -> usize {
    ConnectionLimits::default().max_frame_bytes
}
fn default_read_timeout_secs() -> u64 {
    ConnectionLimits::default().read_timeout.as_secs()
}
fn default_write_timeout_secs() -> u64 {
    ConnectionLimits::default().write_timeout.as_secs()
}
fn default_heartbeat_secs() -> u64 {
    ConnectionLimits::default().heartbeat_interval.as_secs()
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl ConfigFile {
    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigFileError::Io`] if the file cannot be read,
    /// [`ConfigFileError::Parse`] if it is not valid TOML for this schema.
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigFileError> {
        Ok(toml::from_str(text)?)
    }

    /// Converts the file into a validated [`NotifyConfig`].
    ///
    /// # Errors
    ///
    /// [`ConfigFileError::InvalidAddress`] for an unparseable bind address,
    /// [`ConfigFileError::Invalid`] when the limits cannot work together.
    pub fn into_notify_config(self) -> Result<NotifyConfig, ConfigFileError> {
        let ip: IpAddr = self
            .server
            .bind_address
            .parse()
            .map_err(|_| ConfigFileError::InvalidAddress(self.server.bind_address.clone()))?;

        let config = NotifyConfig {
            bind_addr: SocketAddr::new(ip, self.server.port),
            limits: ConnectionLimits {
                queue_capacity: self.connection.queue_capacity,
                max_frame_bytes: self.connection.max_frame_bytes,
                read_timeout: Duration::from_secs(self.connection.read_timeout_secs),
                write_timeout: Duration::from_secs(self.connection.write_timeout_secs),
                heartbeat_interval: Duration::from_secs(self.connection.heartbeat_secs),
            },
            log_level: self.server.log_level,
        };
        config.validate()?;
        Ok(config)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
