//! Hub configuration types.
//!
//! [`NotifyConfig`] is the single source of truth for all runtime settings.
//! It can be built from a TOML file, CLI arguments, or defaults (useful for
//! local development and tests).
//!
//! # Design rationale
//!
//! Keeping configuration as plain structs (no global state, no environment
//! variable reads inside the domain) makes the hub easy to embed in tests.
//! The infrastructure layer and `main.rs` are responsible for populating the
//! structs from files, CLI args, or environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Smallest frame ceiling accepted by [`ConnectionLimits::validate`].
///
/// Anything lower would reject ordinary client pongs and close frames.
pub const MIN_FRAME_BYTES: usize = 64;

/// A configuration value that cannot work at runtime.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("queue capacity must be at least 1")]
    ZeroQueueCapacity,

    #[error("max frame size must be at least {min} bytes, got {0}", min = MIN_FRAME_BYTES)]
    FrameTooSmall(usize),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    /// Heartbeats carry the pings that keep the read deadline alive, so they
    /// must fire before the deadline does.
    #[error("heartbeat interval ({heartbeat:?}) must be shorter than the read timeout ({read_timeout:?})")]
    HeartbeatNotBeforeReadTimeout {
        heartbeat: Duration,
        read_timeout: Duration,
    },
}

/// Per-connection limits applied by the read and write loops.
///
/// | Field              | Default |
/// |--------------------|---------|
/// | queue_capacity     | 256     |
/// | max_frame_bytes    | 512     |
/// | read_timeout       | 60 s    |
/// | write_timeout      | 10 s    |
/// | heartbeat_interval | 30 s    |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionLimits {
    /// Capacity of each connection's outbound queue.  Payloads beyond this are
    /// dropped.
    pub queue_capacity: usize,

    /// Largest inbound frame/message accepted from a peer.  Larger frames
    /// close the connection.
    pub max_frame_bytes: usize,

    /// Maximum silence from the peer before the connection is considered dead.
    /// Re-armed by every inbound frame, including pongs.
    pub read_timeout: Duration,

    /// Upper bound on a single frame write.
    pub write_timeout: Duration,

    /// Write-loop idle time after which a heartbeat (and a ping) is sent.
    pub heartbeat_interval: Duration,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            max_frame_bytes: 512,
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

impl ConnectionLimits {
    /// Checks that the limits describe a connection that can stay alive.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.max_frame_bytes < MIN_FRAME_BYTES {
            return Err(ConfigError::FrameTooSmall(self.max_frame_bytes));
        }
        for (name, value) in [
            ("read timeout", self.read_timeout),
            ("write timeout", self.write_timeout),
            ("heartbeat interval", self.heartbeat_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration(name));
            }
        }
        if self.heartbeat_interval >= self.read_timeout {
            return Err(ConfigError::HeartbeatNotBeforeReadTimeout {
                heartbeat: self.heartbeat_interval,
                read_timeout: self.read_timeout,
            });
        }
        Ok(())
    }
}

/// All runtime configuration for the notification hub.
///
/// Build this once at startup and share it behind an `Arc`.
///
/// # Example
///
/// ```rust
/// use lateslip_notify::domain::NotifyConfig;
///
/// let cfg = NotifyConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 8001);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyConfig {
    /// Address the WebSocket server binds to.
    ///
    /// The server trusts identity headers set by the authenticating gateway,
    /// so in production it should only be reachable through that gateway.
    pub bind_addr: SocketAddr,

    pub limits: ConnectionLimits,

    /// Fallback `tracing` filter used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8001)),
            limits: ConnectionLimits::default(),
            log_level: "info".to_string(),
        }
    }
}

impl NotifyConfig {
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found in the connection limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limits.validate()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
