//! Domain layer for lateslip-notify.
//!
//! Pure configuration types with no dependencies on I/O, networking, or the
//! async runtime.  Identities, payloads, and frames live in `lateslip-core`
//! because request handlers need them too.
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `TcpStream`, or `WebSocket` types
//! - File I/O or environment variable reading

pub mod config;

pub use config::{ConfigError, ConnectionLimits, NotifyConfig};
