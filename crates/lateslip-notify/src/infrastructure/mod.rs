//! Infrastructure layer for lateslip-notify.
//!
//! The infrastructure layer handles all I/O: accepting TCP connections,
//! upgrading them to WebSocket sessions, and moving frames between the
//! sockets and the hub's outbound queues.
//!
//! # Responsibilities
//!
//! - Binding a TCP listener and running the accept loop
//! - Performing the WebSocket upgrade, including identity checks
//! - Running each connection's read and write loops
//! - Loading the TOML configuration file
//! - Handling the graceful shutdown signal
//!
//! # What does NOT belong here?
//!
//! - Deciding who receives a notification (that is the application layer)
//! - Frame and event definitions (that is `lateslip-core`)

pub mod config_file;
pub mod connection;
pub mod ws_server;

pub use config_file::{ConfigFile, ConfigFileError};
pub use connection::{Connection, ConnectionTask};
pub use ws_server::{run_server, serve};
