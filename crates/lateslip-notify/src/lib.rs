//! lateslip-notify library crate.
//!
//! Real-time notification hub for the late-slip workflow.  Students and
//! admins hold a WebSocket open; request handlers elsewhere in the backend
//! push events through a [`Notifier`](application::Notifier) without ever
//! waiting on a socket.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! request handlers ──Notifier──▶ Hub ──bounded queues──▶ write loops ──▶ clients
//!                                 ▲                                        │
//!                                 └──register/unregister── read loops ◀────┘
//!
//! [lateslip-notify]
//!   ├── domain/           NotifyConfig, ConnectionLimits, ConfigError
//!   ├── application/      Hub, ConnectionHandle, Notifier, IdentitySource
//!   └── infrastructure/
//!         ├── ws_server/    accept loop + upgrade handshake (tokio-tungstenite)
//!         ├── connection/   per-connection read and write loops
//!         └── config_file/  TOML config loading
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `lateslip-core`; it uses
//!   `tokio::sync` channels but never touches a socket.
//! - `infrastructure` depends on all other layers plus `tokio` and `tungstenite`.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: connection directory and notification delivery.
pub mod application;

/// Infrastructure layer: WebSocket server and connection loops.
pub mod infrastructure;
