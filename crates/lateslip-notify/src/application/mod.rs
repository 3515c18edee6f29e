//! Application layer for lateslip-notify.
//!
//! The application layer knows *what* the hub does: who is registered, who a
//! notification goes to, and who may connect.  It uses `tokio::sync`
//! primitives for the outbound queues but performs no I/O.
//!
//! # Responsibilities
//!
//! - The connection directory and its delivery primitives ([`Hub`])
//! - The hub-side connection handle and outbound queue ([`ConnectionHandle`])
//! - Typed late-slip notifications for request handlers ([`Notifier`])
//! - Resolving identities from upgrade requests ([`IdentitySource`])
//!
//! # What does NOT belong here?
//!
//! - Sockets, the WebSocket handshake, and the read/write loops (infrastructure)
//! - Tokio task spawning (infrastructure)

pub mod handle;
pub mod hub;
pub mod identity;
pub mod notifier;

pub use handle::{ConnectionHandle, ConnectionState, OutboundQueue};
pub use hub::{Hub, HubStats};
pub use identity::{IdentitySource, TrustedHeaders, UpgradeRejection, UpgradeRequest};
pub use notifier::Notifier;
