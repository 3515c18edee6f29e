//! # lateslip-core
//!
//! Shared library for the late-slip notification hub containing the identity
//! types, the JSON wire frames, and the late-slip notification events.
//!
//! This crate has zero dependencies on sockets, async runtimes, or the
//! WebSocket library.  Everything here is plain data plus serialization, so it
//! can be used both by the hub and by the request handlers that feed it.
//!
//! # Architecture overview (for beginners)
//!
//! Students submit late-slip requests and admins approve or reject them.  Both
//! kinds of users keep a WebSocket open so they hear about changes as they
//! happen.  The hub (in `lateslip-notify`) keeps track of those sockets.
//!
//! This crate (`lateslip-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – Who is on the other end of a connection: a
//!   [`SubjectId`], the [`MemberGroup`] it belongs to (admins receive
//!   broadcasts, students are addressed one by one), and the late-slip record
//!   that notifications describe.
//!
//! - **`protocol`** – What travels over the socket: the opaque [`Payload`]
//!   the hub queues, the fixed `CONNECTED` / `HEARTBEAT` frames, and the
//!   builders for late-slip notification events.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `lateslip_core::Identity` instead of `lateslip_core::domain::identity::Identity`.
pub use domain::identity::{ConnectionId, Identity, MemberGroup, SubjectId};
pub use domain::late_slip::{LateSlip, LateSlipStatus};
pub use protocol::events::{new_late_slip_request, status_changed};
pub use protocol::frames::{Frame, FrameError, FrameType, CONNECTED_MESSAGE, HEARTBEAT_JSON};
pub use protocol::payload::Payload;
