//! Protocol module containing the payload type, wire frames, and event builders.

pub mod events;
pub mod frames;
pub mod payload;

pub use events::{new_late_slip_request, status_changed};
pub use frames::{Frame, FrameError, FrameType, HEARTBEAT_JSON};
pub use payload::Payload;
