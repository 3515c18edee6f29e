//! JSON frames written to connected clients.
//!
//! Every frame is a JSON object with a `"type"` discriminant, an optional
//! human-readable `"message"`, and a `"data"` field:
//!
//! ```json
//! {"type":"CONNECTED","data":{"message":"WebSocket connection established","timestamp":"2024-03-01T08:45:00.000Z"}}
//! {"type":"HEARTBEAT","data":null}
//! {"type":"NEW_LATE_SLIP_REQUEST","message":"New late slip request from 65e1","data":{...}}
//! ```
//!
//! The hub itself only produces `CONNECTED` and `HEARTBEAT`.  The late-slip
//! event frames are produced by the builders in [`super::events`] on behalf of
//! request handlers.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::payload::Payload;

/// Pre-serialized heartbeat frame.
///
/// The write loop sends this every heartbeat interval; keeping it as a
/// constant means the idle path never serializes anything.
pub const HEARTBEAT_JSON: &str = r#"{"type":"HEARTBEAT","data":null}"#;

/// Text carried by the `CONNECTED` frame.
pub const CONNECTED_MESSAGE: &str = "WebSocket connection established";

/// Errors that can occur while encoding a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame data could not be represented as JSON.
    #[error("failed to encode frame as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The `"type"` discriminant of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrameType {
    /// Sent once, right after the hub registers a connection.
    Connected,
    /// Periodic liveness frame from the write loop.
    Heartbeat,
    /// Broadcast to admins when a student submits a late slip.
    NewLateSlipRequest,
    /// Unicast to a student when an admin approves or rejects their slip.
    LateSlipStatusChanged,
}

/// One JSON frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Value,
}

/// Body of the `CONNECTED` frame.
#[derive(Debug, Serialize)]
struct ConnectedData<'a> {
    message: &'a str,
    timestamp: String,
}

impl Frame {
    /// The frame queued once per connection, right after registration.
    pub fn connected(at: DateTime<Utc>) -> Self {
        let data = ConnectedData {
            message: CONNECTED_MESSAGE,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        Self {
            frame_type: FrameType::Connected,
            message: None,
            // Two string fields: `to_value` cannot fail here.
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }

    /// The periodic liveness frame.  See also [`HEARTBEAT_JSON`].
    pub fn heartbeat() -> Self {
        Self {
            frame_type: FrameType::Heartbeat,
            message: None,
            data: Value::Null,
        }
    }

    /// The heartbeat frame as a ready-to-write payload.
    pub fn heartbeat_payload() -> Payload {
        Payload::from(HEARTBEAT_JSON)
    }

    /// Serializes the frame into a payload.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Json`] if the frame data cannot be encoded.
    pub fn to_payload(&self) -> Result<Payload, FrameError> {
        Payload::from_json(self)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_heartbeat_constant_matches_serialized_frame() {
        let payload = Frame::heartbeat().to_payload().unwrap();
        assert_eq!(payload.as_text(), Some(HEARTBEAT_JSON));
        assert_eq!(Frame::heartbeat_payload(), payload);
    }

    #[test]
    fn test_heartbeat_data_is_explicit_null() {
        let value: Value = serde_json::from_str(HEARTBEAT_JSON).unwrap();
        assert_eq!(value, json!({"type": "HEARTBEAT", "data": null}));
    }

    #[test]
    fn test_connected_frame_shape() {
        // Arrange
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 45, 0).unwrap();

        // Act
        let payload = Frame::connected(at).to_payload().unwrap();
        let value: Value = serde_json::from_slice(payload.as_bytes()).unwrap();

        // Assert
        assert_eq!(
            value,
            json!({
                "type": "CONNECTED",
                "data": {
                    "message": "WebSocket connection established",
                    "timestamp": "2024-03-01T08:45:00.000Z"
                }
            })
        );
    }

    #[test]
    fn test_frame_without_message_omits_field() {
        let text = serde_json::to_string(&Frame::heartbeat()).unwrap();
        assert!(!text.contains("message"));
    }

    #[test]
    fn test_frame_parses_back_from_wire() {
        let frame: Frame = serde_json::from_str(HEARTBEAT_JSON).unwrap();
        assert_eq!(frame, Frame::heartbeat());
    }
}
