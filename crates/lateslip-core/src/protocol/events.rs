//! Late-slip notification events.
//!
//! Request handlers build these frames and hand them to the hub:
//!
//! | Event                      | Audience         | Trigger                    |
//! |----------------------------|------------------|----------------------------|
//! | `NEW_LATE_SLIP_REQUEST`    | all admins       | a student submits a slip   |
//! | `LATE_SLIP_STATUS_CHANGED` | the slip's owner | an admin approves/rejects  |
//!
//! Field names inside `data` are camelCase because the web client reads them
//! directly.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::frames::{Frame, FrameError, FrameType};
use crate::domain::late_slip::{LateSlip, LateSlipStatus};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewRequestData<'a> {
    id: &'a str,
    student_id: &'a str,
    reason: &'a str,
    status: LateSlipStatus,
    created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusChangedData<'a> {
    id: &'a str,
    status: LateSlipStatus,
    updated_at: String,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builds the admin broadcast for a newly submitted slip.
///
/// # Errors
///
/// Returns [`FrameError::Json`] if the event data cannot be encoded.
pub fn new_late_slip_request(message: &str, slip: &LateSlip) -> Result<Frame, FrameError> {
    let data = NewRequestData {
        id: &slip.id,
        student_id: slip.student_id.as_str(),
        reason: &slip.reason,
        status: slip.status,
        created_at: timestamp(slip.created_at),
    };
    Ok(Frame {
        frame_type: FrameType::NewLateSlipRequest,
        message: Some(message.to_string()),
        data: serde_json::to_value(data)?,
    })
}

/// Builds the student unicast for a reviewed slip.
///
/// # Errors
///
/// Returns [`FrameError::Json`] if the event data cannot be encoded.
pub fn status_changed(slip: &LateSlip) -> Result<Frame, FrameError> {
    let data = StatusChangedData {
        id: &slip.id,
        status: slip.status,
        updated_at: timestamp(slip.updated_at),
    };
    Ok(Frame {
        frame_type: FrameType::LateSlipStatusChanged,
        message: Some(format!("Your late slip request has been {}", slip.status)),
        data: serde_json::to_value(data)?,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
