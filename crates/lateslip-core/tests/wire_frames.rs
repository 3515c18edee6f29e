//! Integration tests for the lateslip-core wire frames.
//!
//! These tests exercise the public API the way the hub and the request
//! handlers use it: build a frame or event, turn it into a [`Payload`], and
//! check the exact JSON a web client would receive.

use chrono::{TimeZone, Utc};
use lateslip_core::{
    new_late_slip_request, status_changed, Frame, FrameType, Identity, LateSlip, LateSlipStatus,
    MemberGroup, Payload, CONNECTED_MESSAGE, HEARTBEAT_JSON,
};
use serde_json::Value;

fn parse(payload: &Payload) -> Value {
    serde_json::from_slice(payload.as_bytes()).expect("payload must be valid JSON")
}

/// A slip submitted by a student and then approved produces one admin event
/// and one student event, both addressed through the slip's student id.
#[test]
fn test_slip_lifecycle_produces_admin_then_student_events() {
    // Arrange
    let submitted = Utc.with_ymd_and_hms(2024, 3, 1, 8, 45, 0).unwrap();
    let approved_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 0).unwrap();
    let slip = LateSlip::pending("65e1a0", "64f0c2", "train delay", submitted);
    let student = Identity::student(slip.student_id.clone());

    // Act
    let admin_event = new_late_slip_request("New late slip request from 64f0c2", &slip)
        .and_then(|f| f.to_payload())
        .expect("admin event");
    let approved = slip.reviewed(LateSlipStatus::Approved, approved_at);
    let student_event = status_changed(&approved)
        .and_then(|f| f.to_payload())
        .expect("student event");

    // Assert
    let admin_json = parse(&admin_event);
    assert_eq!(admin_json["type"], "NEW_LATE_SLIP_REQUEST");
    assert_eq!(admin_json["data"]["studentId"], student.subject.as_str());
    assert_eq!(admin_json["data"]["status"], "pending");

    let student_json = parse(&student_event);
    assert_eq!(student_json["type"], "LATE_SLIP_STATUS_CHANGED");
    assert_eq!(student_json["data"]["id"], "65e1a0");
    assert_eq!(
        student_json["message"],
        "Your late slip request has been approved"
    );
    assert_eq!(student.group, MemberGroup::Single);
}

/// Frames read back from the wire keep their type discriminant.
#[test]
fn test_frames_parse_back_into_frame_type() {
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 45, 0).unwrap();
    let payload = Frame::connected(at).to_payload().unwrap();

    let frame: Frame = serde_json::from_slice(payload.as_bytes()).unwrap();

    assert_eq!(frame.frame_type, FrameType::Connected);
    assert_eq!(frame.data["message"], "WebSocket connection established");
}

/// The constants the connection loops write verbatim are reachable from the
/// crate root and agree with the frame builders.
#[test]
fn test_root_constants_match_frame_builders() {
    // Arrange
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

    // Act
    let heartbeat = Frame::heartbeat_payload();
    let connected = parse(&Frame::connected(at).to_payload().expect("connected frame"));

    // Assert
    assert_eq!(heartbeat.as_text(), Some(HEARTBEAT_JSON));
    assert_eq!(connected["data"]["message"], CONNECTED_MESSAGE);
}
