//! Notification entry points for request handlers.
//!
//! Handlers never talk to connections directly.  They hold a [`Notifier`]
//! (a cheap clone of an `Arc<Hub>`) and call one of:
//!
//! - [`Notifier::notify_unicast`] / [`Notifier::notify_broadcast`] for
//!   payloads they have already encoded, or
//! - the typed late-slip helpers, which build the event frame first.
//!
//! Every method is synchronous, returns nothing, and never waits: a
//! notification that cannot be delivered right now is dropped.

use std::sync::Arc;

use tracing::{debug, warn};

use lateslip_core::{new_late_slip_request, status_changed, Frame, FrameError, LateSlip, Payload, SubjectId};

use super::hub::Hub;

#[derive(Clone)]
pub struct Notifier {
    hub: Arc<Hub>,
}

impl Notifier {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Delivers `payload` to the student registered under `subject`, if any.
    pub fn notify_unicast(&self, subject: &SubjectId, payload: Payload) {
        self.hub.unicast(subject, payload);
    }

    /// Delivers `payload` to every admin connection.
    pub fn notify_broadcast(&self, payload: Payload) {
        self.hub.broadcast(payload);
    }

    /// Tells every admin that a student submitted `slip`.
    pub fn notify_admins_new_request(&self, message: &str, slip: &LateSlip) {
        match encode(new_late_slip_request(message, slip)) {
            Ok(payload) => {
                let delivered = self.hub.broadcast(payload);
                debug!("late slip {}: new-request event sent to {delivered} admin(s)", slip.id);
            }
            Err(e) => warn!("late slip {}: dropping new-request event: {e}", slip.id),
        }
    }

    /// Tells the slip's student that it was approved or rejected.
    pub fn notify_student_status(&self, slip: &LateSlip) {
        match encode(status_changed(slip)) {
            Ok(payload) => {
                if !self.hub.unicast(&slip.student_id, payload) {
                    debug!(
                        "late slip {}: student {} not reachable, status event dropped",
                        slip.id, slip.student_id
                    );
                }
            }
            Err(e) => warn!("late slip {}: dropping status event: {e}", slip.id),
        }
    }
}

fn encode(frame: Result<Frame, FrameError>) -> Result<Payload, FrameError> {
    frame.and_then(|f| f.to_payload())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handle::{ConnectionHandle, OutboundQueue};
    use chrono::{TimeZone, Utc};
    use lateslip_core::{FrameType, Identity, LateSlipStatus};

    fn connect(hub: &Hub, identity: Identity) -> OutboundQueue {
        let (handle, mut queue) = ConnectionHandle::new(identity, 8);
        hub.register(&handle);
        queue.try_recv().expect("CONNECTED frame");
        // The hub keeps its own clone of the handle.
        queue
    }

    fn frame_of(payload: Payload) -> Frame {
        serde_json::from_slice(payload.as_bytes()).unwrap()
    }

    fn slip() -> LateSlip {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 45, 0).unwrap();
        LateSlip::pending("65e1", "S1", "bus was late", at)
    }

    #[test]
    fn test_new_request_goes_to_admins_only() {
        // Arrange
        let hub = Arc::new(Hub::new());
        let notifier = Notifier::new(Arc::clone(&hub));
        let mut admin = connect(&hub, Identity::admin("A"));
        let mut student = connect(&hub, Identity::student("S1"));

        // Act
        notifier.notify_admins_new_request("New late slip request from S1", &slip());

        // Assert
        let frame = frame_of(admin.try_recv().expect("admin event"));
        assert_eq!(frame.frame_type, FrameType::NewLateSlipRequest);
        assert_eq!(frame.data["studentId"], "S1");
        assert_eq!(student.try_recv(), None);
    }

    #[test]
    fn test_status_change_goes_to_slip_owner() {
        // Arrange
        let hub = Arc::new(Hub::new());
        let notifier = Notifier::new(Arc::clone(&hub));
        let mut owner = connect(&hub, Identity::student("S1"));
        let mut other = connect(&hub, Identity::student("S2"));
        let approved = slip().reviewed(LateSlipStatus::Approved, Utc::now());

        // Act
        notifier.notify_student_status(&approved);

        // Assert
        let frame = frame_of(owner.try_recv().expect("owner event"));
        assert_eq!(frame.frame_type, FrameType::LateSlipStatusChanged);
        assert_eq!(frame.data["status"], "approved");
        assert_eq!(other.try_recv(), None);
    }

    #[test]
    fn test_status_change_for_offline_student_is_silent() {
        let hub = Arc::new(Hub::new());
        let notifier = Notifier::new(hub);
        // Must not panic or block.
        notifier.notify_student_status(&slip());
    }

    #[test]
    fn test_raw_unicast_and_broadcast_pass_payload_through() {
        let hub = Arc::new(Hub::new());
        let notifier = Notifier::new(Arc::clone(&hub));
        let mut admin = connect(&hub, Identity::admin("A"));
        let mut student = connect(&hub, Identity::student("S1"));

        notifier.notify_unicast(&SubjectId::new("S1"), Payload::from(r#"{"x":1}"#));
        notifier.notify_broadcast(Payload::from(r#"{"y":2}"#));

        assert_eq!(student.try_recv(), Some(Payload::from(r#"{"x":1}"#)));
        assert_eq!(admin.try_recv(), Some(Payload::from(r#"{"y":2}"#)));
        assert_eq!(student.try_recv(), None);
        assert_eq!(admin.try_recv(), None);
    }
}
