//! The late-slip record, as far as notifications are concerned.
//!
//! Late slips are stored by the request-handling service.  The hub only sees
//! them when a handler asks it to tell someone that a slip was created,
//! approved, or rejected, so this type carries exactly the fields that end up
//! inside a notification event.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::SubjectId;

/// Review status of a late-slip request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LateSlipStatus {
    Pending,
    Approved,
    Rejected,
}

impl LateSlipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LateSlipStatus::Pending => "pending",
            LateSlipStatus::Approved => "approved",
            LateSlipStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for LateSlipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A late-slip request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LateSlip {
    /// Hex object id of the slip.
    pub id: String,
    /// The student that submitted the slip.  Status notifications are
    /// unicast to this subject.
    pub student_id: SubjectId,
    pub reason: String,
    pub status: LateSlipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LateSlip {
    /// Builds a freshly submitted slip: `Pending`, both timestamps set to `now`.
    pub fn pending(
        id: impl Into<String>,
        student_id: impl Into<SubjectId>,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            student_id: student_id.into(),
            reason: reason.into(),
            status: LateSlipStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy with the review outcome applied.
    pub fn reviewed(&self, status: LateSlipStatus, at: DateTime<Utc>) -> Self {
        Self {
            status,
            updated_at: at,
            ..self.clone()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&LateSlipStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
    }

    #[test]
    fn test_pending_slip_has_equal_timestamps() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 45, 0).unwrap();
        let slip = LateSlip::pending("65e1", "s1", "bus was late", now);

        assert_eq!(slip.status, LateSlipStatus::Pending);
        assert_eq!(slip.created_at, slip.updated_at);
    }

    #[test]
    fn test_reviewed_keeps_creation_time() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 8, 45, 0).unwrap();
        let reviewed_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 10, 0).unwrap();
        let slip = LateSlip::pending("65e1", "s1", "bus was late", created);

        let approved = slip.reviewed(LateSlipStatus::Approved, reviewed_at);

        assert_eq!(approved.status, LateSlipStatus::Approved);
        assert_eq!(approved.created_at, created);
        assert_eq!(approved.updated_at, reviewed_at);
        assert_eq!(approved.student_id, slip.student_id);
    }
}
