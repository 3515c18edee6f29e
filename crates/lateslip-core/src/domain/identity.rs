//! Identity types for hub connections.
//!
//! Every connection is registered under an [`Identity`]: the subject id the
//! upstream auth layer resolved, plus the [`MemberGroup`] that decides how the
//! hub addresses it.
//!
//! # Two kinds of members
//!
//! ```text
//! MemberGroup::Broadcast  (admins)    many connections, all receive broadcasts
//! MemberGroup::Single     (students)  one connection per subject id, unicast only
//! ```
//!
//! A student that opens a second tab replaces the first connection; an admin
//! that opens a second tab simply has two broadcast members.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque subject identifier supplied by the upstream auth layer.
///
/// The hub never interprets the contents.  In the late-slip backend it is the
/// hex object id of the student or admin record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Wraps a subject id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when the id is empty or only whitespace.
    ///
    /// The upgrade path rejects such ids before a connection is created.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SubjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// How the hub addresses a connection.  Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberGroup {
    /// Receives every broadcast (admins).  Any number per subject.
    Broadcast,
    /// Addressed by subject id (students).  At most one live connection per id.
    Single,
}

impl MemberGroup {
    /// Maps the upstream `is_admin` flag onto a group.
    pub fn from_is_admin(is_admin: bool) -> Self {
        if is_admin {
            MemberGroup::Broadcast
        } else {
            MemberGroup::Single
        }
    }

    /// Short label used in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            MemberGroup::Broadcast => "broadcast",
            MemberGroup::Single => "single",
        }
    }
}

/// The identity a connection is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub subject: SubjectId,
    pub group: MemberGroup,
}

impl Identity {
    /// Builds an identity from the pair the auth layer hands over.
    pub fn new(subject: impl Into<SubjectId>, is_admin: bool) -> Self {
        Self {
            subject: subject.into(),
            group: MemberGroup::from_is_admin(is_admin),
        }
    }

    /// Shorthand for an admin (broadcast-group) identity.
    pub fn admin(subject: impl Into<SubjectId>) -> Self {
        Self::new(subject, true)
    }

    /// Shorthand for a student (single-identity) identity.
    pub fn student(subject: impl Into<SubjectId>) -> Self {
        Self::new(subject, false)
    }

    pub fn is_admin(&self) -> bool {
        self.group == MemberGroup::Broadcast
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.group.as_str(), self.subject)
    }
}

/// Unique id of one physical connection.
///
/// Two connections for the same student share a [`SubjectId`] but never a
/// `ConnectionId`; the hub compares these to tell a stale unregister apart from
/// the current holder of the subject's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a fresh random (v4) id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first block of the UUID is enough to tell sessions apart in logs.
        let s = self.0.simple().to_string();
        f.write_str(&s[..8])
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
