//! Resolving who is on the other end of an upgrade request.
//!
//! Authentication happens upstream: the gateway validates the caller's token
//! and forwards the request with the resolved identity attached.  This module
//! turns that request into an [`Identity`] or a rejection, before any
//! connection object exists.
//!
//! # Endpoints
//!
//! | Path          | Required role | Group       |
//! |---------------|---------------|-------------|
//! | `/admin/ws`   | `admin`       | broadcast   |
//! | `/student/ws` | `student`     | single      |
//!
//! # Rejections
//!
//! | Condition                         | HTTP status |
//! |-----------------------------------|-------------|
//! | missing or blank subject id       | 401         |
//! | role not allowed on this endpoint | 403         |
//! | any other path                    | 404         |

use thiserror::Error;

use lateslip_core::{Identity, SubjectId};

/// Header carrying the authenticated subject id.
pub const SUBJECT_HEADER: &str = "x-subject-id";

/// Header carrying the authenticated role (`admin` or `student`).
pub const ROLE_HEADER: &str = "x-subject-role";

pub const ADMIN_PATH: &str = "/admin/ws";
pub const STUDENT_PATH: &str = "/student/ws";

/// Why an upgrade request was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpgradeRejection {
    #[error("missing subject id")]
    MissingSubject,

    #[error("role {role:?} may not connect to {path}")]
    RoleNotAllowed { role: String, path: String },

    #[error("no WebSocket endpoint at {0}")]
    UnknownEndpoint(String),
}

impl UpgradeRejection {
    /// HTTP status sent back in place of the `101 Switching Protocols`.
    pub fn status_code(&self) -> u16 {
        match self {
            UpgradeRejection::MissingSubject => 401,
            UpgradeRejection::RoleNotAllowed { .. } => 403,
            UpgradeRejection::UnknownEndpoint(_) => 404,
        }
    }
}

/// The parts of an upgrade request that identity resolution looks at.
///
/// Header names are stored lowercase; lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub path: String,
    headers: Vec<(String, String)>,
}

impl UpgradeRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Turns an upgrade request into the identity the connection registers under.
#[cfg_attr(test, mockall::automock)]
pub trait IdentitySource: Send + Sync {
    /// # Errors
    ///
    /// Returns an [`UpgradeRejection`] when the request must not be upgraded.
    fn resolve(&self, request: &UpgradeRequest) -> Result<Identity, UpgradeRejection>;
}

/// Reads the identity the authenticating gateway attached as headers.
///
/// Only safe when the hub is reachable exclusively through that gateway.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustedHeaders;

impl IdentitySource for TrustedHeaders {
    fn resolve(&self, request: &UpgradeRequest) -> Result<Identity, UpgradeRejection> {
        let required_role = match request.path.as_str() {
            ADMIN_PATH => "admin",
            STUDENT_PATH => "student",
            other => return Err(UpgradeRejection::UnknownEndpoint(other.to_string())),
        };

        let subject = request
            .header(SUBJECT_HEADER)
            .map(|s| SubjectId::new(s.trim()))
            .filter(|s| !s.is_blank())
            .ok_or(UpgradeRejection::MissingSubject)?;

        let role = request.header(ROLE_HEADER).unwrap_or_default().trim();
        if !role.eq_ignore_ascii_case(required_role) {
            return Err(UpgradeRejection::RoleNotAllowed {
                role: role.to_string(),
                path: request.path.clone(),
            });
        }

        Ok(Identity::new(subject, required_role == "admin"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lateslip_core::MemberGroup;

    fn request(path: &str, subject: Option<&str>, role: Option<&str>) -> UpgradeRequest {
        let mut req = UpgradeRequest::new(path);
        if let Some(subject) = subject {
            req = req.with_header("X-Subject-Id", subject);
        }
        if let Some(role) = role {
            req = req.with_header("X-Subject-Role", role);
        }
        req
    }

    #[test]
    fn test_admin_endpoint_yields_broadcast_identity() {
        let identity = TrustedHeaders
            .resolve(&request("/admin/ws", Some("a1"), Some("admin")))
            .unwrap();
        assert_eq!(identity.subject.as_str(), "a1");
        assert_eq!(identity.group, MemberGroup::Broadcast);
    }

    #[test]
    fn test_student_endpoint_yields_single_identity() {
        let identity = TrustedHeaders
            .resolve(&request("/student/ws", Some(" s1 "), Some("student")))
            .unwrap();
        assert_eq!(identity.subject.as_str(), "s1");
        assert_eq!(identity.group, MemberGroup::Single);
    }

    #[test]
    fn test_missing_subject_is_unauthorized() {
        let err = TrustedHeaders
            .resolve(&request("/student/ws", None, Some("student")))
            .unwrap_err();
        assert_eq!(err, UpgradeRejection::MissingSubject);
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_blank_subject_is_unauthorized() {
        let err = TrustedHeaders
            .resolve(&request("/student/ws", Some("  "), Some("student")))
            .unwrap_err();
        assert_eq!(err, UpgradeRejection::MissingSubject);
    }

    #[test]
    fn test_student_on_admin_endpoint_is_forbidden() {
        let err = TrustedHeaders
            .resolve(&request("/admin/ws", Some("s1"), Some("student")))
            .unwrap_err();
        assert!(matches!(err, UpgradeRejection::RoleNotAllowed { .. }));
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_missing_role_is_forbidden() {
        let err = TrustedHeaders
            .resolve(&request("/admin/ws", Some("a1"), None))
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let err = TrustedHeaders
            .resolve(&request("/ws", Some("a1"), Some("admin")))
            .unwrap_err();
        assert_eq!(err, UpgradeRejection::UnknownEndpoint("/ws".to_string()));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = UpgradeRequest::new("/admin/ws").with_header("X-SUBJECT-ID", "a1");
        assert_eq!(req.header("x-subject-id"), Some("a1"));
        assert_eq!(req.header("X-Subject-Id"), Some("a1"));
        assert_eq!(req.header("x-other"), None);
    }
}
