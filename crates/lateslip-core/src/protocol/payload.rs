//! The opaque byte payload the hub queues and writes.
//!
//! The hub never looks inside a payload.  Upstream handlers produce JSON, the
//! hub frames it and writes it; that is the whole contract.
//!
//! # Why `Arc<[u8]>`?
//!
//! A broadcast hands the same payload to every admin connection.  Cloning an
//! `Arc` bumps a reference count instead of copying the bytes, so fanning out
//! to many connections costs one allocation in total.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::frames::FrameError;

/// An immutable, cheaply cloneable byte sequence.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Payload(Arc<[u8]>);

impl Payload {
    /// Serializes `value` as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Json`] if `value` cannot be represented as JSON
    /// (for example a map with non-string keys).
    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, FrameError> {
        let bytes = serde_json::to_vec(value)?;
        Ok(Self(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the payload as UTF-8 text, or `None` for non-UTF-8 bytes.
    ///
    /// The write loop uses this to pick a text or binary frame.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self(text.into_bytes().into())
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().into())
    }
}

impl From<&serde_json::Value> for Payload {
    fn from(value: &serde_json::Value) -> Self {
        // `Value`'s Display impl is compact JSON and cannot fail.
        Self::from(value.to_string())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => write!(f, "Payload({text:?})"),
            None => write!(f, "Payload({} bytes)", self.len()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
