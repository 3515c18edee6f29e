//! Domain entities for the late-slip notification hub.
//!
//! This module contains pure data types with no infrastructure dependencies.
//!
//! # What lives here?
//!
//! - [`identity`] – the identity a connection is registered under: who the
//!   peer is and which delivery group it joins.
//! - [`late_slip`] – the late-slip record as seen by notifications.  The
//!   record itself is persisted elsewhere; the hub only ever needs the fields
//!   that end up inside an event.

pub mod identity;
pub mod late_slip;
