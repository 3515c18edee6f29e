//! Hub: the process-wide directory of live connections.
//!
//! Tracks every registered [`ConnectionHandle`], split into two containers:
//!
//! ```text
//! broadcast: ConnectionId -> handle   (admins; any number, all get broadcasts)
//! single:    SubjectId    -> handle   (students; at most one per subject)
//! ```
//!
//! # Locking
//!
//! Both containers sit behind one `std::sync::Mutex`, so a unicast or a
//! broadcast always sees a membership snapshot that is consistent with
//! concurrent register/unregister calls.  The lock is never held across an
//! `.await`: every operation here is synchronous, and the only thing done with
//! a target handle is a non-blocking `try_send`.
//!
//! `broadcast` goes one step further and copies the member list before
//! enqueueing, so the lock is released before any queue is touched.
//!
//! # Delivery semantics
//!
//! Fire-and-forget.  An offline subject, a full queue, or a connection that
//! closed a moment ago simply means the payload is dropped.  The return values
//! of [`Hub::unicast`] and [`Hub::broadcast`] exist for logging and tests;
//! callers are free to ignore them.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use lateslip_core::{ConnectionId, Frame, MemberGroup, Payload, SubjectId};

use super::handle::ConnectionHandle;

#[derive(Default)]
struct Members {
    broadcast: HashMap<ConnectionId, ConnectionHandle>,
    single: HashMap<SubjectId, ConnectionHandle>,
}

/// Member counts at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HubStats {
    pub broadcast_members: usize,
    pub single_members: usize,
}

impl HubStats {
    pub fn total(&self) -> usize {
        self.broadcast_members + self.single_members
    }
}

/// The connection registry.
///
/// Construct one per process (tests construct one per test) and share it as
/// `Arc<Hub>` with the WebSocket server and the [`Notifier`](super::Notifier).
#[derive(Default)]
pub struct Hub {
    members: Mutex<Members>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    fn members(&self) -> MutexGuard<'_, Members> {
        // Every mutation below leaves both maps valid at each step, so a
        // poisoned lock still guards a usable registry.
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues the connection's `CONNECTED` frame and adds it to the directory.
    ///
    /// The frame is queued before the handle becomes visible to `unicast` and
    /// `broadcast`, so it is always the first payload on the queue.
    ///
    /// Broadcast members are added to the broadcast set.  For single members,
    /// an existing connection under the same subject is evicted first: its
    /// queue is closed (so its write loop sends a close frame and exits) and it
    /// is removed before the new handle is inserted.
    ///
    /// Starting the read and write loops is the transport's job; see
    /// `Connection::start` in the infrastructure layer, which calls this.
    pub fn register(&self, handle: &ConnectionHandle) {
        let identity = handle.identity();
        match Frame::connected(Utc::now()).to_payload() {
            Ok(payload) => {
                handle.enqueue(payload);
            }
            Err(e) => warn!("connection {}: failed to encode CONNECTED frame: {e}", handle.id()),
        }

        let evicted = {
            let mut members = self.members();
            match identity.group {
                MemberGroup::Broadcast => {
                    members.broadcast.insert(handle.id(), handle.clone());
                    None
                }
                MemberGroup::Single => {
                    let previous = members.single.remove(&identity.subject);
                    if let Some(previous) = &previous {
                        previous.close_queue();
                    }
                    members.single.insert(identity.subject.clone(), handle.clone());
                    previous
                }
            }
        };

        if let Some(previous) = evicted {
            info!(
                "connection {} ({}) superseded by {}",
                previous.id(),
                identity,
                handle.id()
            );
        }

        handle.mark_open();

        debug!("connection {} ({}) registered", handle.id(), identity);
    }

    /// Removes a connection and closes its outbound queue.
    ///
    /// The directory entry is only removed if it still refers to *this*
    /// connection: a student's old connection unregistering late must not
    /// remove the newer connection that replaced it.  The queue is closed in
    /// every case, idempotently.
    ///
    /// Returns `true` if a directory entry was removed.
    pub fn unregister(&self, handle: &ConnectionHandle) -> bool {
        let identity = handle.identity();
        let removed = {
            let mut members = self.members();
            match identity.group {
                MemberGroup::Broadcast => members.broadcast.remove(&handle.id()).is_some(),
                MemberGroup::Single => {
                    let is_current = members
                        .single
                        .get(&identity.subject)
                        .is_some_and(|current| current.same_connection(handle));
                    if is_current {
                        members.single.remove(&identity.subject);
                    }
                    is_current
                }
            }
        };
        handle.close_queue();

        if removed {
            debug!("connection {} ({}) unregistered", handle.id(), identity);
        }
        removed
    }

    /// Queues `payload` for the connection registered under `subject`.
    ///
    /// Returns `true` if the payload was queued.  No connection, a full
    /// queue, or a closed queue all return `false` silently.
    pub fn unicast(&self, subject: &SubjectId, payload: Payload) -> bool {
        let target = self.members().single.get(subject).cloned();
        match target {
            Some(handle) => handle.enqueue(payload),
            None => {
                debug!("unicast to {subject}: not connected, dropped");
                false
            }
        }
    }

    /// Queues `payload` for every broadcast member.
    ///
    /// The member list is copied under the lock and the lock released before
    /// any queue is touched.  Returns the number of connections that accepted
    /// the payload.
    pub fn broadcast(&self, payload: Payload) -> usize {
        let targets: Vec<ConnectionHandle> = self.members().broadcast.values().cloned().collect();
        let delivered = targets
            .iter()
            .filter(|handle| handle.enqueue(payload.clone()))
            .count();
        debug!("broadcast queued for {delivered}/{} members", targets.len());
        delivered
    }

    /// `true` if a single-identity connection is registered for `subject`.
    pub fn is_connected(&self, subject: &SubjectId) -> bool {
        self.members().single.contains_key(subject)
    }

    pub fn stats(&self) -> HubStats {
        let members = self.members();
        HubStats {
            broadcast_members: members.broadcast.len(),
            single_members: members.single.len(),
        }
    }

    /// Empties the directory and closes every queue.  Used on shutdown.
    ///
    /// Each write loop then sends a close frame and each connection tears
    /// itself down.  Returns the number of connections closed.
    pub fn close_all(&self) -> usize {
        let drained: Vec<ConnectionHandle> = {
            let mut members = self.members();
            let broadcast = std::mem::take(&mut members.broadcast);
            let single = std::mem::take(&mut members.single);
            broadcast.into_values().chain(single.into_values()).collect()
        };
        for handle in &drained {
            handle.close_queue();
        }
        info!("closed {} connection(s)", drained.len());
        drained.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
