//! The hub-side view of one connection.
//!
//! A [`ConnectionHandle`] is what the hub stores and what notification calls
//! touch.  It owns nothing that does I/O: just the producer end of the
//! connection's outbound queue, the connection's identity, and its lifecycle
//! state.  The consumer end ([`OutboundQueue`]) goes to the write loop.
//!
//! # Outbound queue
//!
//! ```text
//! request handlers ──enqueue()──┐
//! request handlers ──enqueue()──┼──▶ bounded mpsc (capacity N) ──▶ write loop
//! hub (CONNECTED)  ──enqueue()──┘
//! ```
//!
//! Many producers, exactly one consumer.  `enqueue` uses `try_send`, so a full
//! queue drops the *newest* payload instead of making the caller wait.
//!
//! # Closing the queue
//!
//! The only `Sender` lives inside an `Option` behind a small mutex.
//! [`ConnectionHandle::close_queue`] takes it out and drops it, which is how
//! the write loop learns that it should write a close frame and stop.  Taking
//! an `Option` twice yields `None` the second time, so closing is naturally
//! idempotent.
//!
//! # Lifecycle
//!
//! ```text
//! Connecting ──register──▶ Open ──first failure/eviction──▶ Closing ──loops joined──▶ Closed
//! ```
//!
//! The `Open → Closing` step is a compare-and-swap: whichever path gets there
//! first wins, every later attempt is a no-op.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tracing::debug;

use lateslip_core::{ConnectionId, Identity, Payload};

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Constructed, not yet registered with the hub.
    Connecting = 0,
    /// Registered; read and write loops running.
    Open = 1,
    /// Teardown started; loops are winding down.
    Closing = 2,
    /// Both loops finished and the transport is released.
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            2 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

struct Shared {
    id: ConnectionId,
    identity: Identity,
    sender: Mutex<Option<mpsc::Sender<Payload>>>,
    state: AtomicU8,
    /// Wakes the read loop when another path starts the teardown.
    closing: Notify,
}

/// Cloneable, non-owning reference to a connection.
///
/// Clones are cheap (`Arc`) and all refer to the same connection.
#[derive(Clone)]
pub struct ConnectionHandle(Arc<Shared>);

/// Consumer end of a connection's outbound queue.  Owned by the write loop.
pub struct OutboundQueue {
    rx: mpsc::Receiver<Payload>,
}

impl OutboundQueue {
    /// Waits for the next payload.  Returns `None` once the queue has been
    /// closed and everything queued before the close has been handed out.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }

    /// Takes the next payload without waiting.
    pub fn try_recv(&mut self) -> Option<Payload> {
        self.rx.try_recv().ok()
    }

    /// Number of payloads currently waiting.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding this lock cannot leave the Option half-updated.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConnectionHandle {
    /// Creates a handle in the `Connecting` state together with the consumer
    /// end of its outbound queue.
    ///
    /// A `capacity` of zero is bumped to one; `tokio::sync::mpsc` does not
    /// allow empty channels.
    pub fn new(identity: Identity, capacity: usize) -> (Self, OutboundQueue) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self(Arc::new(Shared {
            id: ConnectionId::new(),
            identity,
            sender: Mutex::new(Some(tx)),
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            closing: Notify::new(),
        }));
        (handle, OutboundQueue { rx })
    }

    pub fn id(&self) -> ConnectionId {
        self.0.id
    }

    pub fn identity(&self) -> &Identity {
        &self.0.identity
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.state.load(Ordering::Acquire))
    }

    /// Places `payload` on the outbound queue without waiting.
    ///
    /// Returns `true` if the payload was queued.  A full or closed queue drops
    /// the payload and returns `false`; neither is an error.
    pub fn enqueue(&self, payload: Payload) -> bool {
        let sender = lock(&self.0.sender);
        let Some(tx) = sender.as_ref() else {
            return false;
        };
        match tx.try_send(payload) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                debug!(
                    "connection {} ({}): outbound queue full, dropped {} byte payload",
                    self.0.id,
                    self.0.identity,
                    dropped.len()
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Closes the outbound queue so the write loop exits after draining it.
    ///
    /// Returns `true` only for the call that actually closed the queue.
    pub fn close_queue(&self) -> bool {
        lock(&self.0.sender).take().is_some()
    }

    /// `true` once [`close_queue`](Self::close_queue) has run.
    pub fn is_queue_closed(&self) -> bool {
        lock(&self.0.sender).is_none()
    }

    /// `Connecting → Open`.  Called by the hub after insertion.
    pub(crate) fn mark_open(&self) {
        let _ = self.0.state.compare_exchange(
            ConnectionState::Connecting as u8,
            ConnectionState::Open as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Starts the teardown and wakes the read loop.
    ///
    /// Returns `true` only for the call that moved the connection into
    /// `Closing`; later calls (from any path) change nothing.
    pub fn request_close(&self) -> bool {
        let mut current = self.0.state.load(Ordering::Acquire);
        loop {
            if current >= ConnectionState::Closing as u8 {
                return false;
            }
            match self.0.state.compare_exchange_weak(
                current,
                ConnectionState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        // `notify_one` stores a permit if the read loop is not waiting yet.
        self.0.closing.notify_one();
        true
    }

    /// Resolves once some path has called [`request_close`](Self::request_close).
    pub(crate) async fn closing_requested(&self) {
        self.0.closing.notified().await;
    }

    /// Final state; set after both loops have finished.
    pub(crate) fn mark_closed(&self) {
        self.0
            .state
            .store(ConnectionState::Closed as u8, Ordering::Release);
    }

    /// `true` when both handles refer to the same connection.
    pub fn same_connection(&self, other: &ConnectionHandle) -> bool {
        self.0.id == other.0.id
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.0.id)
            .field("identity", &self.0.identity)
            .field("state", &self.state())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn student(capacity: usize) -> (ConnectionHandle, OutboundQueue) {
        ConnectionHandle::new(Identity::student("s1"), capacity)
    }

    #[test]
    fn test_new_handle_starts_connecting() {
        let (handle, queue) = student(4);
        assert_eq!(handle.state(), ConnectionState::Connecting);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_enqueue_beyond_capacity_drops_newest() {
        // Arrange
        let (handle, mut queue) = student(2);

        // Act
        assert!(handle.enqueue(Payload::from("first")));
        assert!(handle.enqueue(Payload::from("second")));
        let third = handle.enqueue(Payload::from("third"));

        // Assert: the newest payload is the one that was dropped.
        assert!(!third);
        assert_eq!(queue.try_recv(), Some(Payload::from("first")));
        assert_eq!(queue.try_recv(), Some(Payload::from("second")));
        assert_eq!(queue.try_recv(), None);
    }

    #[test]
    fn test_zero_capacity_is_bumped_to_one() {
        let (handle, mut queue) = student(0);
        assert!(handle.enqueue(Payload::from("only")));
        assert!(!handle.enqueue(Payload::from("overflow")));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.try_recv(), Some(Payload::from("only")));
    }

    #[test]
    fn test_close_queue_is_idempotent() {
        let (handle, _queue) = student(4);
        assert!(handle.close_queue());
        assert!(!handle.close_queue());
        assert!(handle.is_queue_closed());
    }

    #[test]
    fn test_enqueue_after_close_is_dropped() {
        let (handle, mut queue) = student(4);
        handle.close_queue();
        assert!(!handle.enqueue(Payload::from("late")));
        assert_eq!(queue.try_recv(), None);
    }

    #[tokio::test]
    async fn test_closed_queue_drains_before_ending() {
        // Arrange: one payload queued before the close.
        let (handle, mut queue) = student(4);
        handle.enqueue(Payload::from("last words"));

        // Act
        handle.close_queue();

        // Assert: the queued payload still comes out, then the end marker.
        assert_eq!(queue.recv().await, Some(Payload::from("last words")));
        assert_eq!(queue.recv().await, None);
    }

    #[test]
    fn test_enqueue_after_consumer_dropped_is_dropped() {
        let (handle, queue) = student(4);
        drop(queue);
        assert!(!handle.enqueue(Payload::from("nobody listening")));
    }

    #[test]
    fn test_request_close_wins_once() {
        let (handle, _queue) = student(4);
        handle.mark_open();

        assert!(handle.request_close());
        assert!(!handle.request_close());
        assert_eq!(handle.state(), ConnectionState::Closing);
    }

    #[test]
    fn test_request_close_after_closed_is_noop() {
        let (handle, _queue) = student(4);
        handle.mark_closed();
        assert!(!handle.request_close());
        assert_eq!(handle.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_mark_open_does_not_reopen_closing_connection() {
        let (handle, _queue) = student(4);
        handle.request_close();
        handle.mark_open();
        assert_eq!(handle.state(), ConnectionState::Closing);
    }

    #[tokio::test]
    async fn test_close_request_before_wait_is_not_lost() {
        let (handle, _queue) = student(4);
        handle.request_close();

        // The permit stored by `notify_one` lets this resolve immediately.
        tokio::time::timeout(std::time::Duration::from_secs(1), handle.closing_requested())
            .await
            .expect("close request must be observed");
    }

    #[test]
    fn test_clones_refer_to_same_connection() {
        let (a, _qa) = student(4);
        let (b, _qb) = student(4);
        assert!(a.same_connection(&a.clone()));
        assert!(!a.same_connection(&b));
    }
}
