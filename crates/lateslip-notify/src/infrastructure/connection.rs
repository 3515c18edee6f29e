//! One upgraded WebSocket connection: the read loop and the write loop.
//!
//! Each connection runs as two Tokio tasks that share nothing but the
//! [`ConnectionHandle`]:
//!
//! ```text
//!             ┌──────────── write loop ────────────┐
//! queue ─────▶│ payload → Text/Binary frame        │──▶ socket
//!             │ idle 30 s → HEARTBEAT              │
//!             │ every 30 s → Ping                  │
//!             │ queue closed → Close frame, exit   │
//!             └────────────────────────────────────┘
//!             ┌──────────── read loop ─────────────┐
//! socket ────▶│ any frame → re-arm read deadline   │
//!             │ Close / error / deadline → exit    │
//!             │ close requested → exit             │
//!             └────────────────────────────────────┘
//! ```
//!
//! # Teardown
//!
//! Whichever loop fails first calls [`ConnectionHandle::request_close`].  The
//! read loop owns the rest of the teardown:
//!
//! 1. unregister from the hub (this also closes the outbound queue),
//! 2. wait for the write loop, which drains the queue and writes a close frame,
//! 3. drop its half of the socket,
//! 4. mark the connection `Closed`.
//!
//! The read loop's `JoinHandle` (wrapped in [`ConnectionTask`]) is therefore
//! the single join point for the whole connection.
//!
//! # Keepalive
//!
//! The HEARTBEAT text frame is idle-based, but a WebSocket `Ping` goes out
//! every heartbeat period regardless of traffic.  Clients answer pings
//! automatically, and every inbound frame (pongs included) re-arms the read
//! deadline, so a healthy client that only listens stays connected while a
//! half-open one is dropped after `read_timeout`.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{protocol::WebSocketConfig, Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, trace, warn};

use lateslip_core::{Identity, Payload, HEARTBEAT_JSON};

use crate::application::{ConnectionHandle, Hub, OutboundQueue};
use crate::domain::ConnectionLimits;

type WsSink<S> = SplitSink<WebSocketStream<S>, Message>;
type WsSource<S> = SplitStream<WebSocketStream<S>>;

/// Builds the tungstenite limits for a connection.
///
/// Both the per-frame and the reassembled-message ceilings are set, so a
/// fragmented message cannot slip past the frame limit.
pub fn ws_config(limits: &ConnectionLimits) -> WebSocketConfig {
    let mut config = WebSocketConfig::default();
    config.max_message_size = Some(limits.max_frame_bytes);
    config.max_frame_size = Some(limits.max_frame_bytes);
    config
}

/// An upgraded connection that has not been started yet.
pub struct Connection<S> {
    stream: WebSocketStream<S>,
    handle: ConnectionHandle,
    queue: OutboundQueue,
    limits: ConnectionLimits,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(stream: WebSocketStream<S>, identity: Identity, limits: ConnectionLimits) -> Self {
        let (handle, queue) = ConnectionHandle::new(identity, limits.queue_capacity);
        Self {
            stream,
            handle,
            queue,
            limits,
        }
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// Registers the connection with `hub` and spawns both loops.
    ///
    /// Registration happens before either loop runs, so the CONNECTED frame
    /// the hub queues is always the first frame the client sees.
    pub fn start(self, hub: &Arc<Hub>) -> ConnectionTask {
        let Connection {
            stream,
            handle,
            queue,
            limits,
        } = self;

        hub.register(&handle);

        let (sink, source) = stream.split();
        let writer = tokio::spawn(write_loop(sink, queue, handle.clone(), limits.clone()));
        let reader = tokio::spawn(read_loop(
            source,
            handle.clone(),
            Arc::clone(hub),
            writer,
            limits.read_timeout,
        ));

        ConnectionTask {
            handle,
            task: reader,
        }
    }
}

/// A running connection.  Awaiting [`join`](Self::join) waits for the full
/// teardown: both loops finished and the socket released.
pub struct ConnectionTask {
    handle: ConnectionHandle,
    task: JoinHandle<()>,
}

impl ConnectionTask {
    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!("connection {}: read task ended abnormally: {e}", self.handle.id());
        }
    }
}

// ── Read loop ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum ReadExit {
    CloseRequested,
    PeerClosed,
    PeerGone,
    Deadline(Duration),
    Transport(WsError),
}

async fn read_loop<S>(
    mut source: WsSource<S>,
    handle: ConnectionHandle,
    hub: Arc<Hub>,
    writer: JoinHandle<()>,
    read_timeout: Duration,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let exit = loop {
        tokio::select! {
            biased;
            _ = handle.closing_requested() => break ReadExit::CloseRequested,
            // A fresh timeout per frame: every inbound frame re-arms the deadline.
            next = timeout(read_timeout, source.next()) => match next {
                Err(_) => break ReadExit::Deadline(read_timeout),
                Ok(None) => break ReadExit::PeerGone,
                Ok(Some(Ok(Message::Close(_)))) => break ReadExit::PeerClosed,
                Ok(Some(Ok(msg))) => {
                    // Client messages carry no meaning; they only prove liveness.
                    trace!("connection {}: inbound {} byte frame", handle.id(), msg.len());
                }
                Ok(Some(Err(e))) => break ReadExit::Transport(e),
            }
        }
    };

    match &exit {
        ReadExit::CloseRequested | ReadExit::PeerClosed | ReadExit::PeerGone => {
            debug!("connection {} ({}): read loop done: {exit:?}", handle.id(), handle.identity());
        }
        ReadExit::Deadline(after) => {
            info!(
                "connection {} ({}): no frames for {after:?}, closing",
                handle.id(),
                handle.identity()
            );
        }
        ReadExit::Transport(e) => {
            info!("connection {} ({}): read error: {e}", handle.id(), handle.identity());
        }
    }

    handle.request_close();
    hub.unregister(&handle);
    if let Err(e) = writer.await {
        warn!("connection {}: write task ended abnormally: {e}", handle.id());
    }
    drop(source);
    handle.mark_closed();
    info!("connection {} ({}) closed", handle.id(), handle.identity());
}

// ── Write loop ────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
enum WriteError {
    #[error("write timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Transport(#[from] WsError),
}

async fn write_loop<S>(
    mut sink: WsSink<S>,
    mut queue: OutboundQueue,
    handle: ConnectionHandle,
    limits: ConnectionLimits,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match drive_writes(&mut sink, &mut queue, &limits).await {
        Ok(()) => debug!("connection {}: queue closed, close frame sent", handle.id()),
        Err(WriteError::Transport(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
            debug!("connection {}: peer already closed", handle.id());
        }
        Err(e) => info!("connection {} ({}): write failed: {e}", handle.id(), handle.identity()),
    }
    handle.request_close();
}

async fn drive_writes<S>(
    sink: &mut WsSink<S>,
    queue: &mut OutboundQueue,
    limits: &ConnectionLimits,
) -> Result<(), WriteError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let period = limits.heartbeat_interval;
    let first_tick = Instant::now() + period;
    // Re-armed by every payload: HEARTBEAT only fills silence.
    let mut heartbeat = interval_at(first_tick, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Never re-armed: a listen-only client must see a ping every period so
    // its pongs keep the read deadline fresh, however busy the queue is.
    let mut ping = interval_at(first_tick, period);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            next = queue.recv() => match next {
                Some(payload) => {
                    send_frame(sink, to_message(&payload), limits.write_timeout).await?;
                    heartbeat.reset();
                }
                None => {
                    timeout(limits.write_timeout, sink.close())
                        .await
                        .map_err(|_| WriteError::Timeout(limits.write_timeout))??;
                    return Ok(());
                }
            },
            _ = heartbeat.tick() => {
                send_frame(sink, Message::Text(HEARTBEAT_JSON.to_string()), limits.write_timeout).await?;
            }
            _ = ping.tick() => {
                send_frame(sink, Message::Ping(Vec::new()), limits.write_timeout).await?;
            }
        }
    }
}

async fn send_frame<S>(sink: &mut WsSink<S>, msg: Message, limit: Duration) -> Result<(), WriteError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    timeout(limit, sink.send(msg))
        .await
        .map_err(|_| WriteError::Timeout(limit))??;
    Ok(())
}

fn to_message(payload: &Payload) -> Message {
    match payload.as_text() {
        Some(text) => Message::Text(text.to_owned()),
        None => Message::Binary(payload.as_bytes().to_vec()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
