//! WebSocket server: accept loop, upgrade handshake, and per-connection tasks.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections.
//! 3. Resolving the caller's identity *during* the HTTP upgrade, so a request
//!    that may not connect is answered with 401/403/404 and never becomes a
//!    WebSocket.
//! 4. Handing each upgraded stream to a [`Connection`], which registers with
//!    the hub and runs its read and write loops.
//! 5. Closing every registered connection once the `running` flag is cleared.
//!
//! # Scalability
//!
//! Each connection runs in its own Tokio task (two, in fact: see
//! [`connection`](super::connection)).  The accept loop never waits on a
//! handshake: it spawns a session task and goes straight back to `accept()`.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async_with_config;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Error as WsError;
use tracing::{debug, error, info, warn};

use lateslip_core::Identity;

use crate::application::{Hub, IdentitySource, UpgradeRejection, UpgradeRequest};
use crate::domain::{ConnectionLimits, NotifyConfig};
use crate::infrastructure::connection::{ws_config, Connection};

/// How often the accept loop re-checks the `running` flag when idle.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.bind_addr` and serves until `running` is set to `false`.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (e.g., the port is
/// already in use or the process lacks permission to bind).
pub async fn run_server(
    config: NotifyConfig,
    hub: Arc<Hub>,
    identities: Arc<dyn IdentitySource>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {}", config.bind_addr))?;

    info!("notification hub listening on {}", config.bind_addr);

    serve(listener, config.limits, hub, identities, running).await;
    Ok(())
}

/// Runs the accept loop on an already-bound listener.
///
/// On shutdown every registered connection is closed, so each client receives
/// a close frame once its queue has drained.
pub async fn serve(
    listener: TcpListener,
    limits: ConnectionLimits,
    hub: Arc<Hub>,
    identities: Arc<dyn IdentitySource>,
    running: Arc<AtomicBool>,
) {
    let limits = Arc::new(limits);

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new TCP connection from {peer_addr}");
                let limits = Arc::clone(&limits);
                let hub = Arc::clone(&hub);
                let identities = Arc::clone(&identities);
                tokio::spawn(async move {
                    handle_session(stream, peer_addr, limits, hub, identities).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g. out of file descriptors); keep serving.
                error!("accept error: {e}");
            }
            Err(_) => {
                // No connection in the last poll window; re-check the flag.
            }
        }
    }

    hub.close_all();
}

// ── Per-session handler ───────────────────────────────────────────────────────

async fn handle_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    limits: Arc<ConnectionLimits>,
    hub: Arc<Hub>,
    identities: Arc<dyn IdentitySource>,
) {
    match run_session(raw_stream, peer_addr, limits, hub, identities).await {
        Ok(()) => debug!("session {peer_addr} finished"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

/// Upgrades one TCP stream and runs the resulting connection to completion.
///
/// # Errors
///
/// Returns an error if the handshake fails for a reason other than an
/// identity rejection (which is answered and logged inside the handshake).
async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    limits: Arc<ConnectionLimits>,
    hub: Arc<Hub>,
    identities: Arc<dyn IdentitySource>,
) -> anyhow::Result<()> {
    let mut identity: Option<Identity> = None;
    let callback = |request: &Request, response: Response| {
        match authorize(request, identities.as_ref()) {
            Ok(resolved) => {
                identity = Some(resolved);
                Ok(response)
            }
            Err(rejection) => {
                info!("session {peer_addr}: upgrade refused: {rejection}");
                Err(rejection_response(&rejection))
            }
        }
    };

    let ws_stream =
        match accept_hdr_async_with_config(raw_stream, callback, Some(ws_config(&limits))).await {
            Ok(stream) => stream,
            Err(WsError::Http(_)) => return Ok(()),
            Err(e) => {
                return Err(e).with_context(|| format!("WebSocket handshake failed with {peer_addr}"))
            }
        };

    let identity = identity.context("handshake accepted without a resolved identity")?;
    info!("session {peer_addr}: WebSocket established for {identity}");

    let task = Connection::new(ws_stream, identity, (*limits).clone()).start(&hub);
    task.join().await;
    Ok(())
}

/// Resolves the identity for an upgrade request.
///
/// # Errors
///
/// Returns the source's rejection unchanged.
pub fn authorize(
    request: &Request,
    identities: &dyn IdentitySource,
) -> Result<Identity, UpgradeRejection> {
    identities.resolve(&upgrade_request(request))
}

fn upgrade_request(request: &Request) -> UpgradeRequest {
    let mut upgrade = UpgradeRequest::new(request.uri().path());
    for (name, value) in request.headers() {
        // Non-ASCII header values cannot carry an identity; skip them.
        if let Ok(value) = value.to_str() {
            upgrade = upgrade.with_header(name.as_str(), value);
        }
    }
    upgrade
}

fn rejection_response(rejection: &UpgradeRejection) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(rejection.to_string()));
    *response.status_mut() =
        StatusCode::from_u16(rejection.status_code()).unwrap_or(StatusCode::FORBIDDEN);
    response
}

// ── Tests ─────────────────────────────────────────────────────────────────────
