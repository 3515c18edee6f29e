//! Late-slip notification hub: entry point.
//!
//! This binary accepts WebSocket connections from the late-slip web app and
//! keeps them open so the backend can push events to them:
//!
//! - admins (`/admin/ws`) receive every new late-slip request,
//! - students (`/student/ws`) receive status changes for their own slips.
//!
//! The hub sits behind the authenticating gateway, which forwards the
//! resolved identity as `x-subject-id` / `x-subject-role` headers.
//!
//! # Usage
//!
//! ```text
//! lateslip-notify [OPTIONS]
//!
//! Options:
//!   --config             <PATH>  TOML config file
//!   --bind               <IP>    Bind address [default: 0.0.0.0]
//!   --port               <PORT>  Listener port [default: 8001]
//!   --queue-capacity     <N>     Per-connection outbound queue [default: 256]
//!   --heartbeat-secs     <SECS>  Idle time before a heartbeat [default: 30]
//!   --read-timeout-secs  <SECS>  Silence before a peer is dropped [default: 60]
//!   --write-timeout-secs <SECS>  Limit on a single frame write [default: 10]
//!   --log-level          <LVL>   Log level when RUST_LOG is unset [default: info]
//! ```
//!
//! # Precedence
//!
//! CLI arguments override environment variables, which override the config
//! file, which overrides the built-in defaults.
//!
//! | Variable                         | Option                 |
//! |----------------------------------|------------------------|
//! | `LATESLIP_NOTIFY_CONFIG`         | `--config`             |
//! | `LATESLIP_NOTIFY_BIND`           | `--bind`               |
//! | `LATESLIP_NOTIFY_PORT`           | `--port`               |
//! | `LATESLIP_NOTIFY_QUEUE_CAPACITY` | `--queue-capacity`     |
//! | `LATESLIP_NOTIFY_HEARTBEAT`      | `--heartbeat-secs`     |
//! | `LATESLIP_NOTIFY_READ_TIMEOUT`   | `--read-timeout-secs`  |
//! | `LATESLIP_NOTIFY_WRITE_TIMEOUT`  | `--write-timeout-secs` |
//! | `LATESLIP_NOTIFY_LOG_LEVEL`      | `--log-level`          |

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lateslip_notify::application::{Hub, TrustedHeaders};
use lateslip_notify::domain::NotifyConfig;
use lateslip_notify::infrastructure::{run_server, ConfigFile};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Late-slip notification hub.
///
/// Every option is an override: anything left unset comes from the config
/// file, or from the built-in defaults when there is no file.
#[derive(Debug, Parser)]
#[command(
    name = "lateslip-notify",
    about = "Real-time WebSocket notifications for the late-slip workflow",
    version
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, env = "LATESLIP_NOTIFY_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind the WebSocket server to.
    #[arg(long, env = "LATESLIP_NOTIFY_BIND")]
    bind: Option<String>,

    /// TCP port for the WebSocket server.
    #[arg(long, env = "LATESLIP_NOTIFY_PORT")]
    port: Option<u16>,

    /// Outbound queue capacity per connection.  Notifications beyond this
    /// are dropped for that connection.
    #[arg(long, env = "LATESLIP_NOTIFY_QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,

    /// Seconds of outbound silence before a heartbeat and ping are sent.
    #[arg(long, env = "LATESLIP_NOTIFY_HEARTBEAT")]
    heartbeat_secs: Option<u64>,

    /// Seconds without any inbound frame before a peer is dropped.
    #[arg(long, env = "LATESLIP_NOTIFY_READ_TIMEOUT")]
    read_timeout_secs: Option<u64>,

    /// Upper bound in seconds on a single frame write.
    #[arg(long, env = "LATESLIP_NOTIFY_WRITE_TIMEOUT")]
    write_timeout_secs: Option<u64>,

    /// `tracing` filter used when `RUST_LOG` is not set.
    #[arg(long, env = "LATESLIP_NOTIFY_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Loads the config file (if any), applies the overrides, and validates.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    fn into_notify_config(self) -> anyhow::Result<NotifyConfig> {
        let mut file = match &self.config {
            Some(path) => ConfigFile::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => ConfigFile::default(),
        };

        if let Some(bind) = self.bind {
            file.server.bind_address = bind;
        }
        if let Some(port) = self.port {
            file.server.port = port;
        }
        if let Some(level) = self.log_level {
            file.server.log_level = level;
        }
        if let Some(capacity) = self.queue_capacity {
            file.connection.queue_capacity = capacity;
        }
        if let Some(secs) = self.heartbeat_secs {
            file.connection.heartbeat_secs = secs;
        }
        if let Some(secs) = self.read_timeout_secs {
            file.connection.read_timeout_secs = secs;
        }
        if let Some(secs) = self.write_timeout_secs {
            file.connection.write_timeout_secs = secs;
        }

        file.into_notify_config()
            .context("invalid notification hub configuration")
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and merged with the config file.
/// 2. `tracing_subscriber` is initialised; `RUST_LOG` wins over the
///    configured log level.
/// 3. A Ctrl+C handler clears the shared `running` flag.
/// 4. [`run_server`] accepts connections until the flag is cleared, then
///    closes every open connection.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_notify_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "late-slip notification hub starting on {} (queue={}, heartbeat={:?}, read timeout={:?})",
        config.bind_addr,
        config.limits.queue_capacity,
        config.limits.heartbeat_interval,
        config.limits.read_timeout
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    let hub = Arc::new(Hub::new());
    run_server(config, hub, Arc::new(TrustedHeaders), running).await?;

    info!("late-slip notification hub stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
