//! LinkMouse desktop — headless entry point.
//!
//! Wires the session state machine and the pointer capture engine to their
//! adapters, then runs one event loop until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ AppState::new()              -- machine + engine around the adapters
//!  └─ machine.initialize()         -- relay handshake, first link identity
//!  └─ machine.attach()             -- subscribe + reconciliation pull
//!  └─ run_event_loop()           -- tokio::select! until Ctrl-C
//!       ├─ session event  -> EventDispatcher
//!       ├─ platform event -> EventDispatcher (capture change, movement, re-entry)
//!       ├─ frame tick     -> EventDispatcher (coalesced redraw)
//!       └─ Ctrl-C         -> detach and exit
//! ```
//!
//! # Usage
//!
//! ```text
//! linkmouse [--config <PATH>] [--log-level <LEVEL>]
//! ```
//!
//! `RUST_LOG` takes precedence over `--log-level`, which takes precedence over
//! `log_level` in the config file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use linkmouse_desktop::infrastructure::{
    event_loop::run_event_loop,
    forwarding::ChannelForwarder,
    frame_clock::FrameClock,
    pointer_lock::{GrantPolicy, InMemoryPointerLock},
    relay::InMemoryRelay,
    storage::config::{load_config, load_config_from},
    ui_bridge::AppState,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// LinkMouse desktop: share a link, let a remote peer drive the pointer.
#[derive(Debug, Parser)]
#[command(name = "linkmouse", version)]
struct Cli {
    /// Path to the TOML config file.  Defaults to the platform config dir.
    #[arg(long, env = "LINKMOUSE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level used when `RUST_LOG` is unset.  Overrides the config file.
    #[arg(long, env = "LINKMOUSE_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => load_config().context("failed to load config")?,
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.desktop.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    info!(
        version = %config.desktop.version,
        relay = %config.relay.server_url,
        "LinkMouse desktop starting"
    );

    // ── Adapters ──────────────────────────────────────────────────────────────
    let relay = Arc::new(InMemoryRelay::new());
    let (pointer_lock, mut platform_rx) = InMemoryPointerLock::new(GrantPolicy::Grant);
    let (forwarder, mut outbound_rx) = ChannelForwarder::new(config.relay.outbound_queue_capacity);
    let frame_rate = config.capture.frame_rate_hz;

    let state = AppState::new(
        config,
        relay,
        Arc::new(pointer_lock),
        Arc::new(forwarder),
    );

    // Peer transport stand-in: drains the outbound queue.
    tokio::spawn(async move {
        while let Some(line) = outbound_rx.recv().await {
            debug!(%line, "to peer");
        }
    });

    // ── Session ───────────────────────────────────────────────────────────────
    let identity = state
        .machine
        .initialize()
        .await
        .context("session initialization failed")?;
    info!(
        "share this link: {}",
        identity.share_url(&state.config.relay.share_base_url)
    );

    let mut dispatcher = state.dispatcher();
    let mut attachment = dispatcher
        .attach()
        .await
        .context("failed to attach to session events")?;
    let mut frames = FrameClock::new(frame_rate);

    info!("ready; press Ctrl-C to quit");

    // ── Event loop ────────────────────────────────────────────────────────────
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {e}");
        }
    };
    let exit = run_event_loop(
        &mut dispatcher,
        &mut attachment,
        &mut platform_rx,
        &mut frames,
        shutdown,
    )
    .await;
    debug!(?exit, "event loop finished");

    state.engine.lock().await.release_capture().await;
    state.machine.detach(attachment);
    info!("LinkMouse desktop stopped");
    Ok(())
}
