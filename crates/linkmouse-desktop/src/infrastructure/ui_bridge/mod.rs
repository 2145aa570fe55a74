//! Command bridge: exposes application-layer operations to the presentation
//! layer.
//!
//! Every command takes the shared [`AppState`] and returns a
//! [`CommandResult<T>`], so each response has the same JSON shape:
//! `{ success: bool, data: T | null, error: string | null }`.
//! The presentation layer is the only consumer of this module; it must NOT be
//! imported by the application or domain layers.
//!
//! # Data Transfer Objects (DTOs)
//!
//! Internal types such as [`SessionState`] or [`PointerState`] are mapped into
//! flat DTOs with only JSON-friendly fields.  The status DTO also carries the
//! derived flags the view needs (which group to render, whether to offer "new
//! link" or "restart"), so the view never re-derives lifecycle rules.

use std::sync::Arc;

use linkmouse_core::{PresenceGroup, SessionState};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::application::{
    dispatch::EventDispatcher,
    pointer_capture::{
        CaptureOutcome, CaptureTrigger, DeltaForwarder, PointerCaptureEngine, PointerLockPlatform,
    },
    session_control::{RelayCollaborator, SessionStateMachine},
};
use crate::infrastructure::storage::config::AppConfig;

// ── Shared application state ──────────────────────────────────────────────────

/// State shared between command handlers.
pub struct AppState {
    pub machine: Arc<SessionStateMachine>,
    /// Async mutex: commands and the event loop both await inside the engine.
    pub engine: Arc<Mutex<PointerCaptureEngine>>,
    /// Loaded once at startup; read-only afterwards.
    pub config: AppConfig,
}

impl AppState {
    /// Wires the session machine and the pointer engine around the given
    /// adapters.  The engine sees the machine's forwarding gate.
    pub fn new(
        config: AppConfig,
        relay: Arc<dyn RelayCollaborator>,
        platform: Arc<dyn PointerLockPlatform>,
        forwarder: Arc<dyn DeltaForwarder>,
    ) -> Arc<Self> {
        let machine = Arc::new(SessionStateMachine::new(relay));
        let engine = PointerCaptureEngine::new(
            config.engine_settings(),
            platform,
            forwarder,
            machine.forwarding_gate(),
        );
        Arc::new(Self {
            machine,
            engine: Arc::new(Mutex::new(engine)),
            config,
        })
    }

    /// A dispatcher routing events into this state's machine and engine.
    pub fn dispatcher(&self) -> EventDispatcher {
        EventDispatcher::new(Arc::clone(&self.machine), Arc::clone(&self.engine))
    }
}

// ── Data Transfer Objects ─────────────────────────────────────────────────────

/// Everything the status view renders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionStatusDto {
    pub state: SessionState,
    pub group: PresenceGroup,
    pub presents_as_awaiting: bool,
    pub link: Option<String>,
    pub share_url: Option<String>,
    pub can_rotate_link: bool,
    pub can_restart: bool,
    pub forwarding: bool,
    pub version: String,
    pub os: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkDto {
    pub link: String,
    pub share_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointerDto {
    pub render_x: i32,
    pub render_y: i32,
    pub report_x: i64,
    pub report_y: i64,
    pub captured: bool,
    pub ever_granted: bool,
}

/// Unified response wrapper used by every command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Returns the session status snapshot.
pub async fn get_session_status(state: Arc<AppState>) -> CommandResult<SessionStatusDto> {
    let cfg = &state.config;
    let current = state.machine.current_state();
    let identity = state.machine.current_link_identity();
    CommandResult::ok(SessionStatusDto {
        state: current,
        group: current.group(),
        presents_as_awaiting: current.presents_as_awaiting(),
        share_url: identity
            .as_ref()
            .map(|id| id.share_url(&cfg.relay.share_base_url)),
        link: identity.map(|id| id.as_str().to_string()),
        can_rotate_link: current.offers_link_rotation(),
        can_restart: current.offers_restart(),
        forwarding: current.licenses_forwarding(),
        version: cfg.desktop.version.clone(),
        os: std::env::consts::OS.to_string(),
    })
}

/// Requests a new link identity.
pub async fn rotate_link(state: Arc<AppState>) -> CommandResult<LinkDto> {
    match state.machine.rotate_link_identity().await {
        Ok(identity) => {
            CommandResult::ok(LinkDto {
                share_url: identity.share_url(&state.config.relay.share_base_url),
                link: identity.as_str().to_string(),
            })
        }
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Resets the relay transport.  The new lifecycle arrives as events.
pub async fn restart_connection(state: Arc<AppState>) -> CommandResult<LinkDto> {
    match state.machine.restart_connection().await {
        Ok(identity) => {
            CommandResult::ok(LinkDto {
                share_url: identity.share_url(&state.config.relay.share_base_url),
                link: identity.as_str().to_string(),
            })
        }
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Requests pointer capture in response to a click on the canvas.
///
/// Returns `true` if a new grant happened, `false` if already captured.
pub async fn request_capture(state: Arc<AppState>) -> CommandResult<bool> {
    let mut engine = state.engine.lock().await;
    match engine.request_capture(CaptureTrigger::UserGesture).await {
        Ok(CaptureOutcome::Granted) => CommandResult::ok(true),
        Ok(CaptureOutcome::AlreadyCaptured) => CommandResult::ok(false),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub async fn release_capture(state: Arc<AppState>) -> CommandResult<()> {
    state.engine.lock().await.release_capture().await;
    CommandResult::ok(())
}

/// Returns the pointer positions and capture flags.
pub async fn get_pointer_state(state: Arc<AppState>) -> CommandResult<PointerDto> {
    let engine = state.engine.lock().await;
    let pointer = engine.pointer();
    CommandResult::ok(PointerDto {
        render_x: pointer.render_x,
        render_y: pointer.render_y,
        report_x: pointer.report_x,
        report_y: pointer.report_y,
        captured: engine.is_captured(),
        ever_granted: engine.ever_granted(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
