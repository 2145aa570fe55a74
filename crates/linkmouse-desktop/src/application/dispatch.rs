//! EventDispatcher: the single entry point for everything that mutates core
//! state.
//!
//! Session events, capture changes, movement samples, pointer re-entry and
//! frame ticks all arrive as one typed [`CoreEvent`] and are routed to the
//! session machine or the pointer engine.  Mutations therefore happen one at a
//! time in delivery order, even though the producers are independent tasks.
//!
//! The only coupling between the two components is the forwarding gate.  When
//! the gate closes while capture is active, the dispatcher releases capture so
//! local movement stops being collected for a peer that is no longer
//! controlling.

use std::sync::Arc;

use linkmouse_core::{RenderPosition, SessionEvent, SessionState, WheelMode};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::application::{
    forwarding_gate::ForwardingGate,
    pointer_capture::{CaptureTrigger, PointerCaptureEngine, SampleOutcome},
    session_control::{AttachmentToken, SessionAttachment, SessionError, SessionStateMachine},
};

/// Every input the core reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// A session event received through the attachment identified by `token`.
    Session {
        token: AttachmentToken,
        event: SessionEvent,
    },
    /// The OS capture flag changed.
    CaptureChanged(bool),
    /// One raw movement sample.
    Movement { dx: i32, dy: i32 },
    /// A mouse button went down (`pressed`) or up.
    Button { button: u8, pressed: bool },
    /// One wheel scroll.
    Wheel { mode: WheelMode, dx: f64, dy: f64 },
    /// The pointer re-entered the canvas.
    PointerEntered,
    /// Paint-frame tick.
    Frame,
}

/// What the presentation layer should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Nothing,
    /// The session state changed; re-render the status view.
    StateChanged(SessionState),
    /// Draw the cursor at this position.
    Redraw(RenderPosition),
}

pub struct EventDispatcher {
    machine: Arc<SessionStateMachine>,
    engine: Arc<Mutex<PointerCaptureEngine>>,
    gate: ForwardingGate,
    gate_was_open: bool,
}

impl EventDispatcher {
    pub fn new(machine: Arc<SessionStateMachine>, engine: Arc<Mutex<PointerCaptureEngine>>) -> Self {
        let gate = machine.forwarding_gate();
        let gate_was_open = gate.is_open();
        Self {
            machine,
            engine,
            gate,
            gate_was_open,
        }
    }

    /// Attaches to the session event stream through the machine, then syncs
    /// the gate.
    ///
    /// The reconciliation pull inside `attach` may move the session out of
    /// `CONTROLLING_STARTED` without a pushed event; capture is released here
    /// in that case, exactly as for a pushed event.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionStateMachine::attach`] errors.
    pub async fn attach(&mut self) -> Result<SessionAttachment, SessionError> {
        let attachment = self.machine.attach().await?;
        self.sync_gate().await;
        Ok(attachment)
    }

    pub async fn dispatch(&mut self, event: CoreEvent) -> DispatchOutcome {
        match event {
            CoreEvent::Session { token, event } => self.on_session_event(token, &event).await,
            CoreEvent::CaptureChanged(captured) => {
                self.engine.lock().await.on_capture_change(captured);
                DispatchOutcome::Nothing
            }
            CoreEvent::Movement { dx, dy } => {
                let outcome = self.engine.lock().await.on_movement_sample(dx, dy).await;
                if let SampleOutcome::Applied { released: true, .. } = outcome {
                    debug!("capture released by policy");
                }
                DispatchOutcome::Nothing
            }
            CoreEvent::Button { button, pressed } => {
                self.engine.lock().await.on_button(button, pressed);
                DispatchOutcome::Nothing
            }
            CoreEvent::Wheel { mode, dx, dy } => {
                self.engine.lock().await.on_wheel(mode, dx, dy);
                DispatchOutcome::Nothing
            }
            CoreEvent::PointerEntered => {
                let result = self
                    .engine
                    .lock()
                    .await
                    .request_capture(CaptureTrigger::PointerReentry)
                    .await;
                if let Err(e) = result {
                    debug!("re-entry did not re-acquire capture: {e}");
                }
                DispatchOutcome::Nothing
            }
            CoreEvent::Frame => match self.engine.lock().await.on_frame() {
                Some(pos) => DispatchOutcome::Redraw(pos),
                None => DispatchOutcome::Nothing,
            },
        }
    }

    async fn on_session_event(
        &mut self,
        token: AttachmentToken,
        event: &SessionEvent,
    ) -> DispatchOutcome {
        let before = self.machine.current_state();
        let after = self.machine.deliver(token, event);
        self.sync_gate().await;
        if after == before {
            DispatchOutcome::Nothing
        } else {
            DispatchOutcome::StateChanged(after)
        }
    }

    /// Releases capture if the gate has closed since the last check.
    ///
    /// Commands such as restart may change the state outside `dispatch`, so
    /// callers invoke this after running one.
    pub async fn sync_gate(&mut self) {
        let open = self.gate.is_open();
        if self.gate_was_open && !open {
            let mut engine = self.engine.lock().await;
            if engine.is_captured() {
                info!(
                    "forwarding gate closed in {}; releasing capture",
                    self.gate.observed_state()
                );
                engine.release_capture().await;
            }
        }
        self.gate_was_open = open;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
