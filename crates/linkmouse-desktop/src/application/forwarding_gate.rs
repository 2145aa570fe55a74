//! The one datum that flows from the session machine to the pointer engine.
//!
//! [`ForwardingGate`] is a read-only view of the session state.  It answers a
//! single question: may local input be sent to the remote peer right now?
//! The engine never writes through it.

use linkmouse_core::SessionState;
use tokio::sync::watch;

/// Read-only view of the session state, open only in `CONTROLLING_STARTED`.
#[derive(Debug, Clone)]
pub struct ForwardingGate {
    state: watch::Receiver<SessionState>,
}

impl ForwardingGate {
    pub fn new(state: watch::Receiver<SessionState>) -> Self {
        Self { state }
    }

    /// A gate pinned to `state`.  Useful for tests and for running the engine
    /// without a session.
    pub fn fixed(state: SessionState) -> Self {
        let (_tx, rx) = watch::channel(state);
        Self { state: rx }
    }

    pub fn is_open(&self) -> bool {
        self.state.borrow().licenses_forwarding()
    }

    /// The session state the gate is currently looking at.
    pub fn observed_state(&self) -> SessionState {
        *self.state.borrow()
    }
}
