//! SessionStateMachine: the event-sourced session lifecycle.
//!
//! The relay server is the only authority on what state the session is in.
//! This machine is a passive reducer over the events it pushes: it never
//! infers a transition from a local action.  What it adds on top of the pure
//! reducer in `linkmouse_core` is the plumbing around the relay:
//!
//! - **Attach / detach** – subscribe to the relay's event stream for the
//!   lifetime of a view.  Delivery is at-least-once with possible gaps, so
//!   every attach performs a mandatory *reconciliation pull*
//!   (`resync_latest_session_event`) to cover events that happened before the
//!   listener was installed.
//! - **Identity commands** – rotate the link identity or restart the
//!   transport, then refresh the cached identity.
//!
//! # Concurrency
//!
//! All methods take `&self`.  State and identity live in `tokio::sync::watch`
//! channels, so two commands may be in flight at once (e.g. a rotation
//! overlapping a restart).  Whichever call completes last writes its result
//! last; there is no internal queue.
//!
//! # Detach discipline
//!
//! [`SessionAttachment`] is a scoped guard: dropping it unsubscribes from the
//! relay and retires its token, on every exit path.  Events arriving through a
//! retired subscription have no observable effect.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use linkmouse_core::{reduce, LinkIdentity, SessionEvent, SessionState};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::application::forwarding_gate::ForwardingGate;

/// Identifier the relay hands back for a subscription.
pub type SubscriptionId = u64;

/// Generation value meaning "no attachment is active".
const NO_ATTACHMENT: u64 = 0;

/// Error type for session commands.
///
/// Every variant is recoverable: the cached state stays consistent and the
/// user may retry through an explicit command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("one-time session initialization failed: {0}")]
    InitializationFailed(String),
    #[error("link identity operation failed: {0}")]
    IdentityOperationFailed(String),
    #[error("transport reset failed: {0}")]
    TransportResetFailed(String),
    #[error("could not subscribe to session events: {0}")]
    SubscriptionFailed(String),
    #[error("could not resynchronize the latest session event: {0}")]
    ResyncFailed(String),
}

/// The relay/identity collaborator the machine consumes.
///
/// Infrastructure implementations talk to the relay server; test
/// implementations record calls.
#[async_trait]
pub trait RelayCollaborator: Send + Sync {
    /// One-time startup handshake.
    async fn initialize_session(&self) -> Result<(), String>;

    /// Returns the current link identity.
    async fn fetch_link_identity(&self) -> Result<LinkIdentity, String>;

    /// Asks the identity service for a new link identity.
    async fn rotate_link_identity(&self) -> Result<LinkIdentity, String>;

    /// Pull-based catch-up: the latest event the relay has emitted, if any.
    async fn resync_latest_session_event(&self) -> Result<Option<SessionEvent>, String>;

    /// Tears down and re-opens the relay transport.
    async fn restart_transport(&self) -> Result<(), String>;

    /// Starts pushing session events into `sink`.
    async fn subscribe_session_events(
        &self,
        sink: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<SubscriptionId, String>;

    /// Stops pushing events for `id`.  Must be cheap and non-blocking: it runs
    /// from `Drop`.
    fn unsubscribe_session_events(&self, id: SubscriptionId);
}

/// Copyable proof of which attachment an event was received through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentToken {
    generation: u64,
}

/// A live subscription to the relay's session events.
///
/// Obtain one from [`SessionStateMachine::attach`] and feed the events it
/// yields back through [`SessionStateMachine::deliver`].
pub struct SessionAttachment {
    id: SubscriptionId,
    generation: u64,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    relay: Arc<dyn RelayCollaborator>,
    active_generation: Arc<AtomicU64>,
}

impl SessionAttachment {
    pub fn token(&self) -> AttachmentToken {
        AttachmentToken {
            generation: self.generation,
        }
    }

    /// Waits for the next pushed event.  Returns `None` once the relay drops
    /// the subscription.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Returns an already-queued event without waiting.
    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }
}

impl Drop for SessionAttachment {
    fn drop(&mut self) {
        self.events.close();
        self.relay.unsubscribe_session_events(self.id);
        // Retire the token only if no newer attach has superseded it.
        let _ = self.active_generation.compare_exchange(
            self.generation,
            NO_ATTACHMENT,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        debug!(subscription = self.id, "session attachment released");
    }
}

/// The session state machine.
pub struct SessionStateMachine {
    relay: Arc<dyn RelayCollaborator>,
    state: watch::Sender<SessionState>,
    identity: watch::Sender<Option<LinkIdentity>>,
    next_generation: AtomicU64,
    active_generation: Arc<AtomicU64>,
}

impl SessionStateMachine {
    /// Creates a machine in `CONNECTING_SERVER` with no cached identity.
    pub fn new(relay: Arc<dyn RelayCollaborator>) -> Self {
        Self {
            relay,
            state: watch::Sender::new(SessionState::default()),
            identity: watch::Sender::new(None),
            next_generation: AtomicU64::new(NO_ATTACHMENT + 1),
            active_generation: Arc::new(AtomicU64::new(NO_ATTACHMENT)),
        }
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    pub fn current_state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn current_link_identity(&self) -> Option<LinkIdentity> {
        self.identity.borrow().clone()
    }

    /// Returns the read-only forwarding gate for the pointer engine.
    pub fn forwarding_gate(&self) -> ForwardingGate {
        ForwardingGate::new(self.state.subscribe())
    }

    /// Returns `true` if `token` belongs to the currently active attachment.
    pub fn is_attached(&self, token: AttachmentToken) -> bool {
        self.active_generation.load(Ordering::Acquire) == token.generation
    }

    // ── Event stream ──────────────────────────────────────────────────────────

    /// Subscribes to the relay's event stream, then pulls the latest known
    /// event and applies it.
    ///
    /// A newer attach supersedes any older one; events delivered with the old
    /// token are ignored from then on.
    ///
    /// The pull changes state outside any dispatcher.  Callers that drive a
    /// pointer engine attach through `EventDispatcher::attach`, which syncs
    /// the forwarding gate afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SubscriptionFailed`] if the relay refuses the
    /// subscription and [`SessionError::ResyncFailed`] if the reconciliation
    /// pull fails.  On either error nothing stays subscribed.
    pub async fn attach(&self) -> Result<SessionAttachment, SessionError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self
            .relay
            .subscribe_session_events(tx)
            .await
            .map_err(SessionError::SubscriptionFailed)?;

        let generation = self.next_generation.fetch_add(1, Ordering::AcqRel);
        self.active_generation.store(generation, Ordering::Release);
        let attachment = SessionAttachment {
            id,
            generation,
            events: rx,
            relay: Arc::clone(&self.relay),
            active_generation: Arc::clone(&self.active_generation),
        };
        info!(subscription = id, "attached to session events");

        // Dropping `attachment` on the error path unsubscribes.
        let latest = self
            .relay
            .resync_latest_session_event()
            .await
            .map_err(SessionError::ResyncFailed)?;
        match latest {
            Some(event) => {
                debug!(event = %event.name, "reconciled latest session event");
                self.on_event(&event);
            }
            None => debug!("relay has no session event to reconcile yet"),
        }

        Ok(attachment)
    }

    /// Unsubscribes.  Equivalent to dropping the attachment.
    pub fn detach(&self, attachment: SessionAttachment) {
        info!(subscription = attachment.id, "detaching from session events");
        drop(attachment);
    }

    /// Applies an event received through the attachment identified by `token`.
    ///
    /// Events carrying a retired token are dropped without effect.
    pub fn deliver(&self, token: AttachmentToken, event: &SessionEvent) -> SessionState {
        if !self.is_attached(token) {
            debug!(event = %event.name, "ignoring event from a retired attachment");
            return self.current_state();
        }
        self.on_event(event)
    }

    /// Adopts `event.name` if it is a recognized state; otherwise logs and
    /// keeps the current state.  Returns the state after the event.
    pub fn on_event(&self, event: &SessionEvent) -> SessionState {
        self.state.send_if_modified(|current| {
            let next = reduce(*current, event);
            if next == *current {
                return false;
            }
            info!("session state {} -> {}", current, next);
            *current = next;
            true
        });
        self.current_state()
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Performs the one-time startup handshake and caches the identity.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InitializationFailed`] or
    /// [`SessionError::IdentityOperationFailed`].
    pub async fn initialize(&self) -> Result<LinkIdentity, SessionError> {
        self.relay
            .initialize_session()
            .await
            .map_err(SessionError::InitializationFailed)?;
        self.refresh_link_identity().await
    }

    /// Re-fetches the identity from the collaborator and caches it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::IdentityOperationFailed`] if the fetch fails;
    /// the previously cached identity is kept.
    pub async fn refresh_link_identity(&self) -> Result<LinkIdentity, SessionError> {
        let identity = self
            .relay
            .fetch_link_identity()
            .await
            .map_err(SessionError::IdentityOperationFailed)?;
        self.identity.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    /// Requests a new link identity, then refreshes the cached one.
    ///
    /// A pending `USER_CONNECTING` belonged to the old link.  When the machine
    /// is in that state after rotation, the relay's latest event is pulled so
    /// the stale connection attempt is replaced by whatever the relay reports
    /// now.  That pull starts from `USER_CONNECTING`, where the forwarding
    /// gate is already closed, so it can never close the gate.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::IdentityOperationFailed`]; the cached identity
    /// is unchanged in that case.  Not retried automatically.
    pub async fn rotate_link_identity(&self) -> Result<LinkIdentity, SessionError> {
        let rotated = self
            .relay
            .rotate_link_identity()
            .await
            .map_err(SessionError::IdentityOperationFailed)?;
        debug!(identity = %rotated, "link identity rotated");
        let identity = self.refresh_link_identity().await?;
        info!(identity = %identity, "link identity is now current");

        if self.current_state() == SessionState::UserConnecting {
            match self.relay.resync_latest_session_event().await {
                Ok(Some(event)) => {
                    self.on_event(&event);
                }
                Ok(None) => {}
                Err(e) => warn!("resync after rotation failed: {e}"),
            }
        }
        Ok(identity)
    }

    /// Resets the relay transport, then refreshes the cached identity.
    ///
    /// The state itself is not touched: the relay reports the new lifecycle
    /// through events (normally `CONNECTING_SERVER` first).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::TransportResetFailed`] if the reset fails, or
    /// [`SessionError::IdentityOperationFailed`] if the refresh afterwards
    /// fails.
    pub async fn restart_connection(&self) -> Result<LinkIdentity, SessionError> {
        info!("restarting relay connection from {}", self.current_state());
        self.relay
            .restart_transport()
            .await
            .map_err(SessionError::TransportResetFailed)?;
        self.refresh_link_identity().await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
