//! In-process stand-in for the relay server.
//!
//! Behaves like the hosted relay from the desktop's point of view:
//!
//! - `initialize_session` connects and reports `CONNECTING_SERVER` then
//!   `SERVER_CONNECTED_WAITING_USER`.
//! - `restart_transport` reconnects and reports `CONNECTING_SERVER`.
//! - Rotating the identity while a user is connecting drops that attempt and
//!   reports `SERVER_CONNECTED_WAITING_USER`.
//! - The latest pushed event is kept for `resync_latest_session_event`.
//!
//! Tests drive the remote side through [`InMemoryRelay::push_event`] and the
//! `fail_*` switches.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use linkmouse_core::{LinkIdentity, SessionEvent, SessionState};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::session_control::{RelayCollaborator, SubscriptionId};

/// Length of the short link tokens minted by [`InMemoryRelay`].
const LINK_TOKEN_LEN: usize = 8;

#[derive(Default)]
struct RelayInner {
    subscribers: HashMap<SubscriptionId, mpsc::UnboundedSender<SessionEvent>>,
    latest: Option<SessionEvent>,
    identity: Option<LinkIdentity>,
    queued_identities: Vec<LinkIdentity>,
}

/// An in-memory [`RelayCollaborator`].
#[derive(Default)]
pub struct InMemoryRelay {
    inner: Mutex<RelayInner>,
    next_subscription: AtomicU64,
    fail_identity: AtomicBool,
    fail_transport: AtomicBool,
}

impl InMemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with a fixed identity instead of a generated one.
    pub fn with_identity(identity: impl Into<String>) -> Self {
        let relay = Self::new();
        relay.lock().identity = Some(LinkIdentity::new(identity));
        relay
    }

    /// The next rotation returns `identity` instead of a generated one.
    pub fn queue_identity(&self, identity: impl Into<String>) {
        self.lock().queued_identities.push(LinkIdentity::new(identity));
    }

    /// Makes identity fetch/rotate calls fail until reset.
    pub fn fail_identity(&self, fail: bool) {
        self.fail_identity.store(fail, Ordering::Relaxed);
    }

    /// Makes `initialize_session` and `restart_transport` fail until reset.
    pub fn fail_transport(&self, fail: bool) {
        self.fail_transport.store(fail, Ordering::Relaxed);
    }

    /// Emits `event` to every live subscriber and records it for resync.
    ///
    /// Subscribers whose receiving side has gone away are dropped.
    pub fn push_event(&self, event: SessionEvent) {
        let mut inner = self.lock();
        debug!(event = %event.name, subscribers = inner.subscribers.len(), "relay event");
        inner.latest = Some(event.clone());
        inner
            .subscribers
            .retain(|_, sink| sink.send(event.clone()).is_ok());
    }

    /// Convenience for [`push_event`](Self::push_event) with a known state.
    pub fn push_state(&self, state: SessionState) {
        self.push_event(SessionEvent::from(state));
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, RelayInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mint_identity() -> LinkIdentity {
        let simple = Uuid::new_v4().simple().to_string();
        LinkIdentity::new(&simple[..LINK_TOKEN_LEN])
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), String> {
        if flag.load(Ordering::Relaxed) {
            Err(format!("{what} unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RelayCollaborator for InMemoryRelay {
    async fn initialize_session(&self) -> Result<(), String> {
        Self::check(&self.fail_transport, "relay transport")?;
        {
            let mut inner = self.lock();
            if inner.identity.is_none() {
                inner.identity = Some(Self::mint_identity());
            }
        }
        self.push_state(SessionState::ConnectingServer);
        self.push_state(SessionState::ServerConnectedWaitingUser);
        info!("in-memory relay session initialized");
        Ok(())
    }

    async fn fetch_link_identity(&self) -> Result<LinkIdentity, String> {
        Self::check(&self.fail_identity, "identity service")?;
        self.lock()
            .identity
            .clone()
            .ok_or_else(|| "no link identity issued yet".to_string())
    }

    async fn rotate_link_identity(&self) -> Result<LinkIdentity, String> {
        Self::check(&self.fail_identity, "identity service")?;
        let (identity, drop_pending_user) = {
            let mut inner = self.lock();
            let next = if inner.queued_identities.is_empty() {
                Self::mint_identity()
            } else {
                inner.queued_identities.remove(0)
            };
            inner.identity = Some(next.clone());
            let pending = inner
                .latest
                .as_ref()
                .map(|e| e.state() == Ok(SessionState::UserConnecting))
                .unwrap_or(false);
            (next, pending)
        };
        if drop_pending_user {
            self.push_state(SessionState::ServerConnectedWaitingUser);
        }
        Ok(identity)
    }

    async fn resync_latest_session_event(&self) -> Result<Option<SessionEvent>, String> {
        Ok(self.lock().latest.clone())
    }

    async fn restart_transport(&self) -> Result<(), String> {
        Self::check(&self.fail_transport, "relay transport")?;
        info!("in-memory relay transport restarted");
        self.push_state(SessionState::ConnectingServer);
        Ok(())
    }

    async fn subscribe_session_events(
        &self,
        sink: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<SubscriptionId, String> {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.lock().subscribers.insert(id, sink);
        Ok(id)
    }

    fn unsubscribe_session_events(&self, id: SubscriptionId) {
        self.lock().subscribers.remove(&id);
    }
}
