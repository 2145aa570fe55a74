//! Session lifecycle domain model.
//!
//! The session state is **event-sourced**: the relay server pushes the name of
//! the state the session is now in, and the desktop simply adopts it.  Nothing
//! in this module infers a transition from a local action.
//!
//! # Lifecycle (for beginners)
//!
//! ```text
//! CONNECTING_SERVER ──► SERVER_CONNECTED_WAITING_USER ──► USER_CONNECTING ──► USER_CONNECTED
//!        ▲                                                                        │
//!        │                                              CONTROLLING_STARTED ◄─────┤
//!   (restart)                                                   │                 │
//!        │                                              CONTROLLING_STOPPED ◄─────┘
//! SERVER_DISCONNECTED                                           │
//!                                                      USER_DISCONNECTED
//! ```
//!
//! The arrows are only the usual order.  Because the relay is the source of
//! truth, any state may follow any other.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Raised when an inbound event carries a name this build does not know.
///
/// Never fatal: newer relays may introduce vocabulary that older desktops
/// must tolerate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognized session event: {name:?}")]
pub struct UnrecognizedSessionEvent {
    pub name: String,
}

/// The mutually exclusive lifecycle states pushed by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Opening the connection to the relay server.
    ConnectingServer,
    /// Relay reachable; the link is live and nobody has opened it yet.
    ServerConnectedWaitingUser,
    /// A remote user opened the link and is negotiating the peer channel.
    UserConnecting,
    /// Peer channel established; the remote user is idle.
    UserConnected,
    /// The remote user is actively controlling the pointer.
    ControllingStarted,
    /// The remote user paused control but is still connected.
    ControllingStopped,
    /// The remote user left.
    UserDisconnected,
    /// The relay dropped us (e.g. waited too long for a user).
    ServerDisconnected,
}

/// Presentation grouping derived from a [`SessionState`].  Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceGroup {
    /// Waiting for someone to open the link.
    AwaitingUser,
    /// A remote user is attached.
    UserPresent,
    /// Something went away; see [`SessionState::offers_restart`].
    Degraded,
}

impl SessionState {
    /// Every state, in lifecycle order.
    pub const ALL: [SessionState; 8] = [
        SessionState::ConnectingServer,
        SessionState::ServerConnectedWaitingUser,
        SessionState::UserConnecting,
        SessionState::UserConnected,
        SessionState::ControllingStarted,
        SessionState::ControllingStopped,
        SessionState::UserDisconnected,
        SessionState::ServerDisconnected,
    ];

    /// Returns the wire name used by the relay.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConnectingServer => "CONNECTING_SERVER",
            Self::ServerConnectedWaitingUser => "SERVER_CONNECTED_WAITING_USER",
            Self::UserConnecting => "USER_CONNECTING",
            Self::UserConnected => "USER_CONNECTED",
            Self::ControllingStarted => "CONTROLLING_STARTED",
            Self::ControllingStopped => "CONTROLLING_STOPPED",
            Self::UserDisconnected => "USER_DISCONNECTED",
            Self::ServerDisconnected => "SERVER_DISCONNECTED",
        }
    }

    /// Returns the presentation group for this state.
    pub fn group(self) -> PresenceGroup {
        match self {
            Self::ConnectingServer | Self::ServerConnectedWaitingUser | Self::UserConnecting => {
                PresenceGroup::AwaitingUser
            }
            Self::UserConnected | Self::ControllingStarted | Self::ControllingStopped => {
                PresenceGroup::UserPresent
            }
            Self::UserDisconnected | Self::ServerDisconnected => PresenceGroup::Degraded,
        }
    }

    /// `true` when the UI should render the "share your link" view.
    ///
    /// `USER_DISCONNECTED` is degraded but presents as awaiting: the link is
    /// still valid and a new user may open it.
    pub fn presents_as_awaiting(self) -> bool {
        self.group() == PresenceGroup::AwaitingUser || self == Self::UserDisconnected
    }

    /// Whether the "new link" command is conventionally offered.
    pub fn offers_link_rotation(self) -> bool {
        self.group() == PresenceGroup::AwaitingUser
    }

    /// Whether the "restart connection" remediation is offered.
    pub fn offers_restart(self) -> bool {
        self == Self::ServerDisconnected
    }

    /// The forwarding gate: local input may be sent to the remote peer only
    /// while the remote user is controlling.
    pub fn licenses_forwarding(self) -> bool {
        self == Self::ControllingStarted
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::ConnectingServer
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionState {
    type Err = UnrecognizedSessionEvent;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        SessionState::ALL
            .into_iter()
            .find(|s| s.as_str() == name)
            .ok_or_else(|| UnrecognizedSessionEvent {
                name: name.to_string(),
            })
    }
}

/// A state-change notification pushed (or resynced) from the relay.
///
/// `name` is kept as a raw string so that unknown vocabulary survives
/// deserialization and can be logged instead of rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub name: String,
}

impl SessionEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Parses the event name into a [`SessionState`].
    ///
    /// # Errors
    ///
    /// Returns [`UnrecognizedSessionEvent`] if the name is not a known state.
    pub fn state(&self) -> Result<SessionState, UnrecognizedSessionEvent> {
        self.name.parse()
    }
}

impl From<SessionState> for SessionEvent {
    fn from(state: SessionState) -> Self {
        Self::new(state.as_str())
    }
}

/// Applies one inbound event to the current state.
///
/// Recognized names replace the state outright; unrecognized names are logged
/// and leave `current` untouched.
pub fn reduce(current: SessionState, event: &SessionEvent) -> SessionState {
    match event.state() {
        Ok(next) => next,
        Err(e) => {
            warn!("{e}; keeping {current}");
            current
        }
    }
}

/// The opaque token that identifies the shareable address.
///
/// Generated and stored by the identity service; the desktop only displays
/// it and asks for a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkIdentity(String);

impl LinkIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Renders the address a user shares, e.g. `https://linkmouse.app/abcd`.
    pub fn share_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for LinkIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
