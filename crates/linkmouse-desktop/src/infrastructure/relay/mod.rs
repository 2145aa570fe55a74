//! Relay collaborator adapters.
//!
//! The relay server owns the session lifecycle and the link identity.  The
//! desktop talks to it through [`RelayCollaborator`]; this module holds the
//! adapters that implement that trait.
//!
//! Only the in-memory relay lives here today.  It plays the relay's role
//! faithfully enough for the headless binary and for tests: it pushes
//! lifecycle events, remembers the latest one for resync, and mints link
//! identities.
//!
//! [`RelayCollaborator`]: crate::application::session_control::RelayCollaborator

pub mod memory;

pub use memory::InMemoryRelay;
