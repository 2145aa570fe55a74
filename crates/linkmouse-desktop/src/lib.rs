//! linkmouse-desktop library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the desktop do? (for beginners)
//!
//! The desktop is the machine whose pointer is shared.  It:
//!
//! 1. Connects to the relay server and obtains a *link identity*, the token
//!    inside the short link the user shares.
//! 2. Follows the session lifecycle the relay pushes (waiting for a user, user
//!    connected, controlling, ...) and offers the matching commands (new link,
//!    restart connection).
//! 3. While the remote user is controlling, captures raw relative pointer
//!    movement on a preview canvas, draws a wrapped-around cursor at most once
//!    per frame, and forwards every movement delta to the remote session.

/// Application layer: the session state machine, the pointer capture engine,
/// and the event dispatch glue between them.
pub mod application;

/// Infrastructure layer: relay and pointer-lock adapters, the outbound
/// forwarder, the frame clock, configuration storage, and the UI bridge.
pub mod infrastructure;
