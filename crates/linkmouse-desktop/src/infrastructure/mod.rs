//! Infrastructure layer for the desktop application.
//!
//! Contains the adapters behind the application traits: the relay
//! collaborator, the platform pointer lock, the outbound delta forwarder, the
//! frame clock and the headless event loop, file-system storage, and the
//! command bridge used by the presentation layer.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `linkmouse_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod event_loop;
pub mod forwarding;
pub mod frame_clock;
pub mod pointer_lock;
pub mod relay;
pub mod storage;
pub mod ui_bridge;
