//! # linkmouse-core
//!
//! Shared library for LinkMouse containing the session lifecycle model, the
//! pointer geometry used while relative capture is active, and the text wire
//! format for remote-control messages.
//!
//! It has zero dependencies on OS APIs, UI frameworks, or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! LinkMouse lets a user share a short link.  Whoever opens the link can take
//! temporary control of the local mouse pointer, with a relay server in the
//! middle.  This crate (`linkmouse-core`) is the pure foundation:
//!
//! - **`domain`** – The session lifecycle (`SessionState`, `SessionEvent`,
//!   `LinkIdentity`) and the pointer geometry (`Viewport`, `PointerState`,
//!   `CaptureLock`).  Everything here is plain data and pure functions.
//!
//! - **`protocol`** – How forwarded pointer movement travels over the relay's
//!   data channel: short comma-separated text messages such as
//!   `mousemove,4,-2` or `mousedown,0`.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `linkmouse_core::SessionState` instead of the full module path.
pub use domain::pointer::{CaptureLock, PointerState, RenderPosition, Viewport};
pub use domain::session::{
    reduce, LinkIdentity, PresenceGroup, SessionEvent, SessionState, UnrecognizedSessionEvent,
};
pub use protocol::codec::{decode_message, encode_message, ProtocolError};
pub use protocol::messages::{ControlMessage, WheelMode};
