//! Application layer use cases for the desktop.
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal.
//! - **Depend on abstractions** (traits) rather than concrete implementations,
//!   so the relay, the platform pointer lock, and the outbound channel can be
//!   swapped without changing this code.
//! - **Contain no OS calls, no network I/O, no file system access**.
//!
//! # Sub-modules
//!
//! - **`session_control`** – The event-sourced session state machine: attach
//!   and detach from the relay's event stream, reconcile missed events, rotate
//!   the link identity, restart the connection.
//!
//! - **`forwarding_gate`** – The read-only "may local input be forwarded"
//!   view of the session state handed to the pointer engine.
//!
//! - **`pointer_capture`** – Relative pointer capture: wraparound rendering,
//!   cumulative reports, frame coalescing, and per-sample forwarding.  This
//!   runs on every raw mouse event.
//!
//! - **`dispatch`** – The single event enum and the dispatcher that routes
//!   inbound events to the two components above.

pub mod dispatch;
pub mod forwarding_gate;
pub mod pointer_capture;
pub mod session_control;
