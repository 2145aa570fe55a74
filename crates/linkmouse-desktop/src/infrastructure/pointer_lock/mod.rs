//! Platform pointer-lock adapters.
//!
//! A real platform grants exclusive relative capture only from inside a user
//! interaction, then reports the capture flag and raw movement asynchronously.
//! Adapters here implement [`PointerLockPlatform`] and feed those reports back
//! into the core as [`CoreEvent`]s.
//!
//! [`PointerLockPlatform`]: crate::application::pointer_capture::PointerLockPlatform
//! [`CoreEvent`]: crate::application::dispatch::CoreEvent

pub mod memory;

pub use memory::{GrantPolicy, InMemoryPointerLock};
