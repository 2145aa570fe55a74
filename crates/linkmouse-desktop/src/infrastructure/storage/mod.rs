//! Storage infrastructure: configuration file persistence.
//!
//! The core persists nothing.  The only file the desktop reads is its own
//! settings: viewport geometry, capture options and where the relay lives.
//! The `config` sub-module loads it from the platform config directory and
//! falls back to defaults on first run.

pub mod config;
