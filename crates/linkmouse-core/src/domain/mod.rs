//! Domain entities for LinkMouse.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain**.  Domain code:
//!
//! - Contains the core rules of the application.
//! - Has **no** imports from OS APIs, network libraries, or UI frameworks.
//! - Can be compiled and tested on any platform without any external setup.
//!
//! Here the domain is two small models: the externally driven session
//! lifecycle, and the bounded/unbounded pointer coordinates that relative
//! capture produces.

/// Session lifecycle: states, inbound events, the link identity token.
pub mod session;

/// Pointer geometry: viewport wraparound and cumulative movement reports.
pub mod pointer;
