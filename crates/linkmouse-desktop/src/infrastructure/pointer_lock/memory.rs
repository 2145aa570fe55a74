//! In-memory pointer lock for the headless binary and for tests.
//!
//! Grants or refuses according to a [`GrantPolicy`], records the options each
//! request carried, and emits capture changes and injected input on an event
//! channel exactly where a real platform would report them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::application::dispatch::CoreEvent;
use linkmouse_core::WheelMode;

use crate::application::pointer_capture::{CaptureOptions, PointerLockPlatform};

/// How the fake platform answers capture requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantPolicy {
    Grant,
    Deny,
}

pub struct InMemoryPointerLock {
    policy: GrantPolicy,
    requests: Mutex<Vec<CaptureOptions>>,
    captured: AtomicBool,
    events: mpsc::UnboundedSender<CoreEvent>,
}

impl InMemoryPointerLock {
    /// Returns the adapter plus the receiver for the events it reports.
    pub fn new(policy: GrantPolicy) -> (Self, mpsc::UnboundedReceiver<CoreEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let lock = Self {
            policy,
            requests: Mutex::new(Vec::new()),
            captured: AtomicBool::new(false),
            events: tx,
        };
        (lock, rx)
    }

    /// Options passed with each capture request so far.
    pub fn requests(&self) -> Vec<CaptureOptions> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_captured(&self) -> bool {
        self.captured.load(Ordering::Acquire)
    }

    /// Reports a raw movement sample.  Dropped while not captured, as a real
    /// platform would deliver absolute moves instead.
    pub fn inject_movement(&self, dx: i32, dy: i32) {
        if self.is_captured() {
            self.emit(CoreEvent::Movement { dx, dy });
        }
    }

    /// Reports a button press or release.  Dropped while not captured.
    pub fn inject_button(&self, button: u8, pressed: bool) {
        if self.is_captured() {
            self.emit(CoreEvent::Button { button, pressed });
        }
    }

    /// Reports a wheel scroll.  Dropped while not captured.
    pub fn inject_wheel(&self, mode: WheelMode, dx: f64, dy: f64) {
        if self.is_captured() {
            self.emit(CoreEvent::Wheel { mode, dx, dy });
        }
    }

    /// Reports that the pointer re-entered the canvas.
    pub fn inject_pointer_entered(&self) {
        self.emit(CoreEvent::PointerEntered);
    }

    fn emit(&self, event: CoreEvent) {
        if self.events.send(event).is_err() {
            debug!("pointer lock event dropped: receiver closed");
        }
    }
}

#[async_trait]
impl PointerLockPlatform for InMemoryPointerLock {
    async fn request_exclusive_pointer_capture(
        &self,
        options: CaptureOptions,
    ) -> Result<(), String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(options);
        match self.policy {
            GrantPolicy::Grant => {
                if !self.captured.swap(true, Ordering::AcqRel) {
                    self.emit(CoreEvent::CaptureChanged(true));
                }
                Ok(())
            }
            GrantPolicy::Deny => Err("pointer lock refused by platform".to_string()),
        }
    }

    async fn release_pointer_capture(&self) {
        if self.captured.swap(false, Ordering::AcqRel) {
            self.emit(CoreEvent::CaptureChanged(false));
        }
    }
}
