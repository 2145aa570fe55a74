//! Outbound delta forwarding.
//!
//! [`ChannelForwarder`] encodes each input with the remote-control text codec
//! and pushes it onto a bounded queue drained by the peer transport.  Sending
//! never blocks the sample path: when the queue is full the message is dropped
//! and counted.

use std::sync::atomic::{AtomicU64, Ordering};

use linkmouse_core::{encode_message, ControlMessage, WheelMode};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{trace, warn};

use crate::application::pointer_capture::DeltaForwarder;

pub struct ChannelForwarder {
    outbound: mpsc::Sender<String>,
    dropped: AtomicU64,
}

impl ChannelForwarder {
    /// Returns the forwarder and the receiving end of its outbound queue.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let forwarder = Self {
            outbound: tx,
            dropped: AtomicU64::new(0),
        };
        (forwarder, rx)
    }

    /// Messages discarded because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn send(&self, msg: ControlMessage) {
        let text = encode_message(&msg);
        match self.outbound.try_send(text) {
            Ok(()) => trace!(message = msg.name(), "queued for peer"),
            Err(TrySendError::Full(_)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(dropped = total, "outbound queue full; dropping {}", msg.name());
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!("outbound queue closed; dropping {}", msg.name());
            }
        }
    }
}

impl DeltaForwarder for ChannelForwarder {
    fn forward_movement_delta(&self, dx: i32, dy: i32) {
        self.send(ControlMessage::MouseMove { dx, dy });
    }

    fn forward_idle(&self) {
        self.send(ControlMessage::MouseIdle);
    }

    fn forward_button_down(&self, button: u8) {
        self.send(ControlMessage::MouseDown { button });
    }

    fn forward_button_up(&self, button: u8) {
        self.send(ControlMessage::MouseUp { button });
    }

    fn forward_wheel(&self, mode: WheelMode, dx: f64, dy: f64) {
        self.send(ControlMessage::Wheel { mode, dx, dy });
    }
}
