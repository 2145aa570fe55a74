//! The headless event loop.
//!
//! Multiplexes session events, platform events and frame ticks into the
//! [`EventDispatcher`] until the shutdown future completes or the relay closes
//! the session event stream.
//!
//! The shutdown future is pinned once for the whole loop.  A shutdown that
//! completes while an event is being dispatched is therefore seen on the next
//! turn instead of being dropped with a per-turn future.

use std::future::Future;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::application::dispatch::{CoreEvent, DispatchOutcome, EventDispatcher};
use crate::application::session_control::SessionAttachment;
use crate::infrastructure::frame_clock::FrameClock;

/// Why [`run_event_loop`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Shutdown,
    SessionStreamClosed,
}

/// Runs until `shutdown` completes or the attachment's stream ends.
pub async fn run_event_loop<S>(
    dispatcher: &mut EventDispatcher,
    attachment: &mut SessionAttachment,
    platform_rx: &mut mpsc::UnboundedReceiver<CoreEvent>,
    frames: &mut FrameClock,
    shutdown: S,
) -> LoopExit
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let token = attachment.token();

    loop {
        let event = tokio::select! {
            () = &mut shutdown => {
                info!("shutdown requested");
                return LoopExit::Shutdown;
            }
            maybe = attachment.next_event() => match maybe {
                Some(event) => CoreEvent::Session { token, event },
                None => {
                    warn!("relay closed the session event stream");
                    return LoopExit::SessionStreamClosed;
                }
            },
            Some(event) = platform_rx.recv() => event,
            _ = frames.tick() => CoreEvent::Frame,
        };

        match dispatcher.dispatch(event).await {
            DispatchOutcome::StateChanged(s) => info!("session is now {s}"),
            DispatchOutcome::Redraw(pos) => debug!(x = pos.x, y = pos.y, "redraw"),
            DispatchOutcome::Nothing => {}
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
