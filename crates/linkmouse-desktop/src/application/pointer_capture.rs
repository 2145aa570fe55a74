//! PointerCaptureEngine: relative pointer capture for the preview canvas.
//!
//! While the OS grants exclusive capture, the real cursor stops moving and the
//! engine receives raw `(dx, dy)` samples instead.  For each sample it:
//!
//! 1. moves the bounded render position, wrapping at the viewport margins;
//! 2. adds the delta to the unbounded cumulative report;
//! 3. marks a redraw as pending (coalesced to one per frame);
//! 4. forwards the delta to the remote peer when the forwarding gate is open;
//! 5. applies the auto-release policy.
//!
//! Button presses and wheel scrolls received during capture are forwarded
//! under the same gate; they do not move the render position.
//!
//! # Capture grants (for beginners)
//!
//! Platforms only hand out exclusive pointer capture from inside a direct user
//! interaction such as a click.  After the first grant the page may silently
//! re-acquire capture, for example when the pointer re-enters the canvas.
//! [`CaptureTrigger`] tells the engine which of the two situations a request
//! comes from, and [`CaptureLock`] remembers whether a grant ever happened.

use std::sync::Arc;

use async_trait::async_trait;
use linkmouse_core::{CaptureLock, PointerState, RenderPosition, Viewport, WheelMode};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::application::forwarding_gate::ForwardingGate;

/// Error type for capture requests.  Neither variant is fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    /// The platform refused the request.  A fresh user interaction is needed.
    #[error("pointer capture denied: {0}")]
    CaptureDenied(String),
    /// A silent re-acquire was attempted before any grant happened.
    #[error("pointer capture requires a user gesture before it can be re-acquired")]
    GestureRequired,
}

/// Options passed to the platform with every capture request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Ask for unaccelerated deltas straight from the device.
    pub raw_deltas: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self { raw_deltas: true }
    }
}

/// Why a capture request is being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTrigger {
    /// A click or similar direct interaction.
    UserGesture,
    /// The pointer re-entered the canvas; only allowed after a prior grant.
    PointerReentry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Granted,
    AlreadyCaptured,
}

/// Auto-release rule: end capture once the cumulative X report turns
/// positive.  Kept configurable because its product intent is unconfirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoReleasePolicy {
    OnPositiveReportX,
    Disabled,
}

impl AutoReleasePolicy {
    pub fn from_flag(enabled: bool) -> Self {
        if enabled {
            Self::OnPositiveReportX
        } else {
            Self::Disabled
        }
    }
}

/// What happened to one movement sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Capture was not active (or a release was in progress).
    Ignored,
    Applied { forwarded: bool, released: bool },
}

/// The platform's exclusive pointer-capture facility.
///
/// The platform reports the actual capture flag asynchronously through
/// [`PointerCaptureEngine::on_capture_change`]; a successful request only means
/// the platform accepted it.
#[async_trait]
pub trait PointerLockPlatform: Send + Sync {
    async fn request_exclusive_pointer_capture(&self, options: CaptureOptions)
        -> Result<(), String>;

    async fn release_pointer_capture(&self);
}

/// Sink for input bound for the remote peer.  Fire-and-forget.
pub trait DeltaForwarder: Send + Sync {
    fn forward_movement_delta(&self, dx: i32, dy: i32);

    /// Tells the remote side that movement has stopped.
    fn forward_idle(&self);

    fn forward_button_down(&self, button: u8);

    fn forward_button_up(&self, button: u8);

    fn forward_wheel(&self, mode: WheelMode, dx: f64, dy: f64);
}

/// Construction parameters for [`PointerCaptureEngine`].
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub viewport: Viewport,
    pub start: RenderPosition,
    pub options: CaptureOptions,
    pub policy: AutoReleasePolicy,
}

/// The relative pointer capture engine.
pub struct PointerCaptureEngine {
    viewport: Viewport,
    pointer: PointerState,
    lock: CaptureLock,
    accepting: bool,
    release_pending: bool,
    frame_pending: bool,
    options: CaptureOptions,
    policy: AutoReleasePolicy,
    platform: Arc<dyn PointerLockPlatform>,
    forwarder: Arc<dyn DeltaForwarder>,
    gate: ForwardingGate,
}

impl PointerCaptureEngine {
    pub fn new(
        settings: EngineSettings,
        platform: Arc<dyn PointerLockPlatform>,
        forwarder: Arc<dyn DeltaForwarder>,
        gate: ForwardingGate,
    ) -> Self {
        Self {
            viewport: settings.viewport,
            pointer: PointerState::new(settings.start),
            lock: CaptureLock::new(),
            accepting: false,
            release_pending: false,
            frame_pending: false,
            options: settings.options,
            policy: settings.policy,
            platform,
            forwarder,
            gate,
        }
    }

    // ── Capture lifecycle ─────────────────────────────────────────────────────

    /// Asks the platform for exclusive relative capture.
    ///
    /// A capture that is still being released counts as not captured, so a
    /// click during that window asks the platform again.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::GestureRequired`] for a re-entry request before any
    ///   grant; the platform is not asked.
    /// - [`CaptureError::CaptureDenied`] when the platform refuses.  Engine
    ///   state is unchanged and the request is not retried.
    pub async fn request_capture(
        &mut self,
        trigger: CaptureTrigger,
    ) -> Result<CaptureOutcome, CaptureError> {
        if self.lock.is_captured() && !self.release_pending {
            return Ok(CaptureOutcome::AlreadyCaptured);
        }
        if trigger == CaptureTrigger::PointerReentry && !self.lock.permits_silent_reacquire() {
            debug!("ignoring re-entry capture request: no prior grant");
            return Err(CaptureError::GestureRequired);
        }

        self.platform
            .request_exclusive_pointer_capture(self.options)
            .await
            .map_err(|e| {
                warn!("pointer capture denied: {e}");
                CaptureError::CaptureDenied(e)
            })?;

        self.lock.record_grant();
        info!(?trigger, "pointer capture granted");
        Ok(CaptureOutcome::Granted)
    }

    /// Mirrors the OS capture flag.
    ///
    /// Activation is the only point where the cumulative report is zeroed.
    pub fn on_capture_change(&mut self, captured: bool) {
        let was_accepting = self.accepting;
        self.lock.set_captured(captured);
        self.release_pending = false;

        if captured {
            self.lock.record_grant();
            self.pointer.reset_report();
            self.accepting = true;
            info!("pointer capture active");
        } else {
            self.accepting = false;
            if was_accepting && self.gate.is_open() {
                self.forwarder.forward_idle();
            }
            info!("pointer capture inactive");
        }
    }

    /// Ends capture.  Idempotent.
    ///
    /// Samples stop mutating state as soon as this is called, before the
    /// platform confirms the release.
    pub async fn release_capture(&mut self) {
        if !self.lock.is_captured() || self.release_pending {
            return;
        }
        self.release_pending = true;
        let was_accepting = std::mem::replace(&mut self.accepting, false);
        if was_accepting && self.gate.is_open() {
            self.forwarder.forward_idle();
        }
        debug!("releasing pointer capture");
        self.platform.release_pointer_capture().await;
    }

    // ── Samples and frames ────────────────────────────────────────────────────

    /// Applies one raw movement sample.
    pub async fn on_movement_sample(&mut self, dx: i32, dy: i32) -> SampleOutcome {
        if !self.accepting || self.release_pending {
            trace!(dx, dy, "sample outside capture ignored");
            return SampleOutcome::Ignored;
        }

        self.pointer.apply(&self.viewport, dx, dy);
        self.frame_pending = true;

        let forwarded = self.gate.is_open();
        if forwarded {
            self.forwarder.forward_movement_delta(dx, dy);
        }

        let released =
            self.policy == AutoReleasePolicy::OnPositiveReportX && self.pointer.report_x > 0;
        if released {
            info!(report_x = self.pointer.report_x, "report crossed zero; auto-releasing");
            self.release_capture().await;
        }

        SampleOutcome::Applied {
            forwarded,
            released,
        }
    }

    /// Forwards a button press or release.  Returns `true` if it was sent.
    ///
    /// Buttons are only meaningful while capture is active: outside it the
    /// click belongs to the local desktop.
    pub fn on_button(&mut self, button: u8, pressed: bool) -> bool {
        if !self.forwards_input() {
            trace!(button, pressed, "button outside forwarding ignored");
            return false;
        }
        if pressed {
            self.forwarder.forward_button_down(button);
        } else {
            self.forwarder.forward_button_up(button);
        }
        true
    }

    /// Forwards a wheel scroll.  Returns `true` if it was sent.
    pub fn on_wheel(&mut self, mode: WheelMode, dx: f64, dy: f64) -> bool {
        if !self.forwards_input() {
            trace!(dx, dy, "wheel outside forwarding ignored");
            return false;
        }
        self.forwarder.forward_wheel(mode, dx, dy);
        true
    }

    fn forwards_input(&self) -> bool {
        self.accepting && !self.release_pending && self.gate.is_open()
    }

    /// Called once per rendered frame.  Returns the position to draw if any
    /// sample arrived since the last frame.
    pub fn on_frame(&mut self) -> Option<RenderPosition> {
        if std::mem::take(&mut self.frame_pending) {
            Some(self.pointer.render())
        } else {
            None
        }
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    pub fn pointer(&self) -> PointerState {
        self.pointer
    }

    pub fn is_captured(&self) -> bool {
        self.lock.is_captured()
    }

    pub fn ever_granted(&self) -> bool {
        self.lock.ever_granted()
    }

    pub fn is_accepting_samples(&self) -> bool {
        self.accepting
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use linkmouse_core::SessionState;
    use mockall::{mock, predicate::eq, Sequence};
    use std::sync::Mutex;

    // ── Test doubles ──────────────────────────────────────────────────────────

    mock! {
        Forwarder {}
        impl DeltaForwarder for Forwarder {
            fn forward_movement_delta(&self, dx: i32, dy: i32);
            fn forward_idle(&self);
            fn forward_button_down(&self, button: u8);
            fn forward_button_up(&self, button: u8);
            fn forward_wheel(&self, mode: WheelMode, dx: f64, dy: f64);
        }
    }

    #[derive(Default)]
    struct RecordingPlatform {
        requests: Mutex<Vec<CaptureOptions>>,
        releases: Mutex<u32>,
        should_fail: bool,
    }

    #[async_trait]
    impl PointerLockPlatform for RecordingPlatform {
        async fn request_exclusive_pointer_capture(
            &self,
            options: CaptureOptions,
        ) -> Result<(), String> {
            self.requests.lock().unwrap().push(options);
            if self.should_fail {
                return Err("injected failure".to_string());
            }
            Ok(())
        }

        async fn release_pointer_capture(&self) {
            *self.releases.lock().unwrap() += 1;
        }
    }

    #[derive(Default)]
    struct RecordingForwarder {
        deltas: Mutex<Vec<(i32, i32)>>,
        idles: Mutex<u32>,
        buttons: Mutex<Vec<(u8, bool)>>,
        wheels: Mutex<Vec<(WheelMode, f64, f64)>>,
    }

    impl DeltaForwarder for RecordingForwarder {
        fn forward_movement_delta(&self, dx: i32, dy: i32) {
            self.deltas.lock().unwrap().push((dx, dy));
        }

        fn forward_idle(&self) {
            *self.idles.lock().unwrap() += 1;
        }

        fn forward_button_down(&self, button: u8) {
            self.buttons.lock().unwrap().push((button, true));
        }

        fn forward_button_up(&self, button: u8) {
            self.buttons.lock().unwrap().push((button, false));
        }

        fn forward_wheel(&self, mode: WheelMode, dx: f64, dy: f64) {
            self.wheels.lock().unwrap().push((mode, dx, dy));
        }
    }

    fn settings(policy: AutoReleasePolicy) -> EngineSettings {
        EngineSettings {
            viewport: Viewport::new(100, 100, 20),
            start: RenderPosition::new(50, 50),
            options: CaptureOptions::default(),
            policy,
        }
    }

    fn engine_with(
        policy: AutoReleasePolicy,
        platform: Arc<RecordingPlatform>,
        forwarder: Arc<dyn DeltaForwarder>,
        state: SessionState,
    ) -> PointerCaptureEngine {
        PointerCaptureEngine::new(
            settings(policy),
            platform,
            forwarder,
            ForwardingGate::fixed(state),
        )
    }

    fn captured_engine(policy: AutoReleasePolicy) -> (PointerCaptureEngine, Arc<RecordingPlatform>) {
        let platform = Arc::new(RecordingPlatform::default());
        let mut engine = engine_with(
            policy,
            Arc::clone(&platform),
            Arc::new(RecordingForwarder::default()),
            SessionState::UserConnected,
        );
        engine.on_capture_change(true);
        (engine, platform)
    }

    // ── Capture requests ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_first_gesture_request_asks_for_raw_deltas() {
        // Arrange
        let platform = Arc::new(RecordingPlatform::default());
        let mut engine = engine_with(
            AutoReleasePolicy::Disabled,
            Arc::clone(&platform),
            Arc::new(RecordingForwarder::default()),
            SessionState::UserConnected,
        );

        // Act
        let outcome = engine.request_capture(CaptureTrigger::UserGesture).await;

        // Assert
        assert_eq!(outcome, Ok(CaptureOutcome::Granted));
        assert_eq!(
            *platform.requests.lock().unwrap(),
            vec![CaptureOptions { raw_deltas: true }]
        );
        assert!(engine.ever_granted());
    }

    #[tokio::test]
    async fn test_reentry_before_any_grant_requires_gesture() {
        let platform = Arc::new(RecordingPlatform::default());
        let mut engine = engine_with(
            AutoReleasePolicy::Disabled,
            Arc::clone(&platform),
            Arc::new(RecordingForwarder::default()),
            SessionState::UserConnected,
        );

        let outcome = engine.request_capture(CaptureTrigger::PointerReentry).await;

        assert_eq!(outcome, Err(CaptureError::GestureRequired));
        assert!(platform.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reentry_after_release_is_silent() {
        // Arrange
        let (mut engine, platform) = captured_engine(AutoReleasePolicy::Disabled);
        engine.release_capture().await;
        engine.on_capture_change(false);

        // Act
        let outcome = engine.request_capture(CaptureTrigger::PointerReentry).await;

        // Assert
        assert_eq!(outcome, Ok(CaptureOutcome::Granted));
        assert_eq!(platform.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_denied_capture_leaves_state_unchanged() {
        // Arrange
        let platform = Arc::new(RecordingPlatform {
            should_fail: true,
            ..Default::default()
        });
        let mut engine = engine_with(
            AutoReleasePolicy::Disabled,
            Arc::clone(&platform),
            Arc::new(RecordingForwarder::default()),
            SessionState::UserConnected,
        );

        // Act
        let outcome = engine.request_capture(CaptureTrigger::UserGesture).await;

        // Assert
        assert!(matches!(outcome, Err(CaptureError::CaptureDenied(_))));
        assert!(!engine.ever_granted());
        assert!(!engine.is_captured());
        assert_eq!(platform.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_request_during_pending_release_asks_platform_again() {
        // Arrange – auto-release fired but the platform has not confirmed
        let (mut engine, platform) = captured_engine(AutoReleasePolicy::OnPositiveReportX);
        engine.on_movement_sample(5, 0).await;
        assert!(engine.is_captured());

        // Act
        let outcome = engine.request_capture(CaptureTrigger::UserGesture).await;

        // Assert
        assert_eq!(outcome, Ok(CaptureOutcome::Granted));
        assert_eq!(platform.requests.lock().unwrap().len(), 1);

        // The platform reports the release, then the new grant.
        engine.on_capture_change(false);
        engine.on_capture_change(true);
        let sample = engine.on_movement_sample(-1, 0).await;
        assert!(matches!(sample, SampleOutcome::Applied { .. }));
    }

    #[tokio::test]
    async fn test_request_while_captured_is_a_no_op() {
        let (mut engine, platform) = captured_engine(AutoReleasePolicy::Disabled);
        let outcome = engine.request_capture(CaptureTrigger::UserGesture).await;
        assert_eq!(outcome, Ok(CaptureOutcome::AlreadyCaptured));
        assert!(platform.requests.lock().unwrap().is_empty());
    }

    // ── Samples ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_samples_before_capture_are_ignored() {
        let platform = Arc::new(RecordingPlatform::default());
        let mut engine = engine_with(
            AutoReleasePolicy::Disabled,
            platform,
            Arc::new(RecordingForwarder::default()),
            SessionState::ControllingStarted,
        );

        let outcome = engine.on_movement_sample(10, 10).await;

        assert_eq!(outcome, SampleOutcome::Ignored);
        assert_eq!(engine.pointer().render(), RenderPosition::new(50, 50));
    }

    #[tokio::test]
    async fn test_sample_wraps_render_position() {
        // Arrange
        let (mut engine, _) = captured_engine(AutoReleasePolicy::Disabled);

        // Act
        engine.on_movement_sample(80, 0).await;

        // Assert
        let pointer = engine.pointer();
        assert_eq!(pointer.render_x, -20);
        assert_eq!(pointer.report_x, 80);
    }

    #[tokio::test]
    async fn test_report_resets_on_every_activation() {
        // Arrange
        let (mut engine, _) = captured_engine(AutoReleasePolicy::Disabled);
        engine.on_movement_sample(-7, 4).await;
        engine.on_capture_change(false);

        // Act
        engine.on_capture_change(true);
        engine.on_movement_sample(-2, 1).await;

        // Assert
        assert_eq!(engine.pointer().report_x, -2);
        assert_eq!(engine.pointer().report_y, 1);
        assert_eq!(engine.pointer().render(), RenderPosition::new(41, 55));
    }

    #[tokio::test]
    async fn test_frames_coalesce_to_latest_position() {
        // Arrange
        let (mut engine, _) = captured_engine(AutoReleasePolicy::Disabled);

        // Act
        engine.on_movement_sample(-1, 0).await;
        engine.on_movement_sample(-1, 0).await;
        engine.on_movement_sample(-1, 2).await;
        let first = engine.on_frame();
        let second = engine.on_frame();

        // Assert
        assert_eq!(first, Some(RenderPosition::new(47, 52)));
        assert_eq!(second, None);
    }

    // ── Forwarding ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_forwards_each_sample_while_controlling() {
        // Arrange
        let mut forwarder = MockForwarder::new();
        let mut seq = Sequence::new();
        forwarder
            .expect_forward_movement_delta()
            .with(eq(-3), eq(1))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        forwarder
            .expect_forward_movement_delta()
            .with(eq(-4), eq(0))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        forwarder.expect_forward_idle().never();
        let mut engine = engine_with(
            AutoReleasePolicy::Disabled,
            Arc::new(RecordingPlatform::default()),
            Arc::new(forwarder),
            SessionState::ControllingStarted,
        );
        engine.on_capture_change(true);

        // Act
        let first = engine.on_movement_sample(-3, 1).await;
        let second = engine.on_movement_sample(-4, 0).await;

        // Assert
        assert_eq!(
            first,
            SampleOutcome::Applied {
                forwarded: true,
                released: false
            }
        );
        assert!(matches!(second, SampleOutcome::Applied { forwarded: true, .. }));
    }

    #[tokio::test]
    async fn test_closed_gate_blocks_forwarding_but_not_rendering() {
        // Arrange
        let mut forwarder = MockForwarder::new();
        forwarder.expect_forward_movement_delta().never();
        forwarder.expect_forward_idle().never();
        let mut engine = engine_with(
            AutoReleasePolicy::Disabled,
            Arc::new(RecordingPlatform::default()),
            Arc::new(forwarder),
            SessionState::ControllingStopped,
        );
        engine.on_capture_change(true);

        // Act
        engine.on_movement_sample(-5, -5).await;
        engine.on_capture_change(false);

        // Assert
        assert_eq!(engine.pointer().render(), RenderPosition::new(45, 45));
    }

    #[tokio::test]
    async fn test_deactivation_while_controlling_forwards_idle() {
        // Arrange
        let forwarder = Arc::new(RecordingForwarder::default());
        let mut engine = engine_with(
            AutoReleasePolicy::Disabled,
            Arc::new(RecordingPlatform::default()),
            Arc::clone(&forwarder) as Arc<dyn DeltaForwarder>,
            SessionState::ControllingStarted,
        );
        engine.on_capture_change(true);
        engine.on_movement_sample(-1, -1).await;

        // Act
        engine.on_capture_change(false);

        // Assert
        assert_eq!(*forwarder.deltas.lock().unwrap(), vec![(-1, -1)]);
        assert_eq!(*forwarder.idles.lock().unwrap(), 1);
    }

    // ── Release ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_auto_release_fires_once_when_report_turns_positive() {
        // Arrange
        let (mut engine, platform) = captured_engine(AutoReleasePolicy::OnPositiveReportX);
        engine.on_movement_sample(-5, 0).await;

        // Act – deltas summing to +10 after the initial -5
        let a = engine.on_movement_sample(4, 0).await;
        let b = engine.on_movement_sample(3, 0).await;
        let c = engine.on_movement_sample(3, 0).await;

        // Assert
        assert_eq!(
            a,
            SampleOutcome::Applied {
                forwarded: false,
                released: false
            }
        );
        assert_eq!(
            b,
            SampleOutcome::Applied {
                forwarded: false,
                released: true
            }
        );
        assert_eq!(c, SampleOutcome::Ignored);
        assert_eq!(*platform.releases.lock().unwrap(), 1);
        assert_eq!(engine.pointer().report_x, 2);
    }

    #[tokio::test]
    async fn test_auto_release_disabled_keeps_capture() {
        let (mut engine, platform) = captured_engine(AutoReleasePolicy::Disabled);
        let outcome = engine.on_movement_sample(30, 0).await;
        assert!(matches!(outcome, SampleOutcome::Applied { released: false, .. }));
        assert_eq!(*platform.releases.lock().unwrap(), 0);
        assert!(engine.is_accepting_samples());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        // Arrange
        let (mut engine, platform) = captured_engine(AutoReleasePolicy::Disabled);

        // Act
        engine.release_capture().await;
        engine.release_capture().await;
        engine.on_capture_change(false);
        engine.release_capture().await;

        // Assert
        assert_eq!(*platform.releases.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_no_sample_mutates_state_after_release() {
        // Arrange
        let (mut engine, _) = captured_engine(AutoReleasePolicy::Disabled);
        engine.on_movement_sample(-3, 0).await;
        let before = engine.pointer();

        // Act – the platform has not yet confirmed the release
        engine.release_capture().await;
        let outcome = engine.on_movement_sample(-9, 9).await;

        // Assert
        assert_eq!(outcome, SampleOutcome::Ignored);
        assert_eq!(engine.pointer(), before);
    }

    #[tokio::test]
    async fn test_release_while_controlling_sends_one_idle_marker() {
        // Arrange
        let mut forwarder = MockForwarder::new();
        let mut seq = Sequence::new();
        forwarder
            .expect_forward_movement_delta()
            .with(eq(-3), eq(0))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        forwarder
            .expect_forward_idle()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        let platform = Arc::new(RecordingPlatform::default());
        let mut engine = engine_with(
            AutoReleasePolicy::Disabled,
            Arc::clone(&platform),
            Arc::new(forwarder),
            SessionState::ControllingStarted,
        );
        engine.on_capture_change(true);
        engine.on_movement_sample(-3, 0).await;

        // Act
        engine.release_capture().await;
        engine.release_capture().await;
        engine.on_capture_change(false);

        // Assert
        assert_eq!(*platform.releases.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_auto_release_while_controlling_forwards_crossing_sample_then_idle() {
        // Arrange
        let mut forwarder = MockForwarder::new();
        let mut seq = Sequence::new();
        forwarder
            .expect_forward_movement_delta()
            .with(eq(10), eq(0))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        forwarder
            .expect_forward_idle()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        let platform = Arc::new(RecordingPlatform::default());
        let mut engine = engine_with(
            AutoReleasePolicy::OnPositiveReportX,
            Arc::clone(&platform),
            Arc::new(forwarder),
            SessionState::ControllingStarted,
        );
        engine.on_capture_change(true);

        // Act
        let crossing = engine.on_movement_sample(10, 0).await;
        let after = engine.on_movement_sample(10, 0).await;
        engine.release_capture().await;
        engine.on_capture_change(false);

        // Assert
        assert_eq!(
            crossing,
            SampleOutcome::Applied {
                forwarded: true,
                released: true
            }
        );
        assert_eq!(after, SampleOutcome::Ignored);
        assert_eq!(*platform.releases.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_extreme_viewport_samples_do_not_overflow() {
        let platform = Arc::new(RecordingPlatform::default());
        let mut engine = PointerCaptureEngine::new(
            EngineSettings {
                viewport: Viewport::new(100, 100, i32::MAX),
                ..settings(AutoReleasePolicy::Disabled)
            },
            platform,
            Arc::new(RecordingForwarder::default()),
            ForwardingGate::fixed(SessionState::UserConnected),
        );
        engine.on_capture_change(true);

        engine.on_movement_sample(-1, 0).await;

        assert_eq!(engine.pointer().render(), RenderPosition::new(49, 50));
    }

    // ── Buttons and wheel ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_buttons_and_wheel_forwarded_while_controlling() {
        // Arrange
        let forwarder = Arc::new(RecordingForwarder::default());
        let mut engine = engine_with(
            AutoReleasePolicy::Disabled,
            Arc::new(RecordingPlatform::default()),
            Arc::clone(&forwarder) as Arc<dyn DeltaForwarder>,
            SessionState::ControllingStarted,
        );
        engine.on_capture_change(true);

        // Act
        let down = engine.on_button(0, true);
        let up = engine.on_button(0, false);
        let wheel = engine.on_wheel(WheelMode::Pixel, 0.0, -1.5);

        // Assert
        assert!(down && up && wheel);
        assert_eq!(*forwarder.buttons.lock().unwrap(), vec![(0u8, true), (0u8, false)]);
        assert_eq!(
            *forwarder.wheels.lock().unwrap(),
            vec![(WheelMode::Pixel, 0.0, -1.5)]
        );
        assert_eq!(engine.pointer().render(), RenderPosition::new(50, 50));
    }

    #[tokio::test]
    async fn test_buttons_not_forwarded_without_capture_or_gate() {
        // Arrange
        let mut forwarder = MockForwarder::new();
        forwarder.expect_forward_button_down().never();
        forwarder.expect_forward_button_up().never();
        forwarder.expect_forward_wheel().never();
        forwarder.expect_forward_idle().return_const(());
        let forwarder = Arc::new(forwarder);
        let mut closed_gate = engine_with(
            AutoReleasePolicy::Disabled,
            Arc::new(RecordingPlatform::default()),
            Arc::clone(&forwarder) as Arc<dyn DeltaForwarder>,
            SessionState::UserConnected,
        );
        closed_gate.on_capture_change(true);
        let mut uncaptured = engine_with(
            AutoReleasePolicy::Disabled,
            Arc::new(RecordingPlatform::default()),
            Arc::clone(&forwarder) as Arc<dyn DeltaForwarder>,
            SessionState::ControllingStarted,
        );

        // Act / Assert
        assert!(!closed_gate.on_button(1, true));
        assert!(!closed_gate.on_wheel(WheelMode::Line(1), 0.0, 3.0));
        assert!(!uncaptured.on_button(1, false));

        uncaptured.on_capture_change(true);
        uncaptured.release_capture().await;
        assert!(!uncaptured.on_button(0, true));
    }

    #[test]
    fn test_policy_from_flag() {
        assert_eq!(
            AutoReleasePolicy::from_flag(true),
            AutoReleasePolicy::OnPositiveReportX
        );
        assert_eq!(AutoReleasePolicy::from_flag(false), AutoReleasePolicy::Disabled);
    }

    // ── Properties ────────────────────────────────────────────────────────────

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Every activation zeroes the report, which then tracks exactly
            /// the samples applied during that capture.
            #[test]
            fn report_tracks_only_the_current_capture(
                captures in proptest::collection::vec(
                    proptest::collection::vec((-500i32..500, -500i32..500), 0..24),
                    1..6,
                ),
            ) {
                let (mut engine, _) = captured_engine(AutoReleasePolicy::Disabled);
                engine.on_capture_change(false);

                for deltas in captures {
                    engine.on_capture_change(true);
                    prop_assert_eq!(engine.pointer().report_x, 0);
                    prop_assert_eq!(engine.pointer().report_y, 0);

                    for &(dx, dy) in &deltas {
                        tokio_test::block_on(engine.on_movement_sample(dx, dy));
                    }
                    let sum_x: i64 = deltas.iter().map(|&(dx, _)| i64::from(dx)).sum();
                    let sum_y: i64 = deltas.iter().map(|&(_, dy)| i64::from(dy)).sum();
                    prop_assert_eq!(engine.pointer().report_x, sum_x);
                    prop_assert_eq!(engine.pointer().report_y, sum_y);

                    engine.on_capture_change(false);
                }
            }
        }
    }
}
