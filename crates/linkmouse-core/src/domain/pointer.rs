//! Pointer geometry while relative capture is active.
//!
//! During capture the OS stops moving the real cursor and instead reports raw
//! movement deltas.  Two positions are derived from those deltas:
//!
//! - A **render position** kept inside the preview canvas.  When it runs off
//!   one edge it reappears on the opposite edge (wraparound, not clamping), so
//!   the user always sees a dot moving in the direction they push the mouse.
//! - A **report position**: the plain cumulative sum of every delta since
//!   capture was last acquired.  It is unbounded and used for display and
//!   telemetry only.
//!
//! ```text
//!   -R            0                      width        width+R
//!    |<-- margin -->|<------ canvas ------>|<-- margin -->|
//!    ^ x < -R wraps to width+R             x > width+R wraps to -R ^
//! ```

use serde::{Deserialize, Serialize};

/// The preview canvas the render position is confined to.
///
/// `radius` is the size of the drawn dot.  The dot may travel one radius past
/// each edge so it fully leaves the canvas before wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub radius: i32,
}

impl Viewport {
    pub fn new(width: u32, height: u32, radius: i32) -> Self {
        Self {
            width,
            height,
            radius,
        }
    }

    /// Returns `true` if `pos` lies within the wraparound bounds
    /// `[-radius, extent + radius]` on both axes.
    pub fn contains(&self, pos: RenderPosition) -> bool {
        let in_axis = |v: i32, extent: u32| {
            (self.radius.saturating_neg()..=far_bound(extent, self.radius)).contains(&v)
        };
        in_axis(pos.x, self.width) && in_axis(pos.y, self.height)
    }

    /// Returns `true` if `extent + radius` fits in an `i32` on both axes, so
    /// the wraparound bounds are exact.
    pub fn is_representable(&self) -> bool {
        self.radius >= 0
            && checked_far_bound(self.width, self.radius).is_some()
            && checked_far_bound(self.height, self.radius).is_some()
    }
}

fn checked_far_bound(extent: u32, radius: i32) -> Option<i32> {
    i32::try_from(extent).ok()?.checked_add(radius)
}

/// `extent + radius`, saturating at `i32::MAX` for out-of-range geometry.
fn far_bound(extent: u32, radius: i32) -> i32 {
    checked_far_bound(extent, radius).unwrap_or(i32::MAX)
}

/// Wraps a single axis coordinate around `[-radius, extent + radius]`.
///
/// Exceeding the far bound jumps to the near bound and vice versa.  A single
/// jump is applied per call, matching one movement sample.
pub fn wrap_axis(value: i32, extent: u32, radius: i32) -> i32 {
    let min = radius.saturating_neg();
    let max = far_bound(extent, radius);
    if value > max {
        min
    } else if value < min {
        max
    } else {
        value
    }
}

/// A point on the preview canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderPosition {
    pub x: i32,
    pub y: i32,
}

impl RenderPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Bounded render position plus unbounded cumulative report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerState {
    pub render_x: i32,
    pub render_y: i32,
    pub report_x: i64,
    pub report_y: i64,
}

impl PointerState {
    /// Starts at `start` with a zero report.
    pub fn new(start: RenderPosition) -> Self {
        Self {
            render_x: start.x,
            render_y: start.y,
            report_x: 0,
            report_y: 0,
        }
    }

    /// Applies one raw movement sample.
    pub fn apply(&mut self, viewport: &Viewport, dx: i32, dy: i32) {
        self.render_x = wrap_axis(
            self.render_x.saturating_add(dx),
            viewport.width,
            viewport.radius,
        );
        self.render_y = wrap_axis(
            self.render_y.saturating_add(dy),
            viewport.height,
            viewport.radius,
        );
        self.report_x += i64::from(dx);
        self.report_y += i64::from(dy);
    }

    /// Zeroes the cumulative report.  The render position is kept.
    pub fn reset_report(&mut self) {
        self.report_x = 0;
        self.report_y = 0;
    }

    pub fn render(&self) -> RenderPosition {
        RenderPosition::new(self.render_x, self.render_y)
    }
}

/// Capture capability token plus the OS-reported capture flag.
///
/// Platforms only grant exclusive pointer capture from inside a user gesture
/// (a click).  Once a grant has happened the platform lets the page silently
/// re-acquire capture, e.g. when the pointer re-enters the canvas.
/// `ever_granted` records that capability and never goes back to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureLock {
    ever_granted: bool,
    captured: bool,
}

impl CaptureLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful grant.
    pub fn record_grant(&mut self) {
        self.ever_granted = true;
    }

    /// Mirrors the OS capture flag.
    pub fn set_captured(&mut self, captured: bool) {
        self.captured = captured;
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    pub fn ever_granted(&self) -> bool {
        self.ever_granted
    }

    /// Whether capture may be requested without a fresh user gesture.
    pub fn permits_silent_reacquire(&self) -> bool {
        self.ever_granted
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
