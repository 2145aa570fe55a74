//! Remote-control messages carried over the relay data channel.
//!
//! The data channel is a text channel shared with the browser side.  Each
//! message is one line of comma-separated fields whose first field is the
//! message name:
//!
//! ```text
//! mousemove,<dx>,<dy>     relative movement, integer pixels
//! mouseidle               movement stopped; the receiver resets prediction
//! mousedown,<button>      button pressed (DOM button code, 0 = primary)
//! mouseup,<button>        button released
//! wheel,<mode>,<dx>,<dy>  scroll; mode 0 is pixels, anything else lines
//! ```

/// Field separator on the wire.
pub const FIELD_SEPARATOR: char = ',';

/// Wire name of [`ControlMessage::MouseMove`].
pub const MOUSE_MOVE: &str = "mousemove";

/// Wire name of [`ControlMessage::MouseIdle`].
pub const MOUSE_IDLE: &str = "mouseidle";

/// Wire name of [`ControlMessage::MouseDown`].
pub const MOUSE_DOWN: &str = "mousedown";

/// Wire name of [`ControlMessage::MouseUp`].
pub const MOUSE_UP: &str = "mouseup";

/// Wire name of [`ControlMessage::Wheel`].
pub const WHEEL: &str = "wheel";

/// How the `dx`/`dy` of a [`ControlMessage::Wheel`] are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelMode {
    /// `0` on the wire.
    Pixel,
    /// Any other mode code (lines, pages).  The raw code is kept.
    Line(u32),
}

impl WheelMode {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Pixel,
            other => Self::Line(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::Pixel => 0,
            Self::Line(code) => *code,
        }
    }
}

/// A message forwarded from the local pointer engine to the remote peer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMessage {
    /// Relative pointer movement.
    MouseMove { dx: i32, dy: i32 },
    /// No more movement for now.
    ///
    /// The receiving side forecasts positions between samples; this marker
    /// tells it to drop any forecast offset.
    MouseIdle,
    MouseDown { button: u8 },
    MouseUp { button: u8 },
    /// Scroll amounts are fractional on the browser side.
    Wheel { mode: WheelMode, dx: f64, dy: f64 },
}

impl ControlMessage {
    /// Returns the wire name of this message.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MouseMove { .. } => MOUSE_MOVE,
            Self::MouseIdle => MOUSE_IDLE,
            Self::MouseDown { .. } => MOUSE_DOWN,
            Self::MouseUp { .. } => MOUSE_UP,
            Self::Wheel { .. } => WHEEL,
        }
    }
}
