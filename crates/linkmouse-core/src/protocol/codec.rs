//! Text codec for [`ControlMessage`]s.
//!
//! Wire format:
//! ```text
//! <name>[,<field>]*
//! ```
//! Integers are base-10 with an optional leading `-`.  Wheel amounts are
//! decimal numbers and must be finite.  Surrounding whitespace (including a
//! trailing newline) is ignored.

use std::str::FromStr;

use thiserror::Error;

use crate::protocol::messages::{
    ControlMessage, WheelMode, FIELD_SEPARATOR, MOUSE_DOWN, MOUSE_IDLE, MOUSE_MOVE, MOUSE_UP,
    WHEEL,
};

/// Errors that can occur while decoding a message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The input contained no message name.
    #[error("empty message")]
    Empty,

    /// The message name is not recognized.
    #[error("unknown message type: {0:?}")]
    UnknownMessageType(String),

    /// A required field is absent.
    #[error("{message}: missing field {field}")]
    MissingField {
        message: &'static str,
        field: &'static str,
    },

    /// A field could not be parsed.
    #[error("{message}: invalid {field} value {value:?}")]
    InvalidField {
        message: &'static str,
        field: &'static str,
        value: String,
    },

    /// More fields were present than the message defines.
    #[error("{message}: unexpected trailing fields")]
    TrailingFields { message: &'static str },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`ControlMessage`] into its wire text.
///
/// # Examples
///
/// ```rust
/// use linkmouse_core::protocol::{decode_message, encode_message, ControlMessage};
///
/// let msg = ControlMessage::MouseMove { dx: 4, dy: -2 };
/// let text = encode_message(&msg);
/// assert_eq!(text, "mousemove,4,-2");
/// assert_eq!(decode_message(&text).unwrap(), msg);
/// ```
pub fn encode_message(msg: &ControlMessage) -> String {
    match msg {
        ControlMessage::MouseMove { dx, dy } => {
            format!("{MOUSE_MOVE}{FIELD_SEPARATOR}{dx}{FIELD_SEPARATOR}{dy}")
        }
        ControlMessage::MouseIdle => MOUSE_IDLE.to_string(),
        ControlMessage::MouseDown { button } => format!("{MOUSE_DOWN}{FIELD_SEPARATOR}{button}"),
        ControlMessage::MouseUp { button } => format!("{MOUSE_UP}{FIELD_SEPARATOR}{button}"),
        ControlMessage::Wheel { mode, dx, dy } => format!(
            "{WHEEL}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{dx}{FIELD_SEPARATOR}{dy}",
            mode.code()
        ),
    }
}

/// Decodes one wire message.
///
/// # Errors
///
/// Returns [`ProtocolError`] when the name is unknown or the fields do not
/// match the message definition.
pub fn decode_message(text: &str) -> Result<ControlMessage, ProtocolError> {
    let mut fields = text.trim().split(FIELD_SEPARATOR);
    let name = fields.next().filter(|n| !n.is_empty()).ok_or(ProtocolError::Empty)?;

    let msg = match name {
        MOUSE_MOVE => {
            let dx = parse_field(fields.next(), MOUSE_MOVE, "dx")?;
            let dy = parse_field(fields.next(), MOUSE_MOVE, "dy")?;
            ensure_no_trailing(&mut fields, MOUSE_MOVE)?;
            ControlMessage::MouseMove { dx, dy }
        }
        MOUSE_IDLE => {
            ensure_no_trailing(&mut fields, MOUSE_IDLE)?;
            ControlMessage::MouseIdle
        }
        MOUSE_DOWN => {
            let button = parse_field(fields.next(), MOUSE_DOWN, "button")?;
            ensure_no_trailing(&mut fields, MOUSE_DOWN)?;
            ControlMessage::MouseDown { button }
        }
        MOUSE_UP => {
            let button = parse_field(fields.next(), MOUSE_UP, "button")?;
            ensure_no_trailing(&mut fields, MOUSE_UP)?;
            ControlMessage::MouseUp { button }
        }
        WHEEL => {
            let mode = parse_field(fields.next(), WHEEL, "mode")?;
            let dx = parse_amount(fields.next(), WHEEL, "dx")?;
            let dy = parse_amount(fields.next(), WHEEL, "dy")?;
            ensure_no_trailing(&mut fields, WHEEL)?;
            ControlMessage::Wheel {
                mode: WheelMode::from_code(mode),
                dx,
                dy,
            }
        }
        other => return Err(ProtocolError::UnknownMessageType(other.to_string())),
    };
    Ok(msg)
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn parse_field<T: FromStr>(
    field: Option<&str>,
    message: &'static str,
    name: &'static str,
) -> Result<T, ProtocolError> {
    let raw = field.ok_or(ProtocolError::MissingField {
        message,
        field: name,
    })?;
    raw.trim().parse::<T>().map_err(|_| ProtocolError::InvalidField {
        message,
        field: name,
        value: raw.to_string(),
    })
}

fn parse_amount(
    field: Option<&str>,
    message: &'static str,
    name: &'static str,
) -> Result<f64, ProtocolError> {
    let value: f64 = parse_field(field, message, name)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProtocolError::InvalidField {
            message,
            field: name,
            value: value.to_string(),
        })
    }
}

fn ensure_no_trailing<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    message: &'static str,
) -> Result<(), ProtocolError> {
    match fields.next() {
        Some(_) => Err(ProtocolError::TrailingFields { message }),
        None => Ok(()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
