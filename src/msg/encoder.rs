//! # Frame Encoder
//!
//! Renders a [`Message`] as a `^KIND|f1|...|fn~` frame.

use super::protocol::*;
use crate::error::{MountError, Result};

/// Encode a message into a complete frame (sentinels included, no trailer)
///
/// # Errors
///
/// Returns `Protocol` if any field contains a sentinel or separator byte;
/// there is no escaping, so such a field cannot be carried. Empty command
/// arguments are refused too, since they would not decode back.
///
/// # Examples
///
/// ```
/// use eqmount::msg::encoder::encode_frame;
/// use eqmount::msg::protocol::Message;
///
/// let frame = encode_frame(&Message::Foo { name: "ping".into() }).unwrap();
/// assert_eq!(frame, b"^Foo|ping~");
/// ```
pub fn encode_frame(message: &Message) -> Result<Vec<u8>> {
    let mut fields: Vec<String> = vec![message.kind().as_str().to_string()];

    match message {
        Message::Foo { name } => fields.push(checked_field(name)?.to_string()),
        Message::Handset { keys } => {
            for key in keys {
                fields.push(checked_field(key)?.to_string());
            }
        }
        Message::RaDriver(state) => {
            fields.push(state.tracking.to_string());
            fields.push(state.direction.to_string());
            fields.push(state.position.to_string());
        }
        Message::RaDriverCmd { cmd, args } => {
            fields.push(cmd.to_string());
            for arg in args {
                if arg.as_bytes().contains(&ARG_SEPARATOR) {
                    return Err(MountError::Protocol(format!(
                        "Command argument {:?} contains ','",
                        arg
                    )));
                }
                if arg.is_empty() {
                    // An empty args field decodes as no arguments at all
                    return Err(MountError::Protocol(format!("{} has an empty argument", cmd)));
                }
                checked_field(arg)?;
            }
            fields.push(args.join(","));
        }
    }

    let body = fields.join("|");
    let mut frame = Vec::with_capacity(body.len() + 2);
    frame.push(FRAME_START);
    frame.extend_from_slice(body.as_bytes());
    frame.push(FRAME_END);
    Ok(frame)
}

fn checked_field(field: &str) -> Result<&str> {
    let reserved = [FRAME_START, FRAME_END, FIELD_SEPARATOR];
    if field.bytes().any(|b| reserved.contains(&b)) {
        return Err(MountError::Protocol(format!(
            "Field {:?} contains a reserved byte",
            field
        )));
    }
    Ok(field)
}
