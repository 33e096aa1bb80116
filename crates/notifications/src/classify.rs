//! Normalisation of arbitrary failure payloads into displayable messages.
//!
//! Whatever a backend call or a caught error hands us, the result is always a
//! [`Message`]; classification itself cannot fail.

use serde::Serialize;
use serde_json::Value;

use crate::message::Message;

/// Classify a payload, in order of precedence:
///
/// 1. a string becomes `Unknown(string)`
/// 2. an object with both `type` and `message` fields is passed through with
///    its own `type` (taxonomy members map onto their variant, anything else
///    becomes `Opaque`)
/// 3. anything else becomes `Unknown(<payload as JSON>)`
pub fn classify(payload: &Value) -> Message {
    match payload {
        Value::String(text) => Message::unknown(text.clone()),
        Value::Object(fields) => match (fields.get("type"), fields.get("message")) {
            (Some(kind), Some(message)) => {
                Message::from_parts(field_text(kind), field_text(message))
            }
            _ => Message::unknown(payload.to_string()),
        },
        other => Message::unknown(other.to_string()),
    }
}

/// Serialize `payload` to JSON and [`classify`] it.
///
/// A payload that refuses to serialize is reported as `Unknown` carrying the
/// serializer's error text.
pub fn classify_serializable<P>(payload: &P) -> Message
where
    P: Serialize + ?Sized,
{
    match serde_json::to_value(payload) {
        Ok(value) => classify(&value),
        Err(err) => Message::unknown(format!("unserializable error payload: {err}")),
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
