// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `{msg|rta|err}` envelope: decoding, encoding, and event fan-out.
//!
//! Decoding is deliberately lenient. Anything that is not a JSON object is
//! discarded without an error so that a malformed frame never tears down
//! the socket that carried it. Encoding is strict: a payload that is not
//! well-formed JSON is refused before it can reach a writer.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ProtocolError;

/// A decoded envelope. Any combination of the three parts may be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rta: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<Value>,
}

/// One event produced by fanning out an [`Envelope`].
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeEvent {
    /// The whole `msg` object.
    Msg(Value),
    /// One key of the `msg` object.
    MsgKey { key: String, value: Value },
    /// The whole `rta` value (object or array).
    Rta(Value),
    /// The `rta` field of an element carrying an `action`.
    RtaAction { action: String, value: Value },
    /// The whole `err` value.
    Err(Value),
}

impl EnvelopeEvent {
    /// Legacy string name (`msg`, `msg:<key>`, `rta`, `rta:<action>`, `err`).
    pub fn name(&self) -> String {
        match self {
            Self::Msg(_) => "msg".to_owned(),
            Self::MsgKey { key, .. } => format!("msg:{key}"),
            Self::Rta(_) => "rta".to_owned(),
            Self::RtaAction { action, .. } => format!("rta:{action}"),
            Self::Err(_) => "err".to_owned(),
        }
    }

    /// Payload carried by this event.
    pub fn data(&self) -> &Value {
        match self {
            Self::Msg(v) | Self::Rta(v) | Self::Err(v) => v,
            Self::MsgKey { value, .. } | Self::RtaAction { value, .. } => value,
        }
    }
}

impl Envelope {
    /// Envelope with a `msg` object.
    pub fn msg(map: Map<String, Value>) -> Self {
        Self { msg: Some(map), ..Self::default() }
    }

    /// Envelope with a single `{action, rta}` result.
    pub fn rta_action(action: &str, value: Value) -> Self {
        Self {
            rta: Some(serde_json::json!({ "action": action, "rta": value })),
            ..Self::default()
        }
    }

    /// Envelope with an `err` payload.
    pub fn err(value: Value) -> Self {
        Self { err: Some(value), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.msg.is_none() && self.rta.is_none() && self.err.is_none()
    }

    /// Fan the envelope out into events.
    ///
    /// Order: `msg` then one `msg:<key>` per key in object order; `rta` then
    /// one `rta:<action>` per actionable element, walking arrays from the
    /// last element to the first; finally `err`.
    pub fn events(&self) -> Vec<EnvelopeEvent> {
        let mut out = Vec::new();

        if let Some(ref msg) = self.msg {
            out.push(EnvelopeEvent::Msg(Value::Object(msg.clone())));
            for (key, value) in msg {
                out.push(EnvelopeEvent::MsgKey { key: key.clone(), value: value.clone() });
            }
        }

        if let Some(ref rta) = self.rta {
            out.push(EnvelopeEvent::Rta(rta.clone()));
            match rta {
                Value::Array(items) => {
                    out.extend(items.iter().rev().filter_map(rta_action_event));
                }
                single => out.extend(rta_action_event(single)),
            }
        }

        if let Some(ref err) = self.err {
            out.push(EnvelopeEvent::Err(err.clone()));
        }

        out
    }
}

fn rta_action_event(item: &Value) -> Option<EnvelopeEvent> {
    let action = match item.get("action")? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let value = item.get("rta").cloned().unwrap_or(Value::Null);
    Some(EnvelopeEvent::RtaAction { action, value })
}

/// Decode a raw text frame. Unparsable or non-object input yields `None`.
pub fn decode(raw: &str) -> Option<Envelope> {
    let value = serde_json::from_str::<Value>(raw).ok()?;
    from_value(value)
}

/// Build an envelope from an already parsed JSON value.
pub fn from_value(value: Value) -> Option<Envelope> {
    let Value::Object(mut obj) = value else {
        return None;
    };
    let msg = match obj.remove("msg") {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    };
    Some(Envelope { msg, rta: obj.remove("rta"), err: obj.remove("err") })
}

/// Validate that `text` is well-formed JSON and return it verbatim.
pub fn encode_str(text: &str) -> Result<String, ProtocolError> {
    serde_json::from_str::<serde::de::IgnoredAny>(text).map_err(ProtocolError::InvalidPayload)?;
    Ok(text.to_owned())
}

/// Serialize `value` to text, then validate it like [`encode_str`].
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, ProtocolError> {
    let text = serde_json::to_string(value).map_err(ProtocolError::Serialize)?;
    encode_str(&text)
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
