//! Inbound webhook payload decoding.

use serde_json::Value;

use super::error::RelayError;

/// A decoded webhook body.
///
/// Only `type` is interpreted; the rest of the document is kept for the
/// diagnostic dump. Forwarding always uses the raw request bytes.
#[derive(Debug, Clone)]
pub struct InboundPayload {
    pub event_type: String,
    pub body: Value,
}

impl InboundPayload {
    /// Parse a request body, requiring a string `type` field.
    pub fn decode(raw: &[u8]) -> Result<Self, RelayError> {
        let body: Value = serde_json::from_slice(raw)
            .map_err(|e| RelayError::MalformedPayload(e.to_string()))?;

        let event_type = match body.get("type") {
            Some(Value::String(t)) => t.clone(),
            Some(other) => {
                return Err(RelayError::MalformedPayload(format!(
                    "field `type` must be a string, got {}",
                    json_kind(other)
                )))
            }
            None => {
                return Err(RelayError::MalformedPayload(
                    "missing field `type`".to_string(),
                ))
            }
        };

        Ok(Self { event_type, body })
    }

    /// Indented rendering of the payload for logs.
    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.body).unwrap_or_else(|_| self.body.to_string())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
