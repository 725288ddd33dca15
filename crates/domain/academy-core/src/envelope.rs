//! Response envelope handling.
//!
//! The backend answers either with an envelope `{ "ok": bool, "data": ..., "message": "..." }`
//! or with the bare payload (array or object). Callers only ever see the
//! inner payload. Shapes are tried in this order:
//!
//! 1. an object carrying a boolean `ok` key is an envelope, its payload is `data`;
//! 2. anything else that is not `null` is a bare payload.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Envelope {
        ok: bool,
        data: Option<Value>,
        message: Option<String>,
    },
    Bare(Value),
}

impl ResponseBody {
    pub fn classify(body: Value) -> Self {
        match body {
            Value::Object(mut map) if matches!(map.get("ok"), Some(Value::Bool(_))) => {
                let ok = map.get("ok").and_then(Value::as_bool).unwrap_or(false);
                let data = map.remove("data").filter(|v| !v.is_null());
                let message = match map.remove("message") {
                    Some(Value::String(s)) => Some(s),
                    _ => None,
                };
                ResponseBody::Envelope { ok, data, message }
            }
            other => ResponseBody::Bare(other),
        }
    }

    /// Human-readable message carried by the body, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            ResponseBody::Envelope { message, .. } => message.as_deref(),
            ResponseBody::Bare(Value::Object(map)) => map
                .get("message")
                .or_else(|| map.get("error"))
                .and_then(Value::as_str),
            ResponseBody::Bare(_) => None,
        }
    }

    pub fn into_payload(self) -> Option<Value> {
        match self {
            ResponseBody::Envelope { data, .. } => data,
            ResponseBody::Bare(Value::Null) => None,
            ResponseBody::Bare(v) => Some(v),
        }
    }
}

/// Strip any known envelope and return the inner payload, or `None` when the
/// body carries nothing.
pub fn normalize_payload(body: Value) -> Option<Value> {
    ResponseBody::classify(body).into_payload()
}

/// Read a scalar field either at the top level of `payload` or one level
/// down under `data`. Numbers are rendered as strings.
pub fn extract_str(payload: &Value, field: &str) -> Option<String> {
    let scalar = |v: &Value| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };

    payload.get(field).and_then(scalar).or_else(|| {
        payload
            .get("data")
            .and_then(|inner| inner.get(field))
            .and_then(scalar)
    })
}

/// Identifier of a freshly created resource.
pub fn extract_id(payload: &Value) -> Option<String> {
    extract_str(payload, "id").or_else(|| extract_str(payload, "_id"))
}
