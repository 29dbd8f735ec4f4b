//! Wire envelopes for the dispatch boundary

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Incoming request: `{ "id": ..., "type": ..., "data": ... }`
///
/// The `type` tag is kept as a raw string here so that an unknown tag can
/// still be answered with the caller's correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Opaque correlation id, echoed in the response
    pub id: String,
    /// Request type tag
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific payload
    #[serde(default)]
    pub data: Value,
}

impl RequestEnvelope {
    /// Create a request envelope
    pub fn new(id: impl Into<String>, kind: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            data,
        }
    }

    /// Create a request envelope with a freshly generated correlation id
    pub fn with_generated_id(kind: impl Into<String>, data: Value) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), kind, data)
    }
}

/// Outcome tag of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    /// Request resolved with a result payload
    Success,
    /// Request rejected with an error message
    Error,
}

/// Observable lifecycle of a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestState {
    /// Received, computation in flight
    Pending,
    /// Completed with a result
    Resolved,
    /// Completed with an error
    Rejected,
}

/// Outgoing response: `{ "id", "type": "SUCCESS", "data" }` or
/// `{ "id", "type": "ERROR", "error" }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Correlation id of the originating request
    pub id: String,
    /// Outcome tag
    #[serde(rename = "type")]
    pub status: ResponseStatus,
    /// Result payload, present on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Human-readable message, present on error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Successful response
    pub fn success(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            status: ResponseStatus::Success,
            data: Some(data),
            error: None,
        }
    }

    /// Error response
    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ResponseStatus::Error,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Whether the request resolved successfully
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Terminal state this response represents
    pub fn state(&self) -> RequestState {
        match self.status {
            ResponseStatus::Success => RequestState::Resolved,
            ResponseStatus::Error => RequestState::Rejected,
        }
    }
}

/// Decode one raw JSON request.
///
/// On failure an error response is returned instead, carrying whatever `id`
/// could be recovered from the input (empty when none).
pub fn decode_request(raw: &str) -> Result<RequestEnvelope, ResponseEnvelope> {
    serde_json::from_str::<RequestEnvelope>(raw).map_err(|err| {
        let id = serde_json::from_str::<Value>(raw)
            .ok()
            .and_then(|value| value.get("id").and_then(Value::as_str).map(str::to_owned))
            .unwrap_or_default();
        ResponseEnvelope::error(id, format!("Malformed request: {err}"))
    })
}
