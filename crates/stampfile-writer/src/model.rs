//! Request and output models for the writer.
//!
//! # Design
//! - Requests are immutable once submitted; the queue shares them by `Arc`.
//! - Output messages carry the request's pass-through fields plus the resolved
//!   relative and absolute paths.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

const FIELD_PAYLOAD: &str = "payload";
const FIELD_DIRNAME: &str = "dirname";

/// Content to persist.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Raw bytes, written verbatim.
    Bytes(Vec<u8>),
    /// Text, subject to newline and encoding settings.
    Text(String),
    /// Structured value, serialised as compact JSON (scalars as plain text).
    Json(Value),
}

impl Payload {
    /// Empty JSON object used when payloads are cleared before emission.
    #[must_use]
    pub fn cleared() -> Self {
        Self::Json(Value::Object(Map::new()))
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Json(other),
        }
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// One write request.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    /// Identifier used in reports and output.
    pub id: Uuid,
    /// Per-request base directory; overrides the configured one.
    pub directory: Option<PathBuf>,
    /// Content to persist; requests without payload complete without output.
    pub payload: Option<Payload>,
    /// Additional message properties carried through to the output.
    pub fields: Map<String, Value>,
}

impl WriteRequest {
    /// Request carrying `payload`.
    #[must_use]
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            id: Uuid::new_v4(),
            directory: None,
            payload: Some(payload.into()),
            fields: Map::new(),
        }
    }

    /// Request with no payload.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            directory: None,
            payload: None,
            fields: Map::new(),
        }
    }

    /// Target `directory` instead of the configured base directory.
    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Attach a pass-through field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Build a request from a message document.
    ///
    /// Objects contribute `payload` and `dirname`; every other key is carried
    /// through. A JSON `null` payload counts as absent. Non-object documents
    /// become the payload themselves.
    #[must_use]
    pub fn from_message(message: Value) -> Self {
        let Value::Object(mut fields) = message else {
            return Self::new(message);
        };
        let payload = fields
            .remove(FIELD_PAYLOAD)
            .filter(|value| !value.is_null())
            .map(Payload::from);
        let directory = match fields.remove(FIELD_DIRNAME) {
            Some(Value::String(dir)) if !dir.is_empty() => Some(PathBuf::from(dir)),
            _ => None,
        };
        Self {
            id: Uuid::new_v4(),
            directory,
            payload,
            fields,
        }
    }
}

/// Message emitted after a successful write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrittenMessage {
    /// Request that produced the write.
    pub request_id: Uuid,
    /// Pass-through fields from the request.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    /// Per-request directory, when one was supplied.
    #[serde(rename = "dirname", skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// Written payload, or an empty object when clearing is enabled.
    pub payload: Payload,
    /// Path relative to the base directory.
    pub shortname: PathBuf,
    /// Absolute path of the written file.
    pub fullname: PathBuf,
    /// Number of bytes written.
    #[serde(skip)]
    pub bytes: u64,
}

/// Result of servicing one request.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The payload was persisted.
    Written(WrittenMessage),
    /// The request had no payload and nothing was written.
    Skipped {
        /// Request that was skipped.
        request_id: Uuid,
    },
}

impl WriteOutcome {
    /// Emitted message, when the request wrote a file.
    #[must_use]
    pub const fn written(&self) -> Option<&WrittenMessage> {
        match self {
            Self::Written(message) => Some(message),
            Self::Skipped { .. } => None,
        }
    }
}
