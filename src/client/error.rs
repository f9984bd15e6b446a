//! Operation error model
//!
//! Every failure of a controller operation is reduced to one
//! [`OperationError`] with a discriminating [`ErrorKind`], a user-facing
//! message and, when available, the raw response text it was derived from.

use serde_json::Value;
use std::fmt;

use crate::client::transport::HttpReply;

/// Where an operation failure originated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing input or disallowed file type, caught before any request
    Validation,
    /// Network failure, gateway-reported relay failure or malformed body
    Transport,
    /// Well-formed error payload from the backend
    Backend,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Transport => write!(f, "transport"),
            Self::Backend => write!(f, "backend"),
        }
    }
}

/// A failed controller operation, ready to be shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationError {
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// Raw response body, when the error was derived from one
    pub raw: Option<String>,
}

impl OperationError {
    /// Input rejected before any network call
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
            raw: None,
        }
    }

    /// Transport-level failure
    pub fn transport(message: impl Into<String>, raw: Option<String>) -> Self {
        Self {
            kind: ErrorKind::Transport,
            message: message.into(),
            raw,
        }
    }

    /// Backend-reported failure
    pub fn backend(message: impl Into<String>, raw: Option<String>) -> Self {
        Self {
            kind: ErrorKind::Backend,
            message: message.into(),
            raw,
        }
    }

    /// Build an error from a non-success reply
    ///
    /// A JSON `detail` field (backend error) or `error` field (gateway relay
    /// failure) is surfaced verbatim. Anything else is reported with the
    /// status and raw body so it can be diagnosed client-side.
    ///
    /// # Examples
    ///
    /// ```
    /// use ragbridge::client::{ErrorKind, HttpReply, OperationError};
    ///
    /// let reply = HttpReply::new(400, r#"{"detail":"Only PDF files are allowed"}"#);
    /// let err = OperationError::from_failed_reply(&reply);
    /// assert_eq!(err.kind, ErrorKind::Backend);
    /// assert_eq!(err.message, "Only PDF files are allowed");
    /// ```
    pub fn from_failed_reply(reply: &HttpReply) -> Self {
        let raw = Some(reply.body.clone());
        if let Ok(payload) = serde_json::from_str::<Value>(&reply.body) {
            if let Some(detail) = field_message(&payload, "detail") {
                return Self::backend(detail, raw);
            }
            if let Some(error) = field_message(&payload, "error") {
                return Self::transport(error, raw);
            }
        }

        let message = if reply.body.trim().is_empty() {
            format!("Server error ({})", reply.status)
        } else {
            format!("Server error ({}): {}", reply.status, reply.body)
        };
        Self::backend(message, raw)
    }

    /// Malformed body on an otherwise successful reply
    pub fn invalid_body(body: &str) -> Self {
        Self::transport(
            format!("Invalid JSON response: {}", body),
            Some(body.to_string()),
        )
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for OperationError {}

impl From<anyhow::Error> for OperationError {
    fn from(error: anyhow::Error) -> Self {
        Self::transport(error.to_string(), None)
    }
}

fn field_message(payload: &Value, field: &str) -> Option<String> {
    match payload.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
