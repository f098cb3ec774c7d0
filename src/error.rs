//! Error types shared across the dispatch pipeline.
//!
//! The only error that crosses the dispatch boundary at request time is
//! [`CallError`]: a failed backend action invocation (or anything standing in
//! for one, such as a view engine or an auth gate). It carries an optional
//! HTTP status. Present means "surface this to the client as that status";
//! absent means "unexpected internal failure" and is rendered as a bare 500
//! by the pipeline's error boundary, never leaked.

use serde_json::Value;
use thiserror::Error;

/// Failure of a backend action call (or a collaborator invoked like one).
#[derive(Debug, Clone, Error)]
#[error("action call failed: {message}")]
pub struct CallError {
    /// HTTP status to surface, when the failure was annotated with one.
    pub status: Option<u16>,
    pub message: String,
    /// Structured detail carried alongside the message, serialized into the
    /// error body when `status` is present.
    pub detail: Option<Value>,
}

impl CallError {
    /// An unannotated internal failure (surfaces as 500, detail not exposed).
    pub fn internal(message: impl Into<String>) -> Self {
        CallError {
            status: None,
            message: message.into(),
            detail: None,
        }
    }

    /// A failure annotated with the HTTP status it should surface as.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        CallError {
            status: Some(status),
            message: message.into(),
            detail: None,
        }
    }

    pub fn detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Serialized form used as the response body for status-annotated errors.
    pub fn to_body(&self) -> Value {
        let inner = match &self.detail {
            Some(detail) => detail.clone(),
            None => Value::String(self.message.clone()),
        };
        serde_json::json!({ "error": inner })
    }
}
