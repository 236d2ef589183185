//! Error types for the Gorse API client.
//!
//! # Design
//! Every failure of a call surfaces as one `ApiError`. A 404 is not split
//! into its own variant: it lands in `HttpError` like any other non-2xx
//! status, and callers branch on `status()` or the `is_*` predicates.

use thiserror::Error;

/// Errors returned by `GorseClient` operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    /// No HTTP response was obtained (connection refused, DNS, timeout, body read).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(#[source] serde_json::Error),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(#[source] serde_json::Error),

    /// The query string could not be encoded.
    #[error("query encoding failed: {0}")]
    QueryEncoding(#[from] serde_urlencoded::ser::Error),

    /// Missing or invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status of the response, if the request reached the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body for `HttpError`.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::HttpError { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        ApiError::Transport(Box::new(err))
    }
}
