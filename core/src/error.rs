//! Error types for the todo API client.
//!
//! # Design
//! `Network` covers requests that never produced an HTTP response. `NotFound`
//! gets a dedicated variant because callers frequently distinguish "the
//! resource does not exist" from "the server returned an unexpected status";
//! the reconciler relies on it to make deletes idempotent. All other non-2xx
//! responses land in `Server` with the raw status code and body.

/// Errors returned by `TodoClient` parse methods and `TodoStore` operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be sent or the response could not be received.
    #[error("network error: {0}")]
    Network(String),

    /// The server returned 404: the requested todo does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    Server { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// True for failures where the server answered at all.
    pub fn is_server_side(&self) -> bool {
        matches!(self, ApiError::NotFound | ApiError::Server { .. })
    }
}
