//! Error types for songgraph-client

use thiserror::Error;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request could not be sent or its body not read
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with an error body
    #[error("Server error {status}: {message}")]
    Api { status: u16, message: String },

    /// Progress stream dropped; the view is kept and the job can be resubscribed
    #[error("Connection lost: {0}")]
    Transport(String),

    /// Server response could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// songgraph-common error
    #[error(transparent)]
    Common(#[from] songgraph_common::Error),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status: 404, .. })
    }
}
