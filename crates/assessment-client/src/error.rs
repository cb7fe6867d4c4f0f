//! Error types for the assessment client.

use assessment_core::error::ApiError;

/// All errors that can occur when talking to the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("assessment client config error: {0}")]
    Config(String),

    /// The service answered non-2xx with an `error` message.
    #[error("assessment API error {status_code}: {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// The service's `error` text.
        message: String,
    },

    /// The service answered non-2xx without a readable `error` message.
    #[error("assessment API returned HTTP {status_code}")]
    Status {
        /// HTTP status code.
        status_code: u16,
    },

    /// Request timed out.
    #[error("assessment request timed out")]
    Timeout,

    /// Network or HTTP client error.
    #[error("assessment network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("assessment json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api { message, .. } => Self::rejected(message),
            other => Self::transport(other.to_string()),
        }
    }
}
