//! Error types for AI operations.

use thiserror::Error;

/// Errors that can occur when talking to a model provider.
#[derive(Error, Debug)]
pub enum AiError {
    /// Unable to reach the provider.
    #[error("Connection error: cannot reach {endpoint}")]
    Connection { endpoint: String },

    /// Request timeout.
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The requested model is not available.
    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The provider answered without any content.
    #[error("Empty response from {provider}")]
    EmptyResponse { provider: String },

    /// A paid provider is configured without a key.
    #[error("No API key configured for provider '{provider}'")]
    MissingApiKey { provider: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AiError {
    /// Map a transport failure to the most specific variant.
    pub(crate) fn from_request(err: reqwest::Error, endpoint: &str, timeout_seconds: u64) -> Self {
        if err.is_connect() {
            AiError::Connection {
                endpoint: endpoint.to_string(),
            }
        } else if err.is_timeout() {
            AiError::Timeout {
                seconds: timeout_seconds,
            }
        } else {
            AiError::Http(err)
        }
    }
}

/// Result type for AI operations.
pub type AiResult<T> = Result<T, AiError>;
