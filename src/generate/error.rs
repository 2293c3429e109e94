//! Generation error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while generating text
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown generator provider: '{0}'. Supported: simulated, anthropic")]
    UnknownProvider(String),

    #[error("Generator API key not found. Set the {0} environment variable.")]
    MissingApiKey(String),
}

impl GenerateError {
    /// Check if the same request is worth sending again
    ///
    /// Rate limits carry their own delay and go back to the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerateError::ApiError { status, .. } => matches!(status, 408 | 500..=599),
            GenerateError::Network(_) => true,
            GenerateError::RateLimited { .. }
            | GenerateError::InvalidResponse(_)
            | GenerateError::Json(_)
            | GenerateError::UnknownProvider(_)
            | GenerateError::MissingApiKey(_) => false,
        }
    }
}
