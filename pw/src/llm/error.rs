//! Generation backend error types

use thiserror::Error;

/// Errors that can occur when calling the generation backend
///
/// The plan pipeline treats every variant uniformly as "generation
/// failed"; the distinctions exist for logging and for the chat layer's
/// error messages only.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No API key in the configured environment variable
    #[error("No API key found. Set the {env} environment variable.")]
    MissingApiKey { env: String },

    /// Provider is "none" or unrecognized - the documented fallback trigger
    #[error("Unsupported generation provider: '{provider}'")]
    UnsupportedProvider { provider: String },

    /// Safety filter or other non-success finish reason
    #[error("Backend rejected the request: {reason}")]
    Rejected { reason: String },

    /// Backend returned a response with no text
    #[error("Backend returned an empty response")]
    EmptyResponse,

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenerationError {
    /// True for configuration-level failures where no request was made
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            GenerationError::MissingApiKey { .. } | GenerationError::UnsupportedProvider { .. }
        )
    }
}
