//! Generation backend adapters
//!
//! Provides the `GenerationClient` abstraction the plan pipeline talks
//! to, plus the OpenAI-compatible implementation.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod openai;

pub use client::GenerationClient;
pub use error::GenerationError;
pub use openai::OpenAiCompatClient;

use crate::config::LlmConfig;

/// Create a generation client for the configured provider
///
/// The provider `"none"` (and anything unrecognized) returns
/// `UnsupportedProvider`, which callers route to deterministic fallback
/// synthesis rather than treating as fatal.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn GenerationClient>, GenerationError> {
    debug!(provider = %config.provider, model = %config.model, "Creating generation client");

    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiCompatClient::from_config(config)?)),
        other => Err(GenerationError::UnsupportedProvider {
            provider: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_none_provider() {
        let config = LlmConfig {
            provider: "none".to_string(),
            ..LlmConfig::default()
        };

        let result = create_client(&config);
        assert!(matches!(
            result.err(),
            Some(GenerationError::UnsupportedProvider { provider }) if provider == "none"
        ));
    }

    #[test]
    fn test_create_client_unknown_provider() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            ..LlmConfig::default()
        };
        assert!(create_client(&config).err().unwrap().is_unavailable());
    }
}
