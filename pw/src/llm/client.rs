//! GenerationClient trait definition

use async_trait::async_trait;

use super::GenerationError;

/// Stateless generation backend - each call is independent
///
/// The two operations share a transport; they differ only in what the
/// caller expects back. `generate_structured` is prompted toward a JSON
/// object (the normalizer copes when the backend disobeys), while
/// `generate_conversational` carries no format contract at all.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Request a JSON-shaped response for plan generation
    async fn generate_structured(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Request a free-text response for general queries
    async fn generate_conversational(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Scripted outcome for one mock call
    pub enum MockOutcome {
        Text(String),
        Fail(GenerationError),
    }

    /// Mock backend for unit tests - replays scripted outcomes in order
    pub struct MockGenerationClient {
        outcomes: Mutex<Vec<MockOutcome>>,
    }

    impl MockGenerationClient {
        pub fn new(outcomes: Vec<MockOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
            }
        }

        /// Convenience: a client that always returns the same text
        pub fn returning(text: impl Into<String>) -> Self {
            Self::new(vec![MockOutcome::Text(text.into())])
        }

        fn next(&self) -> Result<String, GenerationError> {
            let mut outcomes = self.outcomes.lock().expect("mock outcomes poisoned");
            if outcomes.is_empty() {
                return Err(GenerationError::EmptyResponse);
            }
            match outcomes.remove(0) {
                MockOutcome::Text(text) => Ok(text),
                MockOutcome::Fail(error) => Err(error),
            }
        }
    }

    #[async_trait]
    impl GenerationClient for MockGenerationClient {
        async fn generate_structured(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.next()
        }

        async fn generate_conversational(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.next()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_replays_outcomes_in_order() {
            let client = MockGenerationClient::new(vec![
                MockOutcome::Text("first".to_string()),
                MockOutcome::Fail(GenerationError::EmptyResponse),
            ]);

            assert_eq!(client.generate_structured("p").await.unwrap(), "first");
            assert!(client.generate_structured("p").await.is_err());
            // Exhausted scripts fail rather than panic
            assert!(client.generate_conversational("p").await.is_err());
        }

        #[tokio::test]
        async fn test_returning_convenience() {
            let client = MockGenerationClient::returning("hello");
            assert_eq!(client.generate_conversational("p").await.unwrap(), "hello");
        }
    }
}
