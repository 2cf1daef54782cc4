//! OpenAI-compatible chat-completions client
//!
//! Works against any endpoint speaking the OpenAI Chat Completions wire
//! format; the base URL is configurable for self-hosted or proxied
//! deployments.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{GenerationClient, GenerationError};
use crate::config::LlmConfig;

/// OpenAI-compatible API client
pub struct OpenAiCompatClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiCompatClient {
    /// Create a new client from configuration
    ///
    /// Fails with `MissingApiKey` if the configured environment variable
    /// is unset - the documented trigger for fallback synthesis.
    pub fn from_config(config: &LlmConfig) -> Result<Self, GenerationError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| GenerationError::MissingApiKey {
            env: config.api_key_env.clone(),
        })?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            http,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn build_request_body(&self, prompt: &str, json_mode: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": prompt,
            }],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        if json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        body
    }

    /// Send one completion request and extract the response text
    async fn complete(&self, prompt: &str, json_mode: bool) -> Result<String, GenerationError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(model = %self.model, json_mode, prompt_len = prompt.len(), "Sending completion request");

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&self.build_request_body(prompt, json_mode))
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::ApiError { status, message });
        }

        let api_response: ChatCompletionResponse = serde_json::from_str(&response.text().await?)?;
        extract_text(api_response)
    }
}

/// Pull the text out of a completion response, mapping non-success finish
/// reasons and empty text to failures
fn extract_text(response: ChatCompletionResponse) -> Result<String, GenerationError> {
    let choice = response.choices.into_iter().next().ok_or(GenerationError::EmptyResponse)?;

    match choice.finish_reason.as_deref() {
        Some("stop") | Some("length") | None => {}
        Some(other) => {
            return Err(GenerationError::Rejected {
                reason: other.to_string(),
            });
        }
    }

    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(GenerationError::EmptyResponse),
    }
}

#[async_trait]
impl GenerationClient for OpenAiCompatClient {
    async fn generate_structured(&self, prompt: &str) -> Result<String, GenerationError> {
        self.complete(prompt, true).await
    }

    async fn generate_conversational(&self, prompt: &str) -> Result<String, GenerationError> {
        self.complete(prompt, false).await
    }
}

// Wire types for the Chat Completions response

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(content: Option<&str>, finish_reason: Option<&str>) -> ChatCompletionResponse {
        ChatCompletionResponse {
            choices: vec![ChatChoice {
                message: ChatMessage {
                    content: content.map(String::from),
                },
                finish_reason: finish_reason.map(String::from),
            }],
        }
    }

    #[test]
    fn test_extract_text_success() {
        let result = extract_text(response(Some("{\"phases\": []}"), Some("stop")));
        assert_eq!(result.unwrap(), "{\"phases\": []}");
    }

    #[test]
    fn test_extract_text_content_filter_is_rejected() {
        let result = extract_text(response(Some("partial"), Some("content_filter")));
        assert!(matches!(result, Err(GenerationError::Rejected { reason }) if reason == "content_filter"));
    }

    #[test]
    fn test_extract_text_empty_content() {
        assert!(matches!(
            extract_text(response(Some("   "), Some("stop"))),
            Err(GenerationError::EmptyResponse)
        ));
        assert!(matches!(
            extract_text(response(None, Some("stop"))),
            Err(GenerationError::EmptyResponse)
        ));
        assert!(matches!(
            extract_text(ChatCompletionResponse { choices: vec![] }),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[test]
    fn test_truncated_response_is_kept() {
        // "length" is degraded but still usable; the normalizer decides
        let result = extract_text(response(Some("{\"phases\":"), Some("length")));
        assert!(result.is_ok());
    }

    #[test]
    fn test_build_request_body_json_mode() {
        let client = OpenAiCompatClient {
            model: "gpt-4o-mini".to_string(),
            api_key: "test".to_string(),
            base_url: "https://api.openai.com".to_string(),
            http: Client::new(),
            max_tokens: 2048,
            temperature: 0.2,
        };

        let body = client.build_request_body("make a plan", true);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 2048);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["content"], "make a plan");

        let body = client.build_request_body("chat", false);
        assert!(body.get("response_format").is_none());
    }
}
