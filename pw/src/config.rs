//! Planweaver configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::plan::ParseFailurePolicy;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation backend configuration
    pub llm: LlmConfig,

    /// Workspace scanning configuration
    pub scan: ScanConfig,

    /// Plan pipeline configuration
    pub plan: PlanConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .planweaver.yml
        let local_config = PathBuf::from(".planweaver.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/planweaver/planweaver.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("planweaver").join("planweaver.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "openai" or "none" (no-op, fallback plans only)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 4096,
            temperature: 0.2,
            timeout_ms: 120_000,
        }
    }
}

/// Workspace scanning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum files collected per scan
    #[serde(rename = "max-files")]
    pub max_files: usize,

    /// Glob patterns excluded from the scan (workspace-relative)
    pub exclude: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_files: 500,
            exclude: vec![
                "target/**".to_string(),
                "node_modules/**".to_string(),
                "dist/**".to_string(),
                "build/**".to_string(),
                "vendor/**".to_string(),
                "**/*.lock".to_string(),
            ],
        }
    }
}

/// Plan pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Maximum files embedded in prompts and fallback plans
    #[serde(rename = "prompt-file-cap")]
    pub prompt_file_cap: usize,

    /// How a modification request handles unparseable backend output.
    /// Fresh generation always falls back; this flag governs only the
    /// modification path, which surfaces the error by default.
    #[serde(rename = "modify-parse-failure")]
    pub modify_parse_failure: ParseFailurePolicy,

    /// Conversation exchanges kept for modification prompts
    #[serde(rename = "history-window")]
    pub history_window: usize,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            prompt_file_cap: 10,
            modify_parse_failure: ParseFailurePolicy::Propagate,
            history_window: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.scan.max_files, 500);
        assert_eq!(config.plan.prompt_file_cap, 10);
        assert_eq!(config.plan.modify_parse_failure, ParseFailurePolicy::Propagate);
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
llm:
  provider: openai
  model: gpt-4o
  api-key-env: MY_API_KEY
  base-url: https://llm.internal.example.com
  max-tokens: 2048
  temperature: 0.7
  timeout-ms: 60000

scan:
  max-files: 100
  exclude:
    - "target/**"

plan:
  prompt-file-cap: 5
  modify-parse-failure: fallback
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.api_key_env, "MY_API_KEY");
        assert_eq!(config.llm.max_tokens, 2048);
        assert_eq!(config.scan.max_files, 100);
        assert_eq!(config.scan.exclude, vec!["target/**"]);
        assert_eq!(config.plan.prompt_file_cap, 5);
        assert_eq!(config.plan.modify_parse_failure, ParseFailurePolicy::Fallback);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
llm:
  provider: none
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        // Specified value
        assert_eq!(config.llm.provider, "none");

        // Defaults for unspecified
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.scan.max_files, 500);
        assert_eq!(config.plan.history_window, 3);
    }
}
