//! Model configuration from TOML (`[model]` section)

use crate::providers::ProviderKind;
use patchpilot_application::ModelClientConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw model configuration from TOML
///
/// # Example
///
/// ```toml
/// [model]
/// provider = "openrouter"              # openai | openrouter | anthropic
/// name = "openai/gpt-4o-mini"
/// api_key_env = "OPENROUTER_API_KEY"   # optional, defaults per provider
/// timeout_seconds = 120
/// max_protocol_retries = 2
/// max_transport_retries = 4
/// backoff_base_ms = 500
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelConfig {
    pub provider: String,
    pub name: String,
    /// Override of the provider's API base URL
    pub base_url: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Per-request timeout
    pub timeout_seconds: u64,
    pub max_protocol_retries: usize,
    pub max_transport_retries: usize,
    pub backoff_base_ms: u64,
    /// Anthropic only
    pub max_tokens: Option<u32>,
}

impl Default for FileModelConfig {
    fn default() -> Self {
        let client = ModelClientConfig::default();
        Self {
            provider: ProviderKind::OpenRouter.as_str().to_string(),
            name: "openai/gpt-4o-mini".to_string(),
            base_url: None,
            api_key_env: None,
            timeout_seconds: 120,
            max_protocol_retries: client.max_protocol_retries,
            max_transport_retries: client.max_transport_retries,
            backoff_base_ms: client.backoff_base.as_millis() as u64,
            max_tokens: None,
        }
    }
}

impl FileModelConfig {
    pub fn provider_kind(&self) -> Result<ProviderKind, String> {
        self.provider.parse()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Configured base URL, or the provider's default.
    pub fn base_url_for(&self, kind: ProviderKind) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| kind.default_base_url().to_string())
    }

    /// Configured key variable, or the provider's default.
    pub fn api_key_env_for(&self, kind: ProviderKind) -> String {
        self.api_key_env
            .clone()
            .unwrap_or_else(|| kind.default_api_key_env().to_string())
    }

    pub fn model_client_config(&self) -> ModelClientConfig {
        ModelClientConfig::default()
            .with_protocol_retries(self.max_protocol_retries)
            .with_transport_retries(self.max_transport_retries)
            .with_backoff_base(Duration::from_millis(self.backoff_base_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_defaults() {
        let config = FileModelConfig::default();
        assert_eq!(config.provider_kind(), Ok(ProviderKind::OpenRouter));
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert_eq!(
            config.api_key_env_for(ProviderKind::OpenRouter),
            "OPENROUTER_API_KEY"
        );
        assert_eq!(
            config.base_url_for(ProviderKind::OpenRouter),
            "https://openrouter.ai/api/v1"
        );
    }

    #[test]
    fn test_model_client_config() {
        let config: FileModelConfig =
            toml::from_str("max_protocol_retries = 5\nbackoff_base_ms = 10").unwrap();
        let client = config.model_client_config();
        assert_eq!(client.max_protocol_retries, 5);
        assert_eq!(client.backoff_base, Duration::from_millis(10));
    }

    #[test]
    fn test_explicit_overrides() {
        let config: FileModelConfig = toml::from_str(
            r#"
provider = "anthropic"
base_url = "http://localhost:8080/v1"
api_key_env = "MY_KEY"
"#,
        )
        .unwrap();
        let kind = config.provider_kind().unwrap();
        assert_eq!(kind, ProviderKind::Anthropic);
        assert_eq!(config.base_url_for(kind), "http://localhost:8080/v1");
        assert_eq!(config.api_key_env_for(kind), "MY_KEY");
    }
}
