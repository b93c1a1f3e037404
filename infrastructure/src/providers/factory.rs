//! Provider selection
//!
//! The one place that branches on the configured provider. Everything after
//! startup talks to the returned `Arc<dyn LlmGateway>`.

use super::{AnthropicGateway, OpenAiGateway, ProviderKind};
use crate::config::FileModelConfig;
use patchpilot_application::{GatewayError, LlmGateway};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors raised while building a gateway.
#[derive(Error, Debug)]
pub enum ProviderSetupError {
    #[error("{0}")]
    UnknownProvider(String),

    #[error("API key not found: set the {env} environment variable")]
    MissingApiKey { env: String },

    #[error("Failed to create provider client: {0}")]
    Client(#[from] GatewayError),
}

/// Build the configured gateway, reading the API key from its environment
/// variable.
pub fn create_gateway(config: &FileModelConfig) -> Result<Arc<dyn LlmGateway>, ProviderSetupError> {
    let kind = config
        .provider_kind()
        .map_err(ProviderSetupError::UnknownProvider)?;
    let env = config.api_key_env_for(kind);
    let api_key = std::env::var(&env)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or(ProviderSetupError::MissingApiKey { env })?;
    create_gateway_with_key(config, &api_key)
}

/// Build the configured gateway with an explicit API key.
pub fn create_gateway_with_key(
    config: &FileModelConfig,
    api_key: &str,
) -> Result<Arc<dyn LlmGateway>, ProviderSetupError> {
    let kind = config
        .provider_kind()
        .map_err(ProviderSetupError::UnknownProvider)?;
    let base_url = config.base_url_for(kind);
    info!(provider = %kind, model = %config.name, base_url = %base_url, "Creating model gateway");

    let gateway: Arc<dyn LlmGateway> = match kind {
        ProviderKind::OpenAi | ProviderKind::OpenRouter => Arc::new(OpenAiGateway::new(
            kind,
            &config.name,
            base_url,
            api_key,
            config.timeout(),
        )?),
        ProviderKind::Anthropic => {
            let mut gateway =
                AnthropicGateway::new(&config.name, base_url, api_key, config.timeout())?;
            if let Some(max_tokens) = config.max_tokens {
                gateway = gateway.with_max_tokens(max_tokens);
            }
            Arc::new(gateway)
        }
    };
    Ok(gateway)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> FileModelConfig {
        FileModelConfig {
            provider: provider.to_string(),
            name: "some-model".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_each_provider() {
        for (provider, expected) in [
            ("openai", "openai"),
            ("openrouter", "openrouter"),
            ("anthropic", "anthropic"),
        ] {
            let gateway = create_gateway_with_key(&config(provider), "k").unwrap();
            assert_eq!(gateway.provider_name(), expected);
            assert_eq!(gateway.model_name(), "some-model");
        }
    }

    #[test]
    fn test_unknown_provider() {
        let err = create_gateway_with_key(&config("mistral"), "k").err().unwrap();
        assert!(matches!(err, ProviderSetupError::UnknownProvider(_)));
    }

    #[test]
    fn test_missing_api_key() {
        let mut config = config("openai");
        config.api_key_env = Some("PATCHPILOT_TEST_KEY_THAT_IS_NEVER_SET".into());
        let err = create_gateway(&config).err().unwrap();
        assert!(err.to_string().contains("PATCHPILOT_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
