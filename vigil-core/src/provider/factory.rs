//! Factory for creating provider clients from configuration

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{Result, VigilError};
use crate::provider::ProviderClient;
use crate::provider::providers::{AnthropicProvider, LocalProvider, OpenAiProvider};

/// Factory for creating provider clients
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider client from configuration.
    ///
    /// API keys come from the config entry when present, otherwise from the
    /// backend's environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if a required API key is missing.
    pub fn create(config: &ProviderConfig) -> Result<Arc<dyn ProviderClient>> {
        match config.kind {
            ProviderKind::Local => {
                let provider = LocalProvider::new(config.model.clone(), config.base_url.clone());
                Ok(Arc::new(provider))
            }

            ProviderKind::OpenAi => {
                let provider = match &config.api_key {
                    Some(api_key) => match &config.base_url {
                        Some(base_url) => OpenAiProvider::with_base_url(
                            api_key.clone(),
                            config.model.clone(),
                            base_url.clone(),
                        ),
                        None => OpenAiProvider::new(api_key.clone(), config.model.clone()),
                    },
                    None => OpenAiProvider::from_env(Some(config.model.clone())).map_err(|e| {
                        VigilError::Configuration(format!("provider '{}': {}", config.name, e))
                    })?,
                };
                Ok(Arc::new(provider))
            }

            ProviderKind::Anthropic => {
                let provider = match &config.api_key {
                    Some(api_key) => match &config.base_url {
                        Some(base_url) => AnthropicProvider::with_base_url(
                            api_key.clone(),
                            config.model.clone(),
                            base_url.clone(),
                        ),
                        None => AnthropicProvider::new(api_key.clone(), config.model.clone()),
                    },
                    None => {
                        AnthropicProvider::from_env(Some(config.model.clone())).map_err(|e| {
                            VigilError::Configuration(format!("provider '{}': {}", config.name, e))
                        })?
                    }
                };
                Ok(Arc::new(provider))
            }
        }
    }

    /// Build every configured provider, keyed by registry name.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate names or a provider that cannot be
    /// constructed.
    pub fn build_all(configs: &[ProviderConfig]) -> Result<HashMap<String, Arc<dyn ProviderClient>>> {
        let mut providers = HashMap::new();
        for config in configs {
            if providers.contains_key(&config.name) {
                return Err(VigilError::Configuration(format!(
                    "duplicate provider name '{}'",
                    config.name
                )));
            }
            providers.insert(config.name.clone(), Self::create(config)?);
        }
        Ok(providers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config(name: &str) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            kind: ProviderKind::Local,
            model: "llama3.1:8b".to_string(),
            api_key: None,
            base_url: None,
        }
    }

    #[test]
    fn test_create_local_provider() {
        let client = ProviderFactory::create(&local_config("local")).unwrap();
        assert_eq!(client.info().provider, "local");
    }

    #[test]
    fn test_create_hosted_provider_with_inline_key() {
        let config = ProviderConfig {
            name: "openai".to_string(),
            kind: ProviderKind::OpenAi,
            model: "gpt-4o".to_string(),
            api_key: Some("sk-test".to_string()),
            base_url: None,
        };

        let client = ProviderFactory::create(&config).unwrap();
        assert_eq!(client.info().model, "gpt-4o");
    }

    #[test]
    fn test_build_all_rejects_duplicate_names() {
        let configs = vec![local_config("local"), local_config("local")];
        assert!(ProviderFactory::build_all(&configs).is_err());
    }

    #[test]
    fn test_same_kind_different_models() {
        let configs = vec![
            ProviderConfig {
                name: "openai".to_string(),
                kind: ProviderKind::OpenAi,
                model: "gpt-4o".to_string(),
                api_key: Some("sk-test".to_string()),
                base_url: None,
            },
            ProviderConfig {
                name: "openai-mini".to_string(),
                kind: ProviderKind::OpenAi,
                model: "gpt-4o-mini".to_string(),
                api_key: Some("sk-test".to_string()),
                base_url: None,
            },
        ];

        let providers = ProviderFactory::build_all(&configs).unwrap();
        assert_eq!(providers.len(), 2);
        assert_eq!(providers["openai-mini"].info().model, "gpt-4o-mini");
    }
}
