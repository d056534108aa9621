//! Configuration types for the Vigil orchestration subsystem

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::provider::{HealthConfig, RetryPolicy};
use crate::task::ComplexityTier;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VigilConfig {
    /// Orchestrator timing and generation defaults
    pub orchestrator: OrchestratorConfig,

    /// Provider health tracking
    pub health: HealthConfig,

    /// Same-provider retry policy
    pub retry: RetryPolicy,

    /// Configured provider backends
    pub providers: Vec<ProviderConfig>,

    /// Per-tier provider priority chains
    pub chains: ChainConfig,

    /// Optional reference-data override file (YAML or JSON)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_data_path: Option<PathBuf>,
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Cap on a single provider call; the effective timeout is the smaller
    /// of this and the task's remaining deadline
    #[serde(with = "humantime_serde")]
    pub call_timeout: Duration,

    /// Sampling temperature passed to providers
    pub temperature: f32,

    /// Maximum tokens requested per call
    pub max_tokens: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

/// Backend kind for a configured provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Local,
    OpenAi,
    Anthropic,
}

/// One configured provider backend.
///
/// `name` is the identity used in chains, the health registry, and the
/// attempt log. Two entries may share a `kind` with different models (e.g.
/// a full-size and a mini model on the same endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub kind: ProviderKind,
    pub model: String,

    /// API key (prefer provider-specific env vars)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Custom endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Per-tier provider priority chains. Order is priority; the health
/// registry filters at execution time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub simple: Vec<String>,
    pub moderate: Vec<String>,
    pub complex: Vec<String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            simple: vec!["local".to_string()],
            moderate: vec!["local".to_string(), "openai-mini".to_string()],
            complex: vec![
                "anthropic".to_string(),
                "openai".to_string(),
                "local".to_string(),
            ],
        }
    }
}

impl ChainConfig {
    /// Declared priority list for a tier.
    pub fn for_tier(&self, tier: ComplexityTier) -> &[String] {
        match tier {
            ComplexityTier::Simple => &self.simple,
            ComplexityTier::Moderate => &self.moderate,
            ComplexityTier::Complex => &self.complex,
        }
    }
}

impl VigilConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. Configuration file (vigil.toml or path from VIGIL_CONFIG_PATH)
    /// 3. Environment variable overrides (VIGIL_-prefixed)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is invalid.
    pub fn load() -> crate::error::Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Toml},
        };

        let mut figment = Figment::new()
            .merge(Toml::file("vigil.toml"))
            .merge(Env::prefixed("VIGIL_").split("_"));

        if let Ok(path) = std::env::var("VIGIL_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: VigilConfig = figment.extract().map_err(|e| {
            crate::error::VigilError::Configuration(format!("Failed to load configuration: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Toml},
        };

        let config: VigilConfig = Figment::new()
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                crate::error::VigilError::Configuration(format!(
                    "Failed to load configuration file: {}",
                    e
                ))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a chain names a provider that is not configured
    /// or timing values are unusable.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.orchestrator.call_timeout.is_zero() {
            return Err(crate::error::VigilError::Configuration(
                "call_timeout must be greater than zero".to_string(),
            ));
        }

        if !self.providers.is_empty() {
            let names: Vec<&str> = self.providers.iter().map(|p| p.name.as_str()).collect();
            for tier in [
                ComplexityTier::Simple,
                ComplexityTier::Moderate,
                ComplexityTier::Complex,
            ] {
                for entry in self.chains.for_tier(tier) {
                    if !names.contains(&entry.as_str()) {
                        return Err(crate::error::VigilError::Configuration(format!(
                            "chain for {:?} tier references unconfigured provider '{}'",
                            tier, entry
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chains_match_routing_strategy() {
        let chains = ChainConfig::default();
        assert_eq!(chains.for_tier(ComplexityTier::Simple), ["local"]);
        assert_eq!(chains.for_tier(ComplexityTier::Complex).len(), 3);
        // Local is the final fallback of the complex chain
        assert_eq!(chains.for_tier(ComplexityTier::Complex).last().unwrap(), "local");
    }

    #[test]
    fn test_validate_rejects_unconfigured_chain_entry() {
        let config = VigilConfig {
            providers: vec![ProviderConfig {
                name: "local".to_string(),
                kind: ProviderKind::Local,
                model: "llama3.1:8b".to_string(),
                api_key: None,
                base_url: None,
            }],
            ..Default::default()
        };

        // Default chains reference openai/anthropic which are not configured
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_consistent_config() {
        let config = VigilConfig {
            providers: vec![ProviderConfig {
                name: "local".to_string(),
                kind: ProviderKind::Local,
                model: "llama3.1:8b".to_string(),
                api_key: None,
                base_url: None,
            }],
            chains: ChainConfig {
                simple: vec!["local".to_string()],
                moderate: vec!["local".to_string()],
                complex: vec!["local".to_string()],
            },
            ..Default::default()
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_provider_list_skips_chain_check() {
        // A config with no providers is valid; the orchestrator builder is
        // responsible for requiring at least one at construction time
        assert!(VigilConfig::default().validate().is_ok());
    }
}
