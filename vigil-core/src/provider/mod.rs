//! Provider capability layer
//!
//! Every model backend, local or hosted, is reached through the same
//! capability trait: render a prompt upstream, `invoke` it here with a hard
//! timeout, get text back. Backends differ only in wire format, so each is
//! a variant implementation of the trait, not a hierarchy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod factory;
pub mod health;
pub mod providers;
pub mod retry;

pub use factory::ProviderFactory;
pub use health::{HealthConfig, HealthRegistry};
pub use retry::{RetryPolicy, RetryState};

/// A rendered prompt ready for a provider call.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// System instructions, if the backend supports a system role
    pub system: Option<String>,

    /// User prompt text
    pub user: String,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<usize>,
}

/// Raw provider output, before validation.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// Token usage reported by a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Backend identification for logs and results
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub provider: String,
    pub model: String,
}

/// Transport-layer error from a provider call.
///
/// The retryable split drives the orchestrator's same-provider retry loop:
/// transient transport conditions are retried, everything else advances the
/// failover chain.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network/connection failure, including unreadable response bodies
    #[error("transport failure: {0}")]
    Transport(String),

    /// The call exceeded its timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// HTTP 429 from the backend
    #[error("rate limited by provider")]
    RateLimited,

    /// Non-success HTTP status
    #[error("provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// Missing API key or equivalent setup problem
    #[error("provider misconfigured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Whether the same provider is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(_) | ProviderError::Timeout(_) | ProviderError::RateLimited => {
                true
            }
            ProviderError::Api { status, .. } => *status >= 500,
            ProviderError::NotConfigured(_) => false,
        }
    }

    /// Map a non-success HTTP status and body into the right variant.
    pub(crate) fn from_status(status: u16, message: String) -> Self {
        if status == 429 {
            ProviderError::RateLimited
        } else {
            ProviderError::Api { status, message }
        }
    }
}

/// Trait for model backend implementations.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Invoke the backend with a hard per-call timeout.
    ///
    /// Implementations must return `ProviderError::Timeout` rather than
    /// hang past `timeout`; the orchestrator additionally bounds the call
    /// from outside so a misbehaving implementation is still abandoned.
    async fn invoke(
        &self,
        request: &ProviderRequest,
        timeout: Duration,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Backend identification
    fn info(&self) -> ProviderInfo;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_split() {
        assert!(ProviderError::Transport("reset".into()).is_retryable());
        assert!(ProviderError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(ProviderError::RateLimited.is_retryable());
        assert!(
            ProviderError::Api {
                status: 503,
                message: "overloaded".into()
            }
            .is_retryable()
        );

        assert!(
            !ProviderError::Api {
                status: 400,
                message: "bad request".into()
            }
            .is_retryable()
        );
        assert!(!ProviderError::NotConfigured("no key".into()).is_retryable());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            ProviderError::from_status(429, String::new()),
            ProviderError::RateLimited
        ));
        assert!(matches!(
            ProviderError::from_status(500, String::new()),
            ProviderError::Api { status: 500, .. }
        ));
    }
}
