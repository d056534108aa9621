//! Local (Ollama-compatible) provider implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::provider::{
    ProviderClient, ProviderError, ProviderInfo, ProviderRequest, ProviderResponse, TokenUsage,
};

/// Local model backend speaking the Ollama chat API. Free and keeps
/// clinical context on the machine, so it anchors every fallback chain.
pub struct LocalProvider {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl LocalProvider {
    /// Create a new local provider.
    ///
    /// # Arguments
    ///
    /// * `model` - Model name (e.g., "llama3.1:8b")
    /// * `base_url` - API base URL (defaults to "http://localhost:11434")
    pub fn new(model: impl Into<String>, base_url: Option<impl Into<String>>) -> Self {
        Self {
            client: reqwest::Client::new(),
            model: model.into(),
            base_url: base_url
                .map(|u| u.into())
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
        }
    }

    /// Create from environment variables.
    ///
    /// Reads from:
    /// - `OLLAMA_MODEL` - Model name (optional, defaults to "llama3.1:8b")
    /// - `OLLAMA_BASE_URL` - Base URL (optional)
    pub fn from_env(model: Option<impl Into<String>>) -> Self {
        let model = model
            .map(|m| m.into())
            .or_else(|| std::env::var("OLLAMA_MODEL").ok())
            .unwrap_or_else(|| "llama3.1:8b".to_string());

        let base_url = std::env::var("OLLAMA_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:11434".to_string());

        Self::new(model, Some(base_url))
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<usize>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessageResponse,
    #[serde(default)]
    prompt_eval_count: Option<usize>,
    #[serde(default)]
    eval_count: Option<usize>,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[async_trait]
impl ProviderClient for LocalProvider {
    async fn invoke(
        &self,
        request: &ProviderRequest,
        timeout: Duration,
    ) -> Result<ProviderResponse, ProviderError> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.user.clone(),
        });

        let body = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, timeout))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transport(format!("unreadable response body: {}", e)))?;

        let usage = match (chat.prompt_eval_count, chat.eval_count) {
            (Some(prompt_tokens), Some(completion_tokens)) => Some(TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
            _ => None,
        };

        Ok(ProviderResponse {
            content: chat.message.content.trim().to_string(),
            usage,
        })
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            provider: "local".to_string(),
            model: self.model.clone(),
        }
    }
}

pub(crate) fn map_transport_error(e: reqwest::Error, timeout: Duration) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_provider_creation() {
        let provider = LocalProvider::new("llama3.1:8b", None::<String>);
        assert_eq!(provider.model(), "llama3.1:8b");
        assert_eq!(provider.info().provider, "local");
    }

    #[test]
    fn test_from_env_default() {
        unsafe {
            std::env::remove_var("OLLAMA_MODEL");
            std::env::remove_var("OLLAMA_BASE_URL");
        }

        let provider = LocalProvider::from_env(None::<String>);
        assert_eq!(provider.model(), "llama3.1:8b");
    }
}
