//! Chat completion via the OpenAI chat completions API.

use crate::config::BotConfig;
use crate::error::{AgentError, AgentResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A message in the completion request, wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user" or "assistant".
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Generates text from a sequence of chat messages.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Run one completion and return the generated text.
    async fn complete(&self, messages: &[ChatMessage]) -> AgentResult<String>;
}

/// Completion model backed by the OpenAI `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiChat {
    http: reqwest::Client,
    api_key: Arc<str>,
    base_url: Arc<str>,
    model: String,
}

impl std::fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

impl OpenAiChat {
    /// Create a completion client from the application configuration.
    #[must_use]
    pub fn new(config: &BotConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: Arc::from(config.openai_api_key.as_str()),
            base_url: Arc::from(config.openai_base_url.trim_end_matches('/')),
            model: config.chat_model.clone(),
        }
    }
}

#[async_trait]
impl CompletionModel for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> AgentResult<String> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::completion(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AgentError::completion(
                "unauthorized: check that OPENAI_API_KEY is valid",
            ));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::completion(format!("{status}: {detail}")));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AgentError::completion(format!("invalid response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AgentError::completion("empty choices in response"))?;

        debug!(model = %self.model, chars = text.len(), "completion finished");
        Ok(text)
    }
}
