//! Embedding generation via the OpenAI embeddings API.

use crate::config::BotConfig;
use crate::error::EmbeddingError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Produces embedding vectors for text.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Dimensionality of the produced vectors.
    fn dimensions(&self) -> u64;
}

/// Embedding model backed by the OpenAI `/embeddings` endpoint.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    http: reqwest::Client,
    api_key: Arc<str>,
    base_url: Arc<str>,
    model: String,
    dimensions: u64,
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u64>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Create an embedder from the application configuration.
    #[must_use]
    pub fn new(config: &BotConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: Arc::from(config.openai_api_key.as_str()),
            base_url: Arc::from(config.openai_base_url.trim_end_matches('/')),
            model: config.embedding_model.clone(),
            dimensions: config.embedding_dimensions,
        }
    }

    /// Whether the model accepts an explicit `dimensions` parameter.
    ///
    /// Only the v3 embedding models do; older models reject it.
    fn supports_dimensions(&self) -> bool {
        self.model.starts_with("text-embedding-3")
    }
}

#[async_trait]
impl EmbeddingModel for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingsRequest {
            model: &self.model,
            input: texts,
            dimensions: self.supports_dimensions().then_some(self.dimensions),
        };

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Http(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(EmbeddingError::Unauthorized);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::api(format!("{status}: {detail}")));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        // The API is allowed to return data out of order; restore input order.
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        debug!(count = data.len(), model = %self.model, "embedded batch");
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> u64 {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;

    fn config() -> BotConfig {
        BotConfig::from_lookup(|key| {
            (key == "OPENAI_API_KEY").then(|| "sk-secret".to_string())
        })
        .unwrap()
    }

    #[test]
    fn test_debug_redacts_key() {
        let embedder = OpenAiEmbedder::new(&config());
        let rendered = format!("{embedder:?}");
        assert!(!rendered.contains("sk-secret"));
    }

    #[test]
    fn test_dimensions_param_gated_on_model() {
        let mut cfg = config();
        let v3 = OpenAiEmbedder::new(&cfg);
        assert!(v3.supports_dimensions());

        cfg.embedding_model = "text-embedding-ada-002".to_string();
        let ada = OpenAiEmbedder::new(&cfg);
        assert!(!ada.supports_dimensions());
    }

    #[tokio::test]
    async fn test_empty_batch_short_circuits() {
        let embedder = OpenAiEmbedder::new(&config());
        // No request is made for an empty batch, so no network is needed.
        let out = embedder.embed(&[]).await.unwrap();
        assert!(out.is_empty());
    }
}
