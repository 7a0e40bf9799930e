//! Runtime configuration, sourced from the environment.
//!
//! The OpenAI credential is the only required setting; everything else has a
//! default. A missing credential is reported before any session begins.

use crate::error::{ConfigError, ConfigResult};
use std::fmt;

/// Default Qdrant gRPC endpoint.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
/// Default chat completion model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// Default embedding dimensionality (matches the default embedding model).
pub const DEFAULT_EMBEDDING_DIMENSIONS: u64 = 1536;
/// Default vector collection name.
pub const DEFAULT_COLLECTION: &str = "docbot_documents";
/// Default number of chunks retrieved per query.
pub const DEFAULT_TOP_K: u64 = 5;
/// Default minimum similarity score for a chunk to count as grounding.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.25;
/// Default maximum chunk size in characters.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 2000;

/// Web search backend selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchBackend {
    /// No fallback search; answers are grounded in the document only.
    Disabled,
    /// Self-hosted SearXNG instance (no API key).
    Searxng {
        /// Base URL of the instance, e.g. `http://localhost:8080`.
        base_url: String,
    },
    /// Hosted Tavily search API.
    Tavily {
        /// Tavily API key.
        api_key: String,
    },
}

/// Application configuration.
#[derive(Clone)]
pub struct BotConfig {
    /// OpenAI API key. Required.
    pub openai_api_key: String,
    /// OpenAI-compatible API base URL.
    pub openai_base_url: String,
    /// Qdrant endpoint.
    pub qdrant_url: String,
    /// Vector collection name.
    pub collection: String,
    /// Chat completion model id.
    pub chat_model: String,
    /// Embedding model id.
    pub embedding_model: String,
    /// Embedding dimensionality.
    pub embedding_dimensions: u64,
    /// Number of chunks retrieved per query.
    pub top_k: u64,
    /// Minimum similarity score for retrieved chunks to count as grounding.
    pub score_threshold: f32,
    /// Maximum chunk size in characters.
    pub max_chunk_chars: usize,
    /// Web search fallback backend.
    pub search: SearchBackend,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("openai_api_key", &"[REDACTED]")
            .field("openai_base_url", &self.openai_base_url)
            .field("qdrant_url", &self.qdrant_url)
            .field("collection", &self.collection)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_dimensions", &self.embedding_dimensions)
            .field("top_k", &self.top_k)
            .field("search", &self.search.name())
            .finish_non_exhaustive()
    }
}

impl SearchBackend {
    /// Human-readable backend name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Searxng { .. } => "searxng",
            Self::Tavily { .. } => "tavily",
        }
    }
}

impl BotConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `OPENAI_API_KEY` is absent, or
    /// [`ConfigError::Invalid`] for unparseable numeric overrides.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// This is the testable seam behind [`BotConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let openai_api_key = lookup("OPENAI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::missing("OPENAI_API_KEY"))?;

        let search = if let Some(key) = lookup("TAVILY_API_KEY") {
            SearchBackend::Tavily { api_key: key }
        } else if let Some(url) = lookup("SEARXNG_BASE_URL") {
            SearchBackend::Searxng { base_url: url }
        } else {
            SearchBackend::Disabled
        };

        Ok(Self {
            openai_api_key,
            openai_base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            qdrant_url: lookup("QDRANT_URL").unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
            collection: lookup("DOCBOT_COLLECTION")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            chat_model: lookup("DOCBOT_CHAT_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_model: lookup("DOCBOT_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimensions: parse_or(
                lookup("DOCBOT_EMBEDDING_DIMENSIONS"),
                "DOCBOT_EMBEDDING_DIMENSIONS",
                DEFAULT_EMBEDDING_DIMENSIONS,
            )?,
            top_k: parse_or(lookup("DOCBOT_TOP_K"), "DOCBOT_TOP_K", DEFAULT_TOP_K)?,
            score_threshold: parse_or(
                lookup("DOCBOT_SCORE_THRESHOLD"),
                "DOCBOT_SCORE_THRESHOLD",
                DEFAULT_SCORE_THRESHOLD,
            )?,
            max_chunk_chars: parse_or(
                lookup("DOCBOT_MAX_CHUNK_CHARS"),
                "DOCBOT_MAX_CHUNK_CHARS",
                DEFAULT_MAX_CHUNK_CHARS,
            )?,
            search,
        })
    }
}

/// Parse an optional override, falling back to a default.
fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &str,
    default: T,
) -> ConfigResult<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::invalid(format!("{key}: {raw}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from<'a>(map: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| map.get(key).map(ToString::to_string)
    }

    #[test]
    fn test_defaults_applied() {
        let env = HashMap::from([("OPENAI_API_KEY", "sk-test")]);
        let config = BotConfig::from_lookup(lookup_from(&env)).unwrap();

        assert_eq!(config.qdrant_url, DEFAULT_QDRANT_URL);
        assert_eq!(config.chat_model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.embedding_dimensions, DEFAULT_EMBEDDING_DIMENSIONS);
        assert_eq!(config.collection, DEFAULT_COLLECTION);
        assert_eq!(config.search, SearchBackend::Disabled);
    }

    #[test]
    fn test_missing_credential_is_fatal() {
        let env = HashMap::new();
        let err = BotConfig::from_lookup(lookup_from(&env)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_blank_credential_is_missing() {
        let env = HashMap::from([("OPENAI_API_KEY", "  ")]);
        let err = BotConfig::from_lookup(lookup_from(&env)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_overrides() {
        let env = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("QDRANT_URL", "http://qdrant:6334"),
            ("DOCBOT_TOP_K", "3"),
            ("SEARXNG_BASE_URL", "http://searx:8080"),
        ]);
        let config = BotConfig::from_lookup(lookup_from(&env)).unwrap();

        assert_eq!(config.qdrant_url, "http://qdrant:6334");
        assert_eq!(config.top_k, 3);
        assert_eq!(
            config.search,
            SearchBackend::Searxng {
                base_url: "http://searx:8080".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_numeric_override() {
        let env = HashMap::from([("OPENAI_API_KEY", "sk-test"), ("DOCBOT_TOP_K", "lots")]);
        let err = BotConfig::from_lookup(lookup_from(&env)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let env = HashMap::from([("OPENAI_API_KEY", "sk-secret")]);
        let config = BotConfig::from_lookup(lookup_from(&env)).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("REDACTED"));
    }
}
