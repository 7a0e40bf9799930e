//! Web search fallback for the conversational agent.
//!
//! When the knowledge base yields insufficient grounding, the agent queries a
//! pluggable search backend instead. Built-in providers:
//!
//! - [`SearxngProvider`] - self-hosted SearXNG instance, no API key.
//! - [`TavilyProvider`] - hosted Tavily API, requires a key.
//!
//! Implement [`SearchProvider`] to add custom backends.

use crate::config::{BotConfig, SearchBackend};
use crate::error::SearchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single web search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Title of the result.
    pub title: String,
    /// URL of the result.
    pub url: String,
    /// Snippet / description text.
    pub snippet: String,
}

impl fmt::Display for SearchHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]({})\n{}", self.title, self.url, self.snippet)
    }
}

/// Pluggable search backend trait.
#[async_trait]
pub trait SearchProvider: Send + Sync + fmt::Debug {
    /// A human-readable name for this provider.
    fn provider_name(&self) -> &str;

    /// Execute a search query and return up to `max_results` results.
    async fn search(&self, query: &str, max_results: usize)
    -> Result<Vec<SearchHit>, SearchError>;
}

/// A boxed search provider for dynamic dispatch.
pub type BoxedSearchProvider = Box<dyn SearchProvider>;

/// Build a provider from the configured backend, if any.
#[must_use]
pub fn provider_from_config(config: &BotConfig) -> Option<BoxedSearchProvider> {
    match &config.search {
        SearchBackend::Disabled => None,
        SearchBackend::Searxng { base_url } => Some(Box::new(SearxngProvider::new(base_url))),
        SearchBackend::Tavily { api_key } => Some(Box::new(TavilyProvider::new(api_key))),
    }
}

// ============================================================================
// SearXNG
// ============================================================================

/// Search provider backed by a self-hosted [SearXNG](https://docs.searxng.org/)
/// instance. The instance must allow the JSON output format.
#[derive(Clone)]
pub struct SearxngProvider {
    http: reqwest::Client,
    base_url: String,
}

impl fmt::Debug for SearxngProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearxngProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Deserialize)]
struct SearxngResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl SearxngProvider {
    /// Create a provider pointing at the given instance.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl SearchProvider for SearxngProvider {
    fn provider_name(&self) -> &str {
        "searxng"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
            .map_err(|e| SearchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Provider(format!("searxng: {status}")));
        }

        let parsed: SearxngResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        Ok(parsed
            .results
            .into_iter()
            .take(max_results)
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: r.content,
            })
            .collect())
    }
}

// ============================================================================
// Tavily
// ============================================================================

/// Search provider backed by the [Tavily](https://tavily.com) API.
///
/// The API key is sent via the `Authorization: Bearer` header.
#[derive(Clone)]
pub struct TavilyProvider {
    http: reqwest::Client,
    api_key: String,
}

impl fmt::Debug for TavilyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TavilyProvider")
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl TavilyProvider {
    /// Create a provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    fn provider_name(&self) -> &str {
        "tavily"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let body = TavilyRequest { query, max_results };

        let response = self
            .http
            .post("https://api.tavily.com/search")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Provider(format!("tavily: {status}")));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        Ok(parsed
            .results
            .into_iter()
            .take(max_results)
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: r.content,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;

    #[test]
    fn test_hit_display() {
        let hit = SearchHit {
            title: "Refund law".to_string(),
            url: "https://example.com/refunds".to_string(),
            snippet: "Statutory refund windows.".to_string(),
        };
        let rendered = hit.to_string();
        assert!(rendered.starts_with("[Refund law](https://example.com/refunds)"));
        assert!(rendered.ends_with("Statutory refund windows."));
    }

    #[test]
    fn test_searxng_response_parsing() {
        let raw = r#"{"results":[{"title":"T","url":"https://x","content":"C","extra":1}]}"#;
        let parsed: SearxngResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].title, "T");
    }

    #[test]
    fn test_provider_from_config() {
        let config = |extra: &'static [(&'static str, &'static str)]| {
            BotConfig::from_lookup(move |key| {
                if key == "OPENAI_API_KEY" {
                    return Some("sk-test".to_string());
                }
                extra
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| (*v).to_string())
            })
            .unwrap()
        };

        assert!(provider_from_config(&config(&[])).is_none());

        let searx = provider_from_config(&config(&[("SEARXNG_BASE_URL", "http://s:8080")]))
            .expect("searxng provider");
        assert_eq!(searx.provider_name(), "searxng");

        let tavily = provider_from_config(&config(&[("TAVILY_API_KEY", "tvly-x")]))
            .expect("tavily provider");
        assert_eq!(tavily.provider_name(), "tavily");
    }

    #[test]
    fn test_tavily_debug_redacts_key() {
        let provider = TavilyProvider::new("tvly-secret");
        assert!(!format!("{provider:?}").contains("tvly-secret"));
    }
}
