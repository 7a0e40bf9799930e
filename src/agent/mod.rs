//! The conversational agent: grounded answers with web-search fallback.
//!
//! [`Answerer`] is the seam the session controller depends on. The production
//! implementation is [`RagAgent`]: embed the question, retrieve the nearest
//! chunks from the knowledge base, and complete against that context; when
//! retrieval yields insufficient grounding, fall back to a web search provider
//! and ground the answer in those results instead.

pub mod completion;
pub mod search;

pub use completion::{ChatMessage, CompletionModel, OpenAiChat};
pub use search::{BoxedSearchProvider, SearchHit, SearchProvider};

use crate::config::BotConfig;
use crate::embedding::EmbeddingModel;
use crate::error::{AgentError, AgentResult, EmbeddingError};
use crate::index::{Retriever, ScoredChunk};
use crate::session::{ChatRole, ChatTurn, KnowledgeHandle};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of web results used for fallback grounding.
const DEFAULT_MAX_SEARCH_RESULTS: usize = 5;

/// Answers a query against a bound knowledge base.
#[async_trait]
pub trait Answerer: Send + Sync {
    /// Answer `prompt` grounded in `knowledge`, given the prior conversation.
    async fn answer(
        &self,
        knowledge: &KnowledgeHandle,
        prompt: &str,
        history: &[ChatTurn],
    ) -> AgentResult<String>;
}

/// Standing instructions for the agent, sent as the system message.
const INSTRUCTIONS: &str = "\
You are a helpful assistant answering questions about a PDF document.

1. Ground every answer in the provided context. Analyze all excerpts before \
responding and synthesize them coherently when several are relevant.
2. When quoting or relying on document content, cite the page number in the \
form [p.N]. Distinguish main content from appendices where it matters.
3. When the context comes from web results instead, cite the source URLs.
4. Avoid hedging phrases like 'based on my knowledge'. If the context \
contains no relevant information, state that clearly and suggest an \
alternative question.
5. Use markdown for structure; keep lists from the document as bullet points.";

/// RAG agent: retrieval-grounded completion with web-search fallback.
pub struct RagAgent {
    embedder: Arc<dyn EmbeddingModel>,
    retriever: Arc<dyn Retriever>,
    completion: Arc<dyn CompletionModel>,
    search: Option<BoxedSearchProvider>,
    top_k: u64,
    score_threshold: f32,
    max_search_results: usize,
}

impl std::fmt::Debug for RagAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagAgent")
            .field("top_k", &self.top_k)
            .field("score_threshold", &self.score_threshold)
            .field(
                "search",
                &self.search.as_ref().map(|s| s.provider_name().to_string()),
            )
            .finish_non_exhaustive()
    }
}

impl RagAgent {
    /// Create an agent from its collaborators.
    pub fn new(
        config: &BotConfig,
        embedder: Arc<dyn EmbeddingModel>,
        retriever: Arc<dyn Retriever>,
        completion: Arc<dyn CompletionModel>,
        search: Option<BoxedSearchProvider>,
    ) -> Self {
        Self {
            embedder,
            retriever,
            completion,
            search,
            top_k: config.top_k,
            score_threshold: config.score_threshold,
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
        }
    }

    /// Render document excerpts as a context block.
    fn document_context(chunks: &[ScoredChunk]) -> String {
        let mut out = String::from("Document excerpts:\n");
        for chunk in chunks {
            let _ = writeln!(out, "[p.{}] {}", chunk.page, chunk.text.trim());
        }
        out
    }

    /// Render web results as a context block.
    fn web_context(hits: &[SearchHit]) -> String {
        let mut out = String::from(
            "The document did not contain relevant information. Web results:\n",
        );
        for hit in hits {
            let _ = writeln!(out, "{hit}\n");
        }
        out
    }

    /// Assemble the completion request from context, history and prompt.
    fn build_messages(context: &str, history: &[ChatTurn], prompt: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(format!("{INSTRUCTIONS}\n\n{context}")));
        for turn in history {
            messages.push(match turn.role {
                ChatRole::User => ChatMessage::user(&turn.content),
                ChatRole::Assistant => ChatMessage::assistant(&turn.content),
            });
        }
        messages.push(ChatMessage::user(prompt));
        messages
    }
}

#[async_trait]
impl Answerer for RagAgent {
    async fn answer(
        &self,
        knowledge: &KnowledgeHandle,
        prompt: &str,
        history: &[ChatTurn],
    ) -> AgentResult<String> {
        let query = [prompt.to_string()];
        let query_vector = self
            .embedder
            .embed(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AgentError::Embedding(EmbeddingError::InvalidResponse(
                    "no query embedding returned".to_string(),
                ))
            })?;

        let retrieved = self
            .retriever
            .retrieve(knowledge, query_vector, self.top_k)
            .await?;
        let grounded: Vec<&ScoredChunk> = retrieved
            .iter()
            .filter(|c| c.score >= self.score_threshold)
            .collect();

        debug!(
            retrieved = retrieved.len(),
            grounded = grounded.len(),
            "retrieval finished"
        );

        let context = if grounded.is_empty() {
            if let Some(provider) = &self.search {
                info!(provider = provider.provider_name(), "falling back to web search");
                let hits = provider.search(prompt, self.max_search_results).await?;
                if hits.is_empty() {
                    Self::document_context(&retrieved)
                } else {
                    Self::web_context(&hits)
                }
            } else {
                Self::document_context(&retrieved)
            }
        } else {
            let owned: Vec<ScoredChunk> = grounded.into_iter().cloned().collect();
            Self::document_context(&owned)
        };

        let messages = Self::build_messages(&context, history, prompt);
        self.completion.complete(&messages).await
    }
}
