//! Document indexing: turning a staged PDF into a queryable knowledge base.
//!
//! The [`Indexer`] seam is what the session controller depends on; the
//! production implementation is [`QdrantIndexer`], which chunks the document,
//! embeds the chunks, and recreates a Qdrant collection.

mod chunker;
mod qdrant;

pub use chunker::{Chunk, chunk_pages};
pub use qdrant::QdrantIndexer;

use crate::document::StagedDocument;
use crate::error::{AgentResult, IndexResult};
use crate::session::KnowledgeHandle;
use async_trait::async_trait;

/// Turns a staged document into a queryable knowledge base.
///
/// "Recreate" semantics: a repeat call wipes the target collection and
/// rebuilds it rather than appending.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Index the document and return a handle usable for grounded queries.
    async fn index(&self, document: &StagedDocument) -> IndexResult<KnowledgeHandle>;
}

/// A chunk retrieved from the knowledge base, with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// Chunk text.
    pub text: String,
    /// 1-based page number the chunk came from.
    pub page: u32,
    /// Similarity score from the vector search.
    pub score: f32,
}

/// Similarity search against an indexed knowledge base.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `top_k` chunks nearest to the query vector.
    async fn retrieve(
        &self,
        knowledge: &KnowledgeHandle,
        query_vector: Vec<f32>,
        top_k: u64,
    ) -> AgentResult<Vec<ScoredChunk>>;
}
