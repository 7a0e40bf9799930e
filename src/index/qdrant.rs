//! Qdrant-backed indexing and retrieval.
//!
//! Indexing recreates the target collection: a repeat call for the same
//! collection wipes and rebuilds it rather than appending. Retrieval is a
//! plain similarity search with payload.

use super::{Indexer, Retriever, ScoredChunk, chunk_pages};
use crate::config::BotConfig;
use crate::document::StagedDocument;
use crate::embedding::EmbeddingModel;
use crate::error::{AgentError, AgentResult, IndexResult, IndexingError};
use crate::session::KnowledgeHandle;
use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value, VectorParamsBuilder, value::Kind,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Batch size for embedding requests during indexing.
const EMBED_BATCH: usize = 64;

/// Indexer and retriever backed by a Qdrant collection.
pub struct QdrantIndexer {
    client: Qdrant,
    embedder: Arc<dyn EmbeddingModel>,
    collection: String,
    max_chunk_chars: usize,
}

impl std::fmt::Debug for QdrantIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantIndexer")
            .field("collection", &self.collection)
            .field("max_chunk_chars", &self.max_chunk_chars)
            .finish_non_exhaustive()
    }
}

impl QdrantIndexer {
    /// Connect to Qdrant using the application configuration.
    pub fn new(config: &BotConfig, embedder: Arc<dyn EmbeddingModel>) -> IndexResult<Self> {
        let client = Qdrant::from_url(&config.qdrant_url)
            .build()
            .map_err(|e| IndexingError::vector_store(e.to_string()))?;
        Ok(Self {
            client,
            embedder,
            collection: config.collection.clone(),
            max_chunk_chars: config.max_chunk_chars,
        })
    }

    /// Drop the collection if present, then create it fresh.
    async fn recreate_collection(&self) -> IndexResult<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| IndexingError::vector_store(e.to_string()))?;
        if exists {
            debug!(collection = %self.collection, "dropping existing collection");
            self.client
                .delete_collection(&self.collection)
                .await
                .map_err(|e| IndexingError::vector_store(e.to_string()))?;
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(self.embedder.dimensions(), Distance::Cosine),
                ),
            )
            .await
            .map_err(|e| IndexingError::vector_store(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Indexer for QdrantIndexer {
    async fn index(&self, document: &StagedDocument) -> IndexResult<KnowledgeHandle> {
        let identity = document.identity().clone();
        let pages = document.extract_pages()?;
        let chunks = chunk_pages(&pages, self.max_chunk_chars);
        if chunks.is_empty() {
            return Err(IndexingError::EmptyDocument);
        }

        info!(
            source = %identity.name,
            pages = pages.len(),
            chunks = chunks.len(),
            "indexing document"
        );

        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            vectors.extend(self.embedder.embed(&texts).await?);
        }

        self.recreate_collection().await?;

        let mut points = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.iter().zip(vectors) {
            let payload = Payload::try_from(json!({
                "text": chunk.text,
                "page": chunk.page,
                "source": identity.name,
            }))
            .map_err(|e| IndexingError::vector_store(format!("payload: {e}")))?;
            points.push(PointStruct::new(
                Uuid::new_v4().to_string(),
                vector,
                payload,
            ));
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| IndexingError::vector_store(e.to_string()))?;

        info!(collection = %self.collection, chunks = chunks.len(), "document indexed");
        Ok(KnowledgeHandle {
            collection: self.collection.clone(),
            source: identity,
            chunk_count: chunks.len(),
            dimensions: self.embedder.dimensions(),
        })
    }
}

#[async_trait]
impl Retriever for QdrantIndexer {
    async fn retrieve(
        &self,
        knowledge: &KnowledgeHandle,
        query_vector: Vec<f32>,
        top_k: u64,
    ) -> AgentResult<Vec<ScoredChunk>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&knowledge.collection, query_vector, top_k)
                    .with_payload(true),
            )
            .await
            .map_err(|e| AgentError::retrieval(e.to_string()))?;

        let chunks = response
            .result
            .into_iter()
            .filter_map(|point| chunk_from_payload(&point.payload, point.score))
            .collect();
        Ok(chunks)
    }
}

/// Rebuild a scored chunk from a stored payload. Points missing either the
/// text or a valid page number are dropped rather than cited with a bogus
/// page.
fn chunk_from_payload(payload: &HashMap<String, Value>, score: f32) -> Option<ScoredChunk> {
    let text = payload_str(payload, "text")?;
    let page = payload_u32(payload, "page")?;
    Some(ScoredChunk { text, page, score })
}

/// Extract a string field from a point payload.
fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

/// Extract an integer field from a point payload.
fn payload_u32(payload: &HashMap<String, Value>, key: &str) -> Option<u32> {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::IntegerValue(i)) => u32::try_from(*i).ok(),
        _ => None,
    }
}
