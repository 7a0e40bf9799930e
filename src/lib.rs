//! Docbot - chat with a PDF document.
//!
//! Stage a PDF, index it into a vector store, and chat with an agent whose
//! answers are grounded in the document, falling back to web search when the
//! document lacks an answer.
//!
//! # Architecture
//!
//! - **Session** ([`session`]) - the document-session lifecycle state machine
//! - **Document** ([`document`]) - staged working copy and PDF text extraction
//! - **Index** ([`index`]) - chunking, embedding and the Qdrant collection
//! - **Agent** ([`agent`]) - retrieval-grounded completion with search fallback
//! - **Repl** ([`repl`]) - terminal presentation layer over the controller
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use docbot::prelude::*;
//!
//! let mut controller = SessionController::new(indexer, answerer);
//! controller.select_file(StagedDocument::from_path("report.pdf")?);
//! controller.process_document().await?;
//! let turn = controller.submit_message("What is the refund policy?").await?;
//! ```

// Core modules
pub mod agent;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod repl;
pub mod session;

/// Prelude module for convenient imports.
pub mod prelude {
    // Error types (centralized)
    pub use crate::error::{
        AgentError, AgentResult, ConfigError, ConfigResult, DisplayError, DocbotError,
        EmbeddingError, IndexResult, IndexingError, Result, SearchError, SessionError,
    };

    // Session
    pub use crate::session::{
        ChatRole, ChatTurn, EventSink, KnowledgeHandle, Session, SessionController, SessionEvent,
        SessionPhase,
    };

    // Document
    pub use crate::document::{FileIdentity, PageText, StagedDocument};

    // Index
    pub use crate::index::{Chunk, Indexer, QdrantIndexer, Retriever, ScoredChunk, chunk_pages};

    // Embedding
    pub use crate::embedding::{EmbeddingModel, OpenAiEmbedder};

    // Agent
    pub use crate::agent::{
        Answerer, BoxedSearchProvider, ChatMessage, CompletionModel, OpenAiChat, RagAgent,
        SearchHit, SearchProvider,
    };
    pub use crate::agent::search::{SearxngProvider, TavilyProvider, provider_from_config};

    // Config
    pub use crate::config::{BotConfig, SearchBackend};

    // Repl
    pub use crate::repl::Repl;
}
