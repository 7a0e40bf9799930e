//! Unified error types for docbot.
//!
//! All module-specific errors can be converted into the main [`DocbotError`]
//! type. Indexing and agent errors are recoverable from the session's point of
//! view; configuration errors are fatal at startup.

use std::fmt;

// ============================================================================
// Main Error Type
// ============================================================================

/// The main error type for docbot operations.
#[derive(Debug, thiserror::Error)]
pub enum DocbotError {
    /// Document indexing error.
    #[error("indexing: {0}")]
    Indexing(#[from] IndexingError),

    /// Conversational agent error.
    #[error("agent: {0}")]
    Agent(#[from] AgentError),

    /// Session lifecycle rejection.
    #[error("session: {0}")]
    Session(#[from] SessionError),

    /// Configuration error.
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error.
    #[error("{0}")]
    Internal(String),
}

impl DocbotError {
    /// Create a config error from a string.
    #[inline]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(ConfigError::Invalid(msg.into()))
    }

    /// Create an internal error.
    #[inline]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias for docbot operations.
pub type Result<T> = std::result::Result<T, DocbotError>;

// ============================================================================
// Indexing Errors
// ============================================================================

/// Error turning a staged document into a knowledge base.
///
/// Recoverable: the session stays `STAGED` and the user may retry.
#[derive(Debug, thiserror::Error)]
pub enum IndexingError {
    /// The PDF could not be parsed.
    #[error("pdf: {0}")]
    Pdf(String),

    /// The document yielded no extractable text.
    #[error("document contains no extractable text")]
    EmptyDocument,

    /// Embedding generation failed.
    #[error("embedding: {0}")]
    Embedding(#[from] EmbeddingError),

    /// The vector store rejected the request or is unreachable.
    #[error("vector store: {0}")]
    VectorStore(String),
}

impl IndexingError {
    /// Create a PDF parse error.
    #[inline]
    pub fn pdf(msg: impl Into<String>) -> Self {
        Self::Pdf(msg.into())
    }

    /// Create a vector store error.
    #[inline]
    pub fn vector_store(msg: impl Into<String>) -> Self {
        Self::VectorStore(msg.into())
    }
}

/// Result type for indexing operations.
pub type IndexResult<T> = std::result::Result<T, IndexingError>;

// ============================================================================
// Agent Errors
// ============================================================================

/// Error answering a query against a ready knowledge base.
///
/// Recoverable: surfaced as an assistant chat turn, the session stays `READY`
/// and the user may resubmit.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Chat completion API error.
    #[error("completion: {0}")]
    Completion(String),

    /// Retrieval from the vector store failed.
    #[error("retrieval: {0}")]
    Retrieval(String),

    /// Query embedding failed.
    #[error("embedding: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Web search fallback failed.
    #[error("search: {0}")]
    Search(#[from] SearchError),
}

impl AgentError {
    /// Create a completion error.
    #[inline]
    pub fn completion(msg: impl Into<String>) -> Self {
        Self::Completion(msg.into())
    }

    /// Create a retrieval error.
    #[inline]
    pub fn retrieval(msg: impl Into<String>) -> Self {
        Self::Retrieval(msg.into())
    }
}

/// Result type for agent operations.
pub type AgentResult<T> = std::result::Result<T, AgentError>;

// ============================================================================
// Session Errors
// ============================================================================

/// A rejected session trigger. The session state is never changed by these.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Process-document was triggered with no staged file.
    #[error("no document staged")]
    NoDocumentStaged,

    /// Process-document was triggered while the staged file is already indexed.
    #[error("document already processed")]
    AlreadyProcessed,

    /// Chat submit was triggered outside the ready state.
    #[error("no processed document to chat with")]
    NotReady,
}

// ============================================================================
// Embedding Errors
// ============================================================================

/// Error from the embedding API.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// The API rejected the credential.
    #[error("unauthorized: check that OPENAI_API_KEY is valid and has embedding permissions")]
    Unauthorized,

    /// The API returned an error status.
    #[error("api: {0}")]
    Api(String),

    /// The HTTP request failed.
    #[error("http: {0}")]
    Http(String),

    /// The response body could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl EmbeddingError {
    /// Create an API error.
    #[inline]
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }
}

// ============================================================================
// Search Errors
// ============================================================================

/// Error from a web search provider.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The provider returned an error status.
    #[error("provider: {0}")]
    Provider(String),

    /// The HTTP request failed.
    #[error("http: {0}")]
    Http(String),

    /// The response body could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Error type for configuration. Fatal at startup, before any session begins.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Missing required setting.
    #[error("missing: {0}")]
    Missing(String),

    /// Invalid value.
    #[error("invalid: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create a missing setting error.
    #[inline]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing(field.into())
    }

    /// Create an invalid value error.
    #[inline]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ============================================================================
// Display Helpers
// ============================================================================

/// A wrapper that displays errors in a user-friendly format.
#[derive(Debug)]
pub struct DisplayError<'a>(pub &'a DocbotError);

impl fmt::Display for DisplayError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            DocbotError::Indexing(e) => write!(f, "Indexing error: {e}"),
            DocbotError::Agent(e) => write!(f, "Agent error: {e}"),
            DocbotError::Session(e) => write!(f, "Session error: {e}"),
            DocbotError::Config(e) => write!(f, "Configuration error: {e}"),
            DocbotError::Io(e) => write!(f, "IO error: {e}"),
            DocbotError::Json(e) => write!(f, "JSON error: {e}"),
            DocbotError::Internal(e) => write!(f, "Internal error: {e}"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
