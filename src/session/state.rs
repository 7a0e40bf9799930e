//! Session state: the value record behind the lifecycle state machine.
//!
//! [`Session`] is an explicit value owned by the controller, never ambient
//! global state. Mutation happens only through the controller's four triggers.

use crate::document::FileIdentity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    /// The user asking a question.
    User,
    /// The agent's reply (or a rendered error description).
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single entry in the conversation, immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who produced this turn.
    pub role: ChatRole,
    /// Turn text.
    pub content: String,
}

impl ChatTurn {
    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Phase of the document-session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No file selected.
    Empty,
    /// File selected but not indexed.
    Staged,
    /// File indexed, agent bound, chat available.
    Ready,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Staged => write!(f, "staged"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// Opaque reference to a document's indexed, queryable representation.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeHandle {
    /// Vector collection holding the document's chunks.
    pub collection: String,
    /// Identity of the indexed source document.
    pub source: FileIdentity,
    /// Number of chunks indexed.
    pub chunk_count: usize,
    /// Embedding dimensionality of the collection.
    pub dimensions: u64,
}

/// The session record for one user.
///
/// Invariants, maintained by the controller:
/// - `knowledge` is present iff `document_loaded` is true.
/// - `messages` is non-empty only while `document_loaded` is true.
/// - `processed`, when present, equals `uploaded`; a mismatch means the
///   document is stale and `document_loaded` must be false.
#[derive(Debug, Default)]
pub struct Session {
    uploaded: Option<FileIdentity>,
    processed: Option<FileIdentity>,
    document_loaded: bool,
    knowledge: Option<KnowledgeHandle>,
    messages: Vec<ChatTurn>,
}

impl Session {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity of the currently staged file, if any.
    #[must_use]
    pub const fn uploaded(&self) -> Option<&FileIdentity> {
        self.uploaded.as_ref()
    }

    /// Identity of the file last successfully indexed, if any.
    #[must_use]
    pub const fn processed(&self) -> Option<&FileIdentity> {
        self.processed.as_ref()
    }

    /// Whether a document is currently indexed and queryable.
    #[must_use]
    pub const fn document_loaded(&self) -> bool {
        self.document_loaded
    }

    /// Knowledge base handle, present iff a document is loaded.
    #[must_use]
    pub const fn knowledge(&self) -> Option<&KnowledgeHandle> {
        self.knowledge.as_ref()
    }

    /// Conversation history, in append order.
    #[must_use]
    pub fn messages(&self) -> &[ChatTurn] {
        &self.messages
    }

    /// Current lifecycle phase, derived from the record.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        match (&self.uploaded, self.document_loaded) {
            (None, _) => SessionPhase::Empty,
            (Some(_), false) => SessionPhase::Staged,
            (Some(_), true) => SessionPhase::Ready,
        }
    }

    /// Stage a new file identity, invalidating any prior agent binding.
    ///
    /// Clears messages and the knowledge handle together so a stale handle can
    /// never outlive an identity change.
    pub(crate) fn stage(&mut self, identity: FileIdentity) {
        self.messages.clear();
        self.knowledge = None;
        self.document_loaded = false;
        self.uploaded = Some(identity);
    }

    /// Record a successful indexing of the staged file.
    pub(crate) fn complete_processing(&mut self, knowledge: KnowledgeHandle) {
        self.processed.clone_from(&self.uploaded);
        self.knowledge = Some(knowledge);
        self.document_loaded = true;
        self.messages.clear();
    }

    /// Reset to the empty state.
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    /// Append a turn to the conversation.
    pub(crate) fn push_turn(&mut self, turn: ChatTurn) {
        self.messages.push(turn);
    }

    /// Check the record invariants. Used by tests.
    #[cfg(test)]
    pub(crate) fn invariants_hold(&self) -> bool {
        let knowledge_bound = self.knowledge.is_some() == self.document_loaded;
        let messages_gated = self.messages.is_empty() || self.document_loaded;
        let identity_fresh = !self.document_loaded
            || (self.processed.is_some() && self.processed == self.uploaded);
        knowledge_bound && messages_gated && identity_fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(source: &FileIdentity) -> KnowledgeHandle {
        KnowledgeHandle {
            collection: "docbot_documents".to_string(),
            source: source.clone(),
            chunk_count: 4,
            dimensions: 1536,
        }
    }

    #[test]
    fn test_phase_derivation() {
        let mut session = Session::new();
        assert_eq!(session.phase(), SessionPhase::Empty);

        let id = FileIdentity::new("report.pdf", 100);
        session.stage(id.clone());
        assert_eq!(session.phase(), SessionPhase::Staged);

        session.complete_processing(handle(&id));
        assert_eq!(session.phase(), SessionPhase::Ready);
        assert!(session.invariants_hold());
    }

    #[test]
    fn test_stage_clears_stale_binding() {
        let mut session = Session::new();
        let id = FileIdentity::new("report.pdf", 100);
        session.stage(id.clone());
        session.complete_processing(handle(&id));
        session.push_turn(ChatTurn::user("hello"));

        session.stage(FileIdentity::new("other.pdf", 200));
        assert!(!session.document_loaded());
        assert!(session.knowledge().is_none());
        assert!(session.messages().is_empty());
        // The last-processed identity no longer matches the staged one.
        assert_ne!(session.processed(), session.uploaded());
        assert!(session.invariants_hold());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut session = Session::new();
        let id = FileIdentity::new("report.pdf", 100);
        session.stage(id.clone());
        session.complete_processing(handle(&id));
        session.push_turn(ChatTurn::user("q"));
        session.push_turn(ChatTurn::assistant("a"));

        session.clear();
        assert_eq!(session.phase(), SessionPhase::Empty);
        assert!(session.uploaded().is_none());
        assert!(session.processed().is_none());
        assert!(session.knowledge().is_none());
        assert!(session.messages().is_empty());
        assert!(session.invariants_hold());
    }

    #[test]
    fn test_turn_constructors() {
        let turn = ChatTurn::user("What is the refund policy?");
        assert_eq!(turn.role, ChatRole::User);
        assert_eq!(turn.role.to_string(), "user");
        assert_eq!(ChatTurn::assistant("x").role.to_string(), "assistant");
    }
}
