//! The session lifecycle controller.
//!
//! Owns the [`Session`] record and enforces the transition rules over the four
//! user triggers: file selected, file removed, process-document, chat submit.
//! Delegates indexing to an [`Indexer`] and answering to an [`Answerer`], and
//! owns neither of their internals.
//!
//! The one invariant this controller exists to protect: an identity change
//! invalidates the agent binding and the knowledge handle together. A dangling
//! agent bound to a stale knowledge base can never be observed.

use super::state::{ChatTurn, KnowledgeHandle, Session, SessionPhase};
use crate::agent::Answerer;
use crate::document::{FileIdentity, StagedDocument};
use crate::error::{DocbotError, Result, SessionError};
use crate::index::Indexer;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A state-change notification emitted after each transition.
///
/// This replaces any implicit rerun-on-mutation refresh loop: the presentation
/// layer subscribes and redraws on its own schedule.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A file was staged (newly selected or replaced).
    Staged(FileIdentity),
    /// The staged file was indexed and the agent bound.
    Processed(FileIdentity),
    /// The session was reset to empty.
    Cleared,
    /// A chat turn was appended.
    TurnAppended(ChatTurn),
}

/// Observer callback for session events.
pub type EventSink = Box<dyn Fn(&SessionEvent) + Send + Sync>;

/// The agent bound to one knowledge base handle.
///
/// Constructed from exactly the knowledge handle the session currently holds;
/// dropped whenever that handle is invalidated.
struct BoundAgent {
    answerer: Arc<dyn Answerer>,
    knowledge: KnowledgeHandle,
}

impl BoundAgent {
    async fn ask(&self, prompt: &str, history: &[ChatTurn]) -> crate::error::AgentResult<String> {
        self.answerer.answer(&self.knowledge, prompt, history).await
    }
}

/// Controller for one user's document session.
///
/// One logical thread of control: every trigger takes `&mut self` and is
/// handled to completion before the next is accepted.
pub struct SessionController {
    session: Session,
    staged: Option<StagedDocument>,
    agent: Option<BoundAgent>,
    indexer: Arc<dyn Indexer>,
    answerer: Arc<dyn Answerer>,
    sinks: Vec<EventSink>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("phase", &self.session.phase())
            .field("messages", &self.session.messages().len())
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Create a controller with an empty session.
    pub fn new(indexer: Arc<dyn Indexer>, answerer: Arc<dyn Answerer>) -> Self {
        Self {
            session: Session::new(),
            staged: None,
            agent: None,
            indexer,
            answerer,
            sinks: Vec::new(),
        }
    }

    /// Register a state-change observer.
    pub fn on_event(&mut self, sink: EventSink) {
        self.sinks.push(sink);
    }

    /// The session record.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    /// Conversation history, in append order.
    #[must_use]
    pub fn messages(&self) -> &[ChatTurn] {
        self.session.messages()
    }

    /// The staged working copy, if any.
    #[must_use]
    pub const fn staged(&self) -> Option<&StagedDocument> {
        self.staged.as_ref()
    }

    /// Whether an agent is currently bound. True iff the phase is ready.
    #[must_use]
    pub const fn agent_bound(&self) -> bool {
        self.agent.is_some()
    }

    fn emit(&self, event: &SessionEvent) {
        for sink in &self.sinks {
            sink(event);
        }
    }

    /// Trigger: file selected.
    ///
    /// Selecting the identity that was last successfully indexed while a
    /// document is loaded is a no-op: re-processing would be redundant and
    /// would invalidate the conversation in progress. Any other selection
    /// stages the file, invalidating agent, knowledge and messages together.
    pub fn select_file(&mut self, document: StagedDocument) {
        let identity = document.identity().clone();

        if self.session.document_loaded() && self.session.processed() == Some(&identity) {
            debug!(file = %identity, "same document re-selected, keeping session");
            return;
        }

        info!(file = %identity, "staging document");
        self.agent = None;
        self.session.stage(identity.clone());
        // Overwrites the previous working copy, if any.
        self.staged = Some(document);
        self.emit(&SessionEvent::Staged(identity));
    }

    /// Trigger: file removed. Resets to the empty state from any state.
    pub fn remove_file(&mut self) {
        if self.phase() == SessionPhase::Empty {
            return;
        }
        info!("document removed, clearing session");
        self.agent = None;
        self.staged = None;
        self.session.clear();
        self.emit(&SessionEvent::Cleared);
    }

    /// Trigger: process-document action.
    ///
    /// On indexing failure the session is left in the staged state unchanged,
    /// so the same file may be retried.
    pub async fn process_document(&mut self) -> Result<()> {
        if self.session.document_loaded() {
            return Err(SessionError::AlreadyProcessed.into());
        }
        let document = self
            .staged
            .as_ref()
            .ok_or(SessionError::NoDocumentStaged)?;

        let identity = document.identity().clone();
        let knowledge = match self.indexer.index(document).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(file = %identity, error = %e, "indexing failed, still staged");
                return Err(DocbotError::Indexing(e));
            }
        };

        // Bind the agent to exactly the handle the session is about to hold.
        self.agent = Some(BoundAgent {
            answerer: Arc::clone(&self.answerer),
            knowledge: knowledge.clone(),
        });
        self.session.complete_processing(knowledge);
        info!(file = %identity, "document processed");
        self.emit(&SessionEvent::Processed(identity));
        Ok(())
    }

    /// Trigger: chat message submitted.
    ///
    /// Rejected outside the ready state with no state change. Within it, the
    /// user turn is appended first and never rolled back: an agent failure is
    /// rendered into the assistant turn instead of discarding the question.
    /// Returns the appended assistant turn.
    pub async fn submit_message(
        &mut self,
        prompt: impl Into<String>,
    ) -> std::result::Result<ChatTurn, SessionError> {
        let prompt = prompt.into();
        let Some(agent) = &self.agent else {
            return Err(SessionError::NotReady);
        };

        let history = self.session.messages().to_vec();
        let user_turn = ChatTurn::user(prompt.clone());
        self.session.push_turn(user_turn.clone());
        self.emit(&SessionEvent::TurnAppended(user_turn));

        let assistant_turn = match agent.ask(&prompt, &history).await {
            Ok(text) => ChatTurn::assistant(text),
            Err(e) => {
                warn!(error = %e, "agent invocation failed");
                ChatTurn::assistant(format!("Error generating response: {e}"))
            }
        };
        self.session.push_turn(assistant_turn.clone());
        self.emit(&SessionEvent::TurnAppended(assistant_turn.clone()));
        Ok(assistant_turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AgentError, AgentResult, IndexResult, IndexingError};
    use crate::session::ChatRole;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockIndexer {
        fail: AtomicBool,
        calls: AtomicUsize,
    }

    impl MockIndexer {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                fail: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: AtomicBool::new(true),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Indexer for MockIndexer {
        async fn index(&self, document: &StagedDocument) -> IndexResult<KnowledgeHandle> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(IndexingError::vector_store("connection refused"));
            }
            Ok(KnowledgeHandle {
                collection: "docbot_documents".to_string(),
                source: document.identity().clone(),
                chunk_count: 3,
                dimensions: 1536,
            })
        }
    }

    struct MockAnswerer {
        fail: bool,
        asked: Mutex<Vec<String>>,
    }

    impl MockAnswerer {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                fail: false,
                asked: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                asked: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Answerer for MockAnswerer {
        async fn answer(
            &self,
            knowledge: &KnowledgeHandle,
            prompt: &str,
            _history: &[ChatTurn],
        ) -> AgentResult<String> {
            self.asked.lock().unwrap().push(prompt.to_string());
            if self.fail {
                return Err(AgentError::completion("inference service failure"));
            }
            Ok(format!(
                "Answer about {} grounded in {}",
                prompt, knowledge.source.name
            ))
        }
    }

    fn doc(name: &str, size: usize) -> StagedDocument {
        StagedDocument::new(name, vec![0u8; size])
    }

    fn controller() -> SessionController {
        SessionController::new(MockIndexer::ok(), MockAnswerer::ok())
    }

    async fn ready_controller() -> SessionController {
        let mut ctrl = controller();
        ctrl.select_file(doc("report.pdf", 100));
        ctrl.process_document().await.unwrap();
        ctrl
    }

    // After a file-select transition the document is not loaded and the
    // conversation is empty, regardless of prior state.
    #[tokio::test]
    async fn test_select_resets_from_any_state() {
        let mut ctrl = controller();
        ctrl.select_file(doc("report.pdf", 100));
        assert_eq!(ctrl.phase(), SessionPhase::Staged);
        assert!(!ctrl.session().document_loaded());
        assert!(ctrl.messages().is_empty());

        // From READY with history, a new file invalidates everything at once.
        let mut ctrl = ready_controller().await;
        ctrl.submit_message("q").await.unwrap();
        ctrl.select_file(doc("other.pdf", 200));
        assert_eq!(ctrl.phase(), SessionPhase::Staged);
        assert!(!ctrl.session().document_loaded());
        assert!(!ctrl.agent_bound());
        assert!(ctrl.session().knowledge().is_none());
        assert!(ctrl.messages().is_empty());
        assert!(ctrl.session().invariants_hold());
    }

    // After process-document the session is ready, the processed identity
    // matches the uploaded one and the conversation is empty.
    #[tokio::test]
    async fn test_process_binds_agent() {
        let ctrl = ready_controller().await;
        assert_eq!(ctrl.phase(), SessionPhase::Ready);
        assert!(ctrl.session().document_loaded());
        assert_eq!(ctrl.session().processed(), ctrl.session().uploaded());
        assert!(ctrl.messages().is_empty());
        assert!(ctrl.agent_bound());
        assert!(ctrl.session().invariants_hold());
    }

    // Selecting the same identity while ready is a no-op.
    #[tokio::test]
    async fn test_reselect_same_identity_is_noop() {
        let mut ctrl = ready_controller().await;
        ctrl.submit_message("What is the refund policy?").await.unwrap();
        let before = ctrl.messages().to_vec();

        ctrl.select_file(doc("report.pdf", 100));
        assert_eq!(ctrl.phase(), SessionPhase::Ready);
        assert!(ctrl.agent_bound());
        assert_eq!(ctrl.messages(), before.as_slice());
    }

    // Identity is name plus size: same name with different content length is a
    // different document and must restage.
    #[tokio::test]
    async fn test_same_name_different_size_restages() {
        let mut ctrl = ready_controller().await;
        ctrl.select_file(doc("report.pdf", 101));
        assert_eq!(ctrl.phase(), SessionPhase::Staged);
        assert!(!ctrl.agent_bound());
    }

    // Removal yields the empty state from any state.
    #[tokio::test]
    async fn test_remove_clears_everything() {
        let mut ctrl = ready_controller().await;
        ctrl.submit_message("q").await.unwrap();
        ctrl.remove_file();

        assert_eq!(ctrl.phase(), SessionPhase::Empty);
        assert!(ctrl.session().uploaded().is_none());
        assert!(ctrl.session().processed().is_none());
        assert!(ctrl.session().knowledge().is_none());
        assert!(ctrl.staged().is_none());
        assert!(!ctrl.agent_bound());
        assert!(ctrl.messages().is_empty());

        // Removing from STAGED and from EMPTY as well.
        let mut ctrl = controller();
        ctrl.select_file(doc("report.pdf", 100));
        ctrl.remove_file();
        assert_eq!(ctrl.phase(), SessionPhase::Empty);
        ctrl.remove_file();
        assert_eq!(ctrl.phase(), SessionPhase::Empty);
    }

    // Chat submit is rejected outside READY with no state change.
    #[tokio::test]
    async fn test_submit_rejected_outside_ready() {
        let mut ctrl = controller();
        let err = ctrl.submit_message("hello").await.unwrap_err();
        assert!(matches!(err, SessionError::NotReady));
        assert!(ctrl.messages().is_empty());

        ctrl.select_file(doc("report.pdf", 100));
        let err = ctrl.submit_message("hello").await.unwrap_err();
        assert!(matches!(err, SessionError::NotReady));
        assert!(ctrl.messages().is_empty());
        assert_eq!(ctrl.phase(), SessionPhase::Staged);
    }

    // Each successful submit appends exactly [user, assistant] and prior
    // entries are unmodified.
    #[tokio::test]
    async fn test_submit_appends_user_then_assistant() {
        let mut ctrl = ready_controller().await;
        ctrl.submit_message("first").await.unwrap();
        let after_first = ctrl.messages().to_vec();
        assert_eq!(after_first.len(), 2);
        assert_eq!(after_first[0].role, ChatRole::User);
        assert_eq!(after_first[1].role, ChatRole::Assistant);

        ctrl.submit_message("second").await.unwrap();
        assert_eq!(ctrl.messages().len(), 4);
        assert_eq!(&ctrl.messages()[..2], after_first.as_slice());
        assert_eq!(ctrl.messages()[2].content, "second");
    }

    // Indexing failure leaves the session staged; the same file may be
    // retried.
    #[tokio::test]
    async fn test_indexing_failure_allows_retry() {
        let indexer = MockIndexer::failing();
        let mut ctrl = SessionController::new(indexer.clone(), MockAnswerer::ok());
        ctrl.select_file(doc("report.pdf", 100));

        let err = ctrl.process_document().await.unwrap_err();
        assert!(matches!(err, DocbotError::Indexing(_)));
        assert_eq!(ctrl.phase(), SessionPhase::Staged);
        assert!(!ctrl.session().document_loaded());
        assert!(!ctrl.agent_bound());

        // The service recovers; processing the same staged file now succeeds.
        indexer.fail.store(false, Ordering::SeqCst);
        ctrl.process_document().await.unwrap();
        assert_eq!(ctrl.phase(), SessionPhase::Ready);
        assert_eq!(indexer.calls.load(Ordering::SeqCst), 2);
    }

    // Agent failure appends exactly one assistant turn with an error
    // description; the session stays ready.
    #[tokio::test]
    async fn test_agent_failure_becomes_assistant_turn() {
        let mut ctrl = SessionController::new(MockIndexer::ok(), MockAnswerer::failing());
        ctrl.select_file(doc("report.pdf", 100));
        ctrl.process_document().await.unwrap();

        let turn = ctrl.submit_message("doomed question").await.unwrap();
        assert_eq!(turn.role, ChatRole::Assistant);
        assert!(turn.content.contains("Error generating response"));

        assert_eq!(ctrl.messages().len(), 2);
        assert_eq!(ctrl.messages()[0].content, "doomed question");
        assert_eq!(ctrl.phase(), SessionPhase::Ready);

        // The user may resubmit.
        ctrl.submit_message("again").await.unwrap();
        assert_eq!(ctrl.messages().len(), 4);
    }

    // Process-document preconditions.
    #[tokio::test]
    async fn test_process_rejections() {
        let mut ctrl = controller();
        let err = ctrl.process_document().await.unwrap_err();
        assert!(matches!(
            err,
            DocbotError::Session(SessionError::NoDocumentStaged)
        ));

        ctrl.select_file(doc("report.pdf", 100));
        ctrl.process_document().await.unwrap();
        let err = ctrl.process_document().await.unwrap_err();
        assert!(matches!(
            err,
            DocbotError::Session(SessionError::AlreadyProcessed)
        ));
    }

    // The answerer receives the history that existed before the new prompt.
    #[tokio::test]
    async fn test_answerer_sees_prompt() {
        let answerer = MockAnswerer::ok();
        let mut ctrl = SessionController::new(MockIndexer::ok(), answerer.clone());
        ctrl.select_file(doc("report.pdf", 100));
        ctrl.process_document().await.unwrap();
        ctrl.submit_message("What is the refund policy?").await.unwrap();

        let asked = answerer.asked.lock().unwrap();
        assert_eq!(asked.as_slice(), ["What is the refund policy?"]);
    }

    // Observer notifications fire for every transition.
    #[tokio::test]
    async fn test_events_emitted_in_order() {
        let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut ctrl = controller();
        let sink_events = events.clone();
        ctrl.on_event(Box::new(move |event| {
            let name = match event {
                SessionEvent::Staged(_) => "staged",
                SessionEvent::Processed(_) => "processed",
                SessionEvent::Cleared => "cleared",
                SessionEvent::TurnAppended(_) => "turn",
            };
            sink_events.lock().unwrap().push(name.to_string());
        }));

        ctrl.select_file(doc("report.pdf", 100));
        ctrl.process_document().await.unwrap();
        ctrl.submit_message("q").await.unwrap();
        ctrl.remove_file();

        assert_eq!(
            events.lock().unwrap().as_slice(),
            ["staged", "processed", "turn", "turn", "cleared"]
        );
    }

    // The example scenario from end to end.
    #[tokio::test]
    async fn test_example_scenario() {
        let mut ctrl = controller();
        assert_eq!(ctrl.phase(), SessionPhase::Empty);

        ctrl.select_file(doc("report.pdf", 100));
        assert_eq!(ctrl.phase(), SessionPhase::Staged);
        assert!(ctrl.messages().is_empty());

        ctrl.process_document().await.unwrap();
        assert_eq!(ctrl.phase(), SessionPhase::Ready);
        assert!(ctrl.messages().is_empty());

        ctrl.submit_message("What is the refund policy?").await.unwrap();
        assert_eq!(ctrl.messages().len(), 2);
        assert_eq!(ctrl.messages()[0].role, ChatRole::User);
        assert!(ctrl.messages()[1].content.contains("report.pdf"));

        // Same file again: no change.
        ctrl.select_file(doc("report.pdf", 100));
        assert_eq!(ctrl.messages().len(), 2);
        assert_eq!(ctrl.phase(), SessionPhase::Ready);

        // A different file: back to staged with an empty conversation.
        ctrl.select_file(doc("other.pdf", 100));
        assert_eq!(ctrl.phase(), SessionPhase::Staged);
        assert!(ctrl.messages().is_empty());
    }
}
