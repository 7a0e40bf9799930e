//! Document-session lifecycle: state record and controller.

mod controller;
mod state;

pub use controller::{EventSink, SessionController, SessionEvent};
pub use state::{ChatRole, ChatTurn, KnowledgeHandle, Session, SessionPhase};
