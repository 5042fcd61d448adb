//! Active chat session state.
//!
//! State changes go through [`reduce`]; [`SessionHolder`] owns the current
//! state and tells its parent about every change, mirroring how the chat
//! surface reports message lists back to the container that owns sessions.

use log::debug;
use std::sync::Arc;

use crate::models::chat::{ ChatMessage, ChatSession };

pub trait SessionObserver: Send + Sync {
    fn on_messages_updated(&self, session_id: &str, messages: &[ChatMessage]);
}

/// Observer for callers with no parent container.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_messages_updated(&self, _session_id: &str, _messages: &[ChatMessage]) {}
}

#[derive(Clone, Debug, Default)]
pub struct SessionState {
    pub session: ChatSession,
}

impl SessionState {
    pub fn new(session: ChatSession) -> Self {
        Self { session }
    }
}

#[derive(Clone, Debug)]
pub enum SessionAction {
    /// Switch to a session id and drop all messages.
    Reset {
        session_id: String,
    },
    Append(ChatMessage),
    /// Replace the list with messages handed down by the parent.
    Load(Vec<ChatMessage>),
}

pub fn reduce(state: SessionState, action: SessionAction) -> SessionState {
    let mut session = state.session;
    match action {
        SessionAction::Reset { session_id } => {
            session = ChatSession::new(session_id);
        }
        SessionAction::Append(message) => session.messages.push(message),
        SessionAction::Load(messages) => session.messages = messages,
    }
    SessionState { session }
}

pub struct SessionHolder {
    state: SessionState,
    observer: Arc<dyn SessionObserver>,
}

impl SessionHolder {
    pub fn new(session: ChatSession, observer: Arc<dyn SessionObserver>) -> Self {
        Self { state: SessionState::new(session), observer }
    }

    pub fn dispatch(&mut self, action: SessionAction) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
        debug!(
            "Session {} now holds {} messages",
            self.state.session.id,
            self.state.session.messages.len()
        );
        self.observer.on_messages_updated(&self.state.session.id, &self.state.session.messages);
    }

    pub fn session_id(&self) -> &str {
        &self.state.session.id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.state.session.messages
    }
}
