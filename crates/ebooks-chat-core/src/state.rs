//! UI-agnostic conversation state
//!
//! `ChatState` holds the ordered chat turns and the pending flag. Every
//! transition takes `&self` and returns a fresh state, so a UI can keep the
//! previous value around for comparison and tests need no terminal.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::orchestrator::StreamEvent;

/// First message of every session.
pub const DEFAULT_GREETING: &str =
    "Hi! I'm the AI assistant for e-Books. How can I help you today?";

/// Appended as a new assistant turn when a request or stream fails.
pub const FAILURE_MESSAGE: &str =
    "I'm sorry, but I encountered an error. Please try again later.";

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Whether a reply is currently streaming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Streaming,
}

/// Conversation plus the pending flag.
///
/// Messages are shared: a transition copies the `Arc`s and only allocates
/// the turn it changes, so untouched turns stay pointer-identical.
#[derive(Debug, Clone)]
pub struct ChatState {
    messages: Vec<Arc<ChatMessage>>,
    pending: bool,
}

/// Result of an accepted `submit`
#[derive(Debug, Clone)]
pub struct Submission {
    pub state: ChatState,
    /// Outbound request body: everything up to and including the new user
    /// turn, without the empty placeholder.
    pub history: Vec<ChatMessage>,
}

impl ChatState {
    pub fn new(greeting: &str) -> Self {
        Self {
            messages: vec![Arc::new(ChatMessage::assistant(greeting))],
            pending: false,
        }
    }

    pub fn from_messages(messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        Self {
            messages: messages.into_iter().map(Arc::new).collect(),
            pending: false,
        }
    }

    pub fn messages(&self) -> &[Arc<ChatMessage>] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn phase(&self) -> Phase {
        if self.pending {
            Phase::Streaming
        } else {
            Phase::Idle
        }
    }

    /// Owned copy of every turn, in order.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(|m| ChatMessage::clone(m)).collect()
    }

    /// Start a turn. Returns `None` for blank input or while a reply is
    /// still pending; the caller leaves everything as it was.
    pub fn submit(&self, text: &str) -> Option<Submission> {
        let text = text.trim();
        if text.is_empty() || self.pending {
            return None;
        }

        let mut messages = self.messages.clone();
        messages.push(Arc::new(ChatMessage::user(text)));
        let history = messages.iter().map(|m| ChatMessage::clone(m)).collect();
        messages.push(Arc::new(ChatMessage::assistant("")));

        Some(Submission {
            state: Self {
                messages,
                pending: true,
            },
            history,
        })
    }

    /// Concatenate `chunk` onto the last turn's content.
    pub fn append_to_last(&self, chunk: &str) -> Self {
        let mut messages = self.messages.clone();
        if let Some(last) = messages.last_mut() {
            let mut content = String::with_capacity(last.content.len() + chunk.len());
            content.push_str(&last.content);
            content.push_str(chunk);
            *last = Arc::new(ChatMessage {
                role: last.role,
                content,
            });
        }
        Self {
            messages,
            pending: self.pending,
        }
    }

    /// Record a failed reply. Whatever already streamed into the placeholder
    /// stays; the apology follows as its own turn.
    pub fn fail_last(&self) -> Self {
        let mut messages = self.messages.clone();
        messages.push(Arc::new(ChatMessage::assistant(FAILURE_MESSAGE)));
        Self {
            messages,
            pending: false,
        }
    }

    /// The stream ended cleanly.
    pub fn complete(&self) -> Self {
        Self {
            messages: self.messages.clone(),
            pending: false,
        }
    }

    /// Fold one orchestrator event into the state. Events that arrive while
    /// idle are ignored.
    pub fn apply(&self, event: &StreamEvent) -> Self {
        if !self.pending {
            return self.clone();
        }
        match event {
            StreamEvent::Chunk(text) => self.append_to_last(text),
            StreamEvent::Finished => self.complete(),
            StreamEvent::Failed => self.fail_last(),
        }
    }
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new(DEFAULT_GREETING)
    }
}
