use super::{
    chat::{ChatSummary, Contact},
    message::Message,
};

/// Which fetch a poll failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollScope {
    Chats,
    Transcript,
}

/// Data delivered by the polling worker, tagged with the request epoch it
/// was fetched for.
#[derive(Debug, Clone, PartialEq)]
pub enum PollPayload {
    Chats(Vec<ChatSummary>),
    Contacts(Vec<Contact>),
    /// Normalized but not yet reconciled messages of the open chat.
    Transcript(Vec<Message>),
    Failed { scope: PollScope, reason: String },
}

/// Result of a send handed to the background worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent { message_id: Option<String> },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Tick,
    QuitRequested,
    InputKey(KeyInput),
    Polled { epoch: u64, payload: PollPayload },
    SendCompleted(SendOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    pub key: String,
    pub ctrl: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>, ctrl: bool) -> Self {
        Self {
            key: key.into(),
            ctrl,
        }
    }
}
