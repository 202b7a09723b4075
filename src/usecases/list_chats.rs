use std::cmp::Reverse;

use crate::domain::chat::{ChatSummary, Contact};

use super::contracts::SourceError;

const DEFAULT_CHAT_PAGE_SIZE: usize = 100;
const MAX_CHAT_PAGE_SIZE: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChatsQuery {
    pub instance: String,
    pub limit: usize,
}

impl ListChatsQuery {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            limit: DEFAULT_CHAT_PAGE_SIZE,
        }
    }

    fn normalized_limit(&self) -> usize {
        match self.limit {
            0 => DEFAULT_CHAT_PAGE_SIZE,
            value if value > MAX_CHAT_PAGE_SIZE => MAX_CHAT_PAGE_SIZE,
            value => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChatsOutput {
    pub chats: Vec<ChatSummary>,
}

pub trait ChatsSource {
    fn find_chats(&self, instance: &str) -> Result<Vec<ChatSummary>, SourceError>;
    fn find_contacts(&self, instance: &str) -> Result<Vec<Contact>, SourceError>;
}

impl<T> ChatsSource for &T
where
    T: ChatsSource + ?Sized,
{
    fn find_chats(&self, instance: &str) -> Result<Vec<ChatSummary>, SourceError> {
        (*self).find_chats(instance)
    }

    fn find_contacts(&self, instance: &str) -> Result<Vec<Contact>, SourceError> {
        (*self).find_contacts(instance)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListChatsError {
    #[error("the server rejected the API key")]
    Unauthorized,
    #[error("instance not found")]
    InstanceNotFound,
    #[error("server temporarily unavailable")]
    TemporarilyUnavailable,
    #[error("server sent chats in an unexpected shape")]
    DataContractViolation,
    #[error("{0}")]
    Rejected(String),
}

/// Lists the instance's chats, most recent activity first.
pub fn list_chats(
    source: &dyn ChatsSource,
    query: ListChatsQuery,
) -> Result<ListChatsOutput, ListChatsError> {
    let limit = query.normalized_limit();
    let mut chats = source
        .find_chats(&query.instance)
        .map_err(map_source_error)?;

    // Chats without activity sink to the bottom; equal times keep server order.
    chats.sort_by_key(|chat| Reverse(chat.last_message_unix.unwrap_or(i64::MIN)));
    chats.truncate(limit);

    Ok(ListChatsOutput { chats })
}

pub fn list_contacts(
    source: &dyn ChatsSource,
    instance: &str,
) -> Result<Vec<Contact>, ListChatsError> {
    source.find_contacts(instance).map_err(map_source_error)
}

fn map_source_error(error: SourceError) -> ListChatsError {
    match error {
        SourceError::Unauthorized => ListChatsError::Unauthorized,
        SourceError::NotFound => ListChatsError::InstanceNotFound,
        SourceError::Unavailable => ListChatsError::TemporarilyUnavailable,
        SourceError::InvalidData => ListChatsError::DataContractViolation,
        SourceError::Rejected(message) => ListChatsError::Rejected(message),
    }
}
