use async_trait::async_trait;

use crate::{domain::chat::ChatSession, infra::contracts::SnapshotStore};

use super::{
    contracts::SourceError,
    offline_cache::{fetch_or_cached, Cached, CHAT_LIST_KEY},
};

#[async_trait]
pub trait ListChatsSource: Send + Sync {
    async fn list_chats(&self) -> Result<Vec<ChatSession>, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChatsError {
    Unauthorized,
    TemporarilyUnavailable,
    DataContractViolation,
}

impl ListChatsError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Your session has expired. Log in again.",
            Self::TemporarilyUnavailable => "Chats could not be refreshed.",
            Self::DataContractViolation => "The server sent chats this client cannot read.",
        }
    }
}

pub type ListChatsOutput = Cached<Vec<ChatSession>, ListChatsError>;

/// Fetches the chat list, refreshing the cached snapshot that the chat screen
/// later uses to resolve headers. Falls back to that snapshot on failure.
pub async fn list_chats(source: &dyn ListChatsSource, cache: &dyn SnapshotStore) -> ListChatsOutput {
    fetch_or_cached(cache, CHAT_LIST_KEY, async {
        source.list_chats().await.map_err(map_source_error)
    })
    .await
}

fn map_source_error(error: SourceError) -> ListChatsError {
    match error {
        SourceError::Unauthorized => ListChatsError::Unauthorized,
        SourceError::Forbidden
        | SourceError::NotFound
        | SourceError::Unavailable
        | SourceError::Rejected(_) => ListChatsError::TemporarilyUnavailable,
        SourceError::InvalidData => ListChatsError::DataContractViolation,
    }
}
