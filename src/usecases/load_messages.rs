use async_trait::async_trait;

use crate::domain::message::Message;

use super::contracts::SourceError;

pub const DEFAULT_MESSAGES_PAGE_SIZE: usize = 20;
const MAX_MESSAGES_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadMessagesQuery {
    pub chat_id: i64,
    pub limit: usize,
    pub offset: usize,
}

impl LoadMessagesQuery {
    pub fn latest(chat_id: i64, limit: usize) -> Self {
        Self {
            chat_id,
            limit,
            offset: 0,
        }
    }

    pub fn normalized_limit(&self) -> usize {
        normalize_page_size(self.limit)
    }
}

pub fn normalize_page_size(limit: usize) -> usize {
    match limit {
        0 => DEFAULT_MESSAGES_PAGE_SIZE,
        value if value > MAX_MESSAGES_PAGE_SIZE => MAX_MESSAGES_PAGE_SIZE,
        value => value,
    }
}

/// Newest-first page of a chat's messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadMessagesOutput {
    pub messages: Vec<Message>,
}

#[async_trait]
pub trait MessagesSource: Send + Sync {
    /// Returns messages ordered newest first, skipping `offset` newer ones.
    async fn list_messages(
        &self,
        chat_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadMessagesError {
    Unauthorized,
    AccessDenied,
    TemporarilyUnavailable,
    DataContractViolation,
    ChatNotFound,
}

pub async fn load_messages(
    source: &dyn MessagesSource,
    query: LoadMessagesQuery,
) -> Result<LoadMessagesOutput, LoadMessagesError> {
    let limit = query.normalized_limit();
    let messages = source
        .list_messages(query.chat_id, limit, query.offset)
        .await
        .map_err(map_source_error)?;

    Ok(LoadMessagesOutput { messages })
}

fn map_source_error(error: SourceError) -> LoadMessagesError {
    match error {
        SourceError::Unauthorized => LoadMessagesError::Unauthorized,
        SourceError::Forbidden => LoadMessagesError::AccessDenied,
        SourceError::NotFound => LoadMessagesError::ChatNotFound,
        SourceError::Unavailable | SourceError::Rejected(_) => {
            LoadMessagesError::TemporarilyUnavailable
        }
        SourceError::InvalidData => LoadMessagesError::DataContractViolation,
    }
}
