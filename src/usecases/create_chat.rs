use async_trait::async_trait;

use crate::domain::chat::ChatSession;

use super::contracts::SourceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateChatCommand {
    /// Opens (or reuses) a one-to-one chat with another user.
    Private { user_id: i64 },
    /// Creates a chat for a whole study group. Teachers only.
    Group { group_id: String, name: String },
}

#[async_trait]
pub trait ChatCreator: Send + Sync {
    async fn create_private(&self, user_id: i64) -> Result<ChatSession, SourceError>;
    async fn create_group(&self, group_id: &str, name: &str) -> Result<ChatSession, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateChatError {
    InvalidInput(&'static str),
    Forbidden,
    Unauthorized,
    Rejected(String),
    TemporarilyUnavailable,
}

impl CreateChatError {
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(details) => (*details).to_owned(),
            Self::Forbidden => "Only teachers can create group chats.".to_owned(),
            Self::Unauthorized => "Your session has expired. Log in again.".to_owned(),
            Self::Rejected(details) => details.clone(),
            Self::TemporarilyUnavailable => "Could not create the chat. Try again later.".to_owned(),
        }
    }
}

pub async fn create_chat(
    creator: &dyn ChatCreator,
    command: CreateChatCommand,
) -> Result<ChatSession, CreateChatError> {
    let created = match command {
        CreateChatCommand::Private { user_id } => {
            if user_id <= 0 {
                return Err(CreateChatError::InvalidInput("Recipient ID is required"));
            }
            creator.create_private(user_id).await
        }
        CreateChatCommand::Group { group_id, name } => {
            let group_id = group_id.trim();
            let name = name.trim();
            if group_id.is_empty() || name.is_empty() {
                return Err(CreateChatError::InvalidInput(
                    "Group ID and name are required",
                ));
            }
            creator.create_group(group_id, name).await
        }
    };

    let chat = created.map_err(map_source_error)?;
    tracing::info!(chat_id = chat.id, kind = ?chat.kind, "chat created");
    Ok(chat)
}

fn map_source_error(error: SourceError) -> CreateChatError {
    match error {
        SourceError::Forbidden => CreateChatError::Forbidden,
        SourceError::Unauthorized => CreateChatError::Unauthorized,
        SourceError::Rejected(details) => CreateChatError::Rejected(details),
        SourceError::NotFound | SourceError::Unavailable | SourceError::InvalidData => {
            CreateChatError::TemporarilyUnavailable
        }
    }
}
