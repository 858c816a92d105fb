//! Use case for sending a message to a chat.
//!
//! There is no optimistic insert: the caller shows the message only once the
//! server has echoed the created record back.

use async_trait::async_trait;

use crate::domain::message::Message;

use super::contracts::SourceError;

/// Command to send a message to a specific chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub chat_id: i64,
    pub text: String,
}

/// Domain-level errors for send message operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendMessageError {
    /// Message text is empty after trimming whitespace.
    EmptyMessage,
    /// User is not authorized to send messages.
    Unauthorized,
    /// Target chat was not found or the user is not a member.
    ChatNotFound,
    /// Service is temporarily unavailable.
    TemporarilyUnavailable,
}

impl SendMessageError {
    /// Text for the alert shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyMessage => "Type a message first.",
            Self::Unauthorized => "Your session has expired. Log in again to send messages.",
            Self::ChatNotFound => "This chat is no longer available.",
            Self::TemporarilyUnavailable => "Could not send the message. Try again later.",
        }
    }
}

/// Trait for sending messages to chats.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Sends a text message and returns the record created by the server.
    ///
    /// # Errors
    /// Returns `SourceError` if the message could not be sent.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<Message, SourceError>;
}

/// Sends a message to the specified chat.
///
/// Validates the message text (must not be empty after trimming) and delegates
/// to the `MessageSender` implementation.
///
/// # Errors
/// Returns `SendMessageError::EmptyMessage` if text is empty/whitespace.
/// Maps source errors to domain errors for other failure cases.
pub async fn send_message(
    sender: &dyn MessageSender,
    command: SendMessageCommand,
) -> Result<Message, SendMessageError> {
    let text = command.text.trim();
    if text.is_empty() {
        return Err(SendMessageError::EmptyMessage);
    }

    sender
        .send_message(command.chat_id, text)
        .await
        .map_err(map_source_error)
}

fn map_source_error(error: SourceError) -> SendMessageError {
    match error {
        SourceError::Unauthorized => SendMessageError::Unauthorized,
        SourceError::Forbidden | SourceError::NotFound => SendMessageError::ChatNotFound,
        SourceError::Unavailable | SourceError::InvalidData | SourceError::Rejected(_) => {
            SendMessageError::TemporarilyUnavailable
        }
    }
}
