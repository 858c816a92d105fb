use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{chat::ChatSession, message::Message},
    usecases::{
        contracts::SourceError, create_chat::ChatCreator, list_chats::ListChatsSource,
        load_messages::MessagesSource, mark_read::ReadMarker, send_message::MessageSender,
    },
};

use super::client::ApiClient;

#[derive(Serialize)]
struct NewMessage<'a> {
    message: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewPrivateChat {
    user_id: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewGroupChat<'a> {
    group_id: &'a str,
    name: &'a str,
}

/// Chat row returned on creation; private chats carry the counterpart's name
/// separately.
#[derive(Deserialize)]
struct CreatedChat {
    #[serde(flatten)]
    chat: ChatSession,
    #[serde(default)]
    recipient_name: Option<String>,
}

impl CreatedChat {
    fn into_session(self) -> ChatSession {
        let mut chat = self.chat;
        if chat.display_name.is_none() {
            chat.display_name = self.recipient_name;
        }
        chat
    }
}

fn with_chat_id(mut message: Message, chat_id: i64) -> Message {
    message.chat_id = chat_id;
    message
}

#[async_trait]
impl ListChatsSource for ApiClient {
    async fn list_chats(&self) -> Result<Vec<ChatSession>, SourceError> {
        Ok(self.get_json("/chats", &[]).await?)
    }
}

#[async_trait]
impl MessagesSource for ApiClient {
    async fn list_messages(
        &self,
        chat_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>, SourceError> {
        let query = [("limit", limit.to_string()), ("offset", offset.to_string())];
        let messages: Vec<Message> = self
            .get_json(&format!("/chats/{chat_id}/messages"), &query)
            .await?;

        Ok(messages
            .into_iter()
            .map(|message| with_chat_id(message, chat_id))
            .collect())
    }
}

#[async_trait]
impl MessageSender for ApiClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<Message, SourceError> {
        let message: Message = self
            .post_json(
                &format!("/chats/{chat_id}/messages"),
                &NewMessage { message: text },
            )
            .await?;

        Ok(with_chat_id(message, chat_id))
    }
}

#[async_trait]
impl ReadMarker for ApiClient {
    async fn mark_read(&self, chat_id: i64) -> Result<(), SourceError> {
        Ok(self.post_empty(&format!("/chats/{chat_id}/read")).await?)
    }
}

#[async_trait]
impl ChatCreator for ApiClient {
    async fn create_private(&self, user_id: i64) -> Result<ChatSession, SourceError> {
        let created: CreatedChat = self
            .post_json("/chats/private", &NewPrivateChat { user_id })
            .await?;
        Ok(created.into_session())
    }

    async fn create_group(&self, group_id: &str, name: &str) -> Result<ChatSession, SourceError> {
        let created: CreatedChat = self
            .post_json("/chats/group", &NewGroupChat { group_id, name })
            .await?;
        Ok(created.into_session())
    }
}
