use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{
    message::{parse_timestamp, Message},
    session::{User, UserRole},
};

const DEFAULT_CHAT_TITLE: &str = "Chat";
const DEFAULT_TEACHER_TITLE: &str = "Teacher";
const PRIVATE_SUBTITLE: &str = "Private chat";
const GROUP_SUBTITLE: &str = "Group chat";

/// Kind of chat as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    /// One-to-one conversation.
    #[default]
    Private,
    /// Study group chat created by a teacher.
    Group,
}

/// A chat as listed by `GET /chats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: ChatKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_label")]
    pub group_id: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unread_count: u32,
}

impl ChatSession {
    /// Header shown on top of an open chat, depending on who is looking.
    pub fn header_for(&self, viewer: &User) -> ChatHeader {
        match self.kind {
            ChatKind::Private => ChatHeader::new(
                non_blank(self.display_name.as_deref()).unwrap_or(DEFAULT_CHAT_TITLE),
                PRIVATE_SUBTITLE,
            ),
            ChatKind::Group if viewer.role == UserRole::Student => ChatHeader::new(
                non_blank(self.name.as_deref())
                    .or_else(|| non_blank(self.display_name.as_deref()))
                    .unwrap_or(DEFAULT_TEACHER_TITLE),
                GROUP_SUBTITLE,
            ),
            ChatKind::Group => {
                let title = match non_blank(self.group_id.as_deref()) {
                    Some(group) => format!("{GROUP_SUBTITLE} {group}"),
                    None => GROUP_SUBTITLE.to_owned(),
                };
                ChatHeader::new(title, GROUP_SUBTITLE)
            }
        }
    }

    pub fn list_title(&self) -> &str {
        non_blank(self.display_name.as_deref())
            .or_else(|| non_blank(self.name.as_deref()))
            .unwrap_or(DEFAULT_CHAT_TITLE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHeader {
    pub title: String,
    pub subtitle: String,
}

impl ChatHeader {
    fn new(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
        }
    }

    /// Header for a chat whose metadata is unknown locally: the counterpart's
    /// name is taken from the first message they sent.
    pub fn from_messages(messages: &[Message], viewer: &User) -> Self {
        messages
            .iter()
            .find(|message| !message.is_from(viewer.id))
            .and_then(|message| non_blank(message.sender_name.as_deref()))
            .map(|name| Self::new(name, PRIVATE_SUBTITLE))
            .unwrap_or_else(Self::fallback)
    }

    pub fn fallback() -> Self {
        Self::new(DEFAULT_CHAT_TITLE, PRIVATE_SUBTITLE)
    }
}

/// Resolves the header from a cached chat list, falling back to message senders.
pub fn resolve_header(
    cached_chats: &[ChatSession],
    chat_id: i64,
    viewer: &User,
    messages: &[Message],
) -> ChatHeader {
    cached_chats
        .iter()
        .find(|chat| chat.id == chat_id)
        .map(|chat| chat.header_for(viewer))
        .unwrap_or_else(|| ChatHeader::from_messages(messages, viewer))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Label {
    Text(String),
    Number(i64),
}

fn deserialize_optional_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Label>::deserialize(deserializer)?.map(|label| match label {
        Label::Text(text) => text,
        Label::Number(number) => number.to_string(),
    }))
}

fn deserialize_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unsupported timestamp `{raw}`"))),
    }
}
