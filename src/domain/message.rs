use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

const UNKNOWN_SENDER: &str = "Unknown";

/// A single chat message as delivered by `GET /chats/{id}/messages`.
///
/// Messages are immutable once created; the window ordering key is
/// `(created_at, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    /// Parent chat. Not part of the wire record, filled in by the API client.
    #[serde(default)]
    pub chat_id: i64,
    pub sender_id: i64,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(rename = "message")]
    pub text: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn sender_label(&self) -> &str {
        match self.sender_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => UNKNOWN_SENDER,
        }
    }

    pub fn is_from(&self, user_id: i64) -> bool {
        self.sender_id == user_id
    }

    /// Formats the creation time relative to `now`: "HH:MM" for today,
    /// "Yesterday HH:MM", otherwise "DD.MM.YY HH:MM".
    pub fn display_time<Tz>(&self, now: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let local = self.created_at.with_timezone(&now.timezone());
        let days = now
            .date_naive()
            .signed_duration_since(local.date_naive())
            .num_days();

        match days {
            0 => local.format("%H:%M").to_string(),
            1 => format!("Yesterday {}", local.format("%H:%M")),
            _ => local.format("%d.%m.%y %H:%M").to_string(),
        }
    }

    pub fn local_date(&self) -> chrono::NaiveDate {
        self.created_at.with_timezone(&Local).date_naive()
    }

    pub(crate) fn order_key(&self) -> (DateTime<Utc>, i64) {
        (self.created_at, self.id)
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unsupported timestamp `{raw}`")))
}
