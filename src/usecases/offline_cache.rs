//! Network-then-cache fallback shared by list screens.
//!
//! A successful fetch overwrites the whole snapshot under its key (last write
//! wins, no expiry). A failed fetch reads the snapshot back; if there is none
//! the caller shows an empty state.

use std::future::Future;

use serde::{de::DeserializeOwned, Serialize};

use crate::infra::contracts::SnapshotStore;

const CACHE_WRITE_FAILED: &str = "CACHE_WRITE_FAILED";
const CACHE_READ_FAILED: &str = "CACHE_READ_FAILED";

pub const CHAT_LIST_KEY: &str = "cached_chats";
pub const PROFILE_KEY: &str = "cached_profile";
pub const CONTACTS_KEY: &str = "cached_contacts";

pub fn chat_messages_key(chat_id: i64) -> String {
    format!("chat_messages_{chat_id}")
}

pub fn schedule_key(date: chrono::NaiveDate) -> String {
    format!("schedule_{}", date.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cached<T, E> {
    /// Fetched just now; the snapshot was refreshed.
    Fresh(T),
    /// Fetch failed; showing the last stored snapshot.
    Offline { value: T, reason: E },
    /// Fetch failed and nothing was cached.
    Unavailable { reason: E },
}

impl<T, E> Cached<T, E> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Fresh(value) | Self::Offline { value, .. } => Some(value),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_offline(&self) -> bool {
        !matches!(self, Self::Fresh(_))
    }
}

/// Writes `value` as the snapshot for `key`. Failures are logged only.
pub fn store_snapshot<T: Serialize + ?Sized>(store: &dyn SnapshotStore, key: &str, value: &T) {
    let written = serde_json::to_vec(value)
        .map_err(anyhow::Error::from)
        .and_then(|payload| store.write(key, &payload).map_err(anyhow::Error::from));

    if let Err(error) = written {
        tracing::warn!(code = CACHE_WRITE_FAILED, key, error = %error, "snapshot write failed");
    }
}

/// Reads the snapshot for `key`. Unreadable or undecodable snapshots count as
/// missing.
pub fn read_snapshot<T: DeserializeOwned>(store: &dyn SnapshotStore, key: &str) -> Option<T> {
    let payload = match store.read(key) {
        Ok(payload) => payload?,
        Err(error) => {
            tracing::warn!(code = CACHE_READ_FAILED, key, error = %error, "snapshot read failed");
            return None;
        }
    };

    match serde_json::from_slice(&payload) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(
                code = CACHE_READ_FAILED,
                key,
                error = %error,
                "snapshot could not be decoded"
            );
            None
        }
    }
}

/// Runs `fetch`; on success refreshes the snapshot, on failure falls back to it.
pub async fn fetch_or_cached<T, E, F>(store: &dyn SnapshotStore, key: &str, fetch: F) -> Cached<T, E>
where
    T: Serialize + DeserializeOwned,
    F: Future<Output = Result<T, E>>,
{
    match fetch.await {
        Ok(value) => {
            store_snapshot(store, key, &value);
            Cached::Fresh(value)
        }
        Err(reason) => match read_snapshot(store, key) {
            Some(value) => Cached::Offline { value, reason },
            None => Cached::Unavailable { reason },
        },
    }
}
