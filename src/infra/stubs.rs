//! In-memory stores used by use-case tests.

use std::{collections::HashMap, sync::Mutex};

use anyhow::Result;

use crate::{
    domain::session::Session,
    infra::{
        config::AppConfig,
        contracts::{ConfigAdapter, SessionStore, SnapshotStore},
        error::AppError,
    },
};

#[derive(Debug, Clone, Default)]
pub struct StubConfigAdapter;

impl ConfigAdapter for StubConfigAdapter {
    fn load(&self) -> Result<AppConfig> {
        Ok(AppConfig::default())
    }
}

#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    slots: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: bool,
}

impl MemorySnapshotStore {
    pub fn failing_writes() -> Self {
        Self {
            slots: Mutex::default(),
            fail_writes: true,
        }
    }

    pub fn insert_json<T: serde::Serialize>(&self, key: &str, value: &T) {
        let payload = serde_json::to_vec(value).expect("stub payload should serialize");
        self.slots
            .lock()
            .expect("slots lock")
            .insert(key.to_owned(), payload);
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.slots.lock().expect("slots lock").get(key).cloned()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn write(&self, key: &str, payload: &[u8]) -> Result<(), AppError> {
        if self.fail_writes {
            return Err(AppError::StorageIo {
                path: key.into(),
                source: std::io::Error::other("disk full"),
            });
        }

        self.slots
            .lock()
            .expect("slots lock")
            .insert(key.to_owned(), payload.to_vec());
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        Ok(self.get(key))
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    pub fn stored(&self) -> Option<Session> {
        self.session.lock().expect("session lock").clone()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, AppError> {
        Ok(self.stored())
    }

    fn save(&self, session: &Session) -> Result<(), AppError> {
        *self.session.lock().expect("session lock") = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<bool, AppError> {
        Ok(self.session.lock().expect("session lock").take().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_config_returns_defaults() {
        let adapter = StubConfigAdapter;
        let config = adapter.load().expect("stub config must load");

        assert_eq!(config, AppConfig::default());
    }
}
