use anyhow::Result;

use crate::{domain::session::Session, infra::config::AppConfig, infra::error::AppError};

pub trait ConfigAdapter {
    fn load(&self) -> Result<AppConfig>;
}

/// Durable key-value slots holding whole JSON snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Replaces the slot. Last write wins.
    fn write(&self, key: &str, payload: &[u8]) -> Result<(), AppError>;

    /// Returns `None` when nothing was ever written under `key`.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>, AppError>;
    fn save(&self, session: &Session) -> Result<(), AppError>;

    /// Returns true when a persisted session existed.
    fn clear(&self) -> Result<bool, AppError>;
}
