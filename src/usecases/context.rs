use std::sync::Arc;

use chrono::Utc;

use crate::{
    domain::session::{Session, User},
    infra::{
        config::AppConfig,
        contracts::{SessionStore, SnapshotStore},
        error::AppError,
        storage_layout::StorageLayout,
    },
};

const SESSION_EXPIRED_ON_HYDRATE: &str = "SESSION_EXPIRED_ON_HYDRATE";

/// The logged-in user, passed explicitly to whoever needs it.
///
/// Hydrated once from the session store at startup, replaced on login and
/// torn down on logout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    session: Option<Session>,
}

impl SessionContext {
    /// Loads the persisted session. An expired token is dropped from disk.
    pub fn hydrate(store: &dyn SessionStore) -> Result<Self, AppError> {
        let Some(session) = store.load()? else {
            return Ok(Self::default());
        };

        if session.is_expired_at(Utc::now()) {
            tracing::warn!(
                code = SESSION_EXPIRED_ON_HYDRATE,
                user_id = session.user.id,
                "persisted session expired; login required"
            );
            store.clear()?;
            return Ok(Self::default());
        }

        Ok(Self {
            session: Some(session),
        })
    }

    pub fn current(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|session| &session.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.token.as_str())
    }

    pub fn replace(&mut self, session: Session) {
        self.session = Some(session);
    }

    pub fn teardown(&mut self) -> Option<Session> {
        self.session.take()
    }
}

pub struct AppContext {
    pub config: AppConfig,
    pub layout: StorageLayout,
    pub session: SessionContext,
    pub sessions: Arc<dyn SessionStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        layout: StorageLayout,
        session: SessionContext,
        sessions: Arc<dyn SessionStore>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            config,
            layout,
            session,
            sessions,
            snapshots,
        }
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("layout", &self.layout)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
