use std::{
    fs::{self, OpenOptions},
    io::ErrorKind,
    path::PathBuf,
};

use fs2::FileExt;

use crate::{
    domain::session::Session,
    infra::{contracts::SessionStore, error::AppError, storage_layout::StorageLayout},
};

/// Persists the logged-in session as JSON in the session directory.
///
/// Writers take an exclusive `fs2` lock on a sibling lock file so two
/// processes never interleave a save with a clear.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    session_file: PathBuf,
    lock_file: PathBuf,
}

impl FileSessionStore {
    pub fn new(layout: &StorageLayout) -> Self {
        Self {
            session_file: layout.session_file(),
            lock_file: layout.session_lock_file(),
        }
    }

    fn with_lock<T>(&self, action: impl FnOnce() -> Result<T, AppError>) -> Result<T, AppError> {
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_file)
            .map_err(|source| self.lock_error(source))?;
        lock.lock_exclusive()
            .map_err(|source| self.lock_error(source))?;

        let result = action();
        let _ = FileExt::unlock(&lock);
        result
    }

    fn lock_error(&self, source: std::io::Error) -> AppError {
        AppError::StorageIo {
            path: self.lock_file.clone(),
            source,
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, AppError> {
        let raw = match fs::read(&self.session_file) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(AppError::StorageIo {
                    path: self.session_file.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| AppError::StorageCorrupted {
                path: self.session_file.clone(),
                source,
            })
    }

    fn save(&self, session: &Session) -> Result<(), AppError> {
        let payload = serde_json::to_vec(session).map_err(|source| AppError::StorageCorrupted {
            path: self.session_file.clone(),
            source,
        })?;

        self.with_lock(|| {
            fs::write(&self.session_file, &payload).map_err(|source| AppError::StorageIo {
                path: self.session_file.clone(),
                source,
            })
        })
    }

    fn clear(&self) -> Result<bool, AppError> {
        self.with_lock(|| match fs::remove_file(&self.session_file) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(AppError::StorageIo {
                path: self.session_file.clone(),
                source,
            }),
        })
    }
}
