use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use crate::infra::{contracts::SnapshotStore, error::AppError};

/// Snapshot slots stored as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf, AppError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
        if !valid {
            return Err(AppError::InvalidSnapshotKey(key.to_owned()));
        }

        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn write(&self, key: &str, payload: &[u8]) -> Result<(), AppError> {
        let path = self.slot_path(key)?;
        let staging = path.with_extension("json.tmp");

        write_synced(&staging, payload).map_err(|source| AppError::StorageIo {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &path).map_err(|source| AppError::StorageIo {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(key, bytes = payload.len(), "snapshot written");
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let path = self.slot_path(key)?;

        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(AppError::StorageIo { path, source }),
        }
    }
}

fn write_synced(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(payload)?;
    file.sync_all()
}
