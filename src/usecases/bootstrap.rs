use std::{path::Path, sync::Arc};

use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    infra::{
        self, config::FileConfigAdapter, contracts::ConfigAdapter, error::AppError,
        session_store::FileSessionStore, snapshot_store::FileSnapshotStore,
        storage_layout::StorageLayout,
    },
    usecases::context::{AppContext, SessionContext},
};

/// Context plus the log flush guard, which must outlive the command.
pub struct Bootstrapped {
    pub context: AppContext,
    pub log_guard: Option<WorkerGuard>,
}

pub fn bootstrap(config_path: Option<&Path>) -> Result<Bootstrapped, AppError> {
    let layout = StorageLayout::resolve()?;
    layout.ensure_dirs()?;

    let config = FileConfigAdapter::new(config_path).load()?;
    let log_guard = infra::logging::init(&config.logging, &layout)?;

    let context = build_context(config, layout)?;
    tracing::debug!(
        config_dir = %context.layout.config_dir.display(),
        logged_in = context.session.current().is_some(),
        "bootstrap completed"
    );

    Ok(Bootstrapped { context, log_guard })
}

fn build_context(
    config: infra::config::AppConfig,
    layout: StorageLayout,
) -> Result<AppContext, AppError> {
    let sessions = Arc::new(FileSessionStore::new(&layout));
    let snapshots = Arc::new(FileSnapshotStore::new(layout.cache_dir.clone()));
    let session = SessionContext::hydrate(sessions.as_ref())?;

    Ok(AppContext::new(config, layout, session, sessions, snapshots))
}
