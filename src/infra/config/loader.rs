use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::infra::{
    config::{file_config::FileConfig, AppConfig},
    error::AppError,
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

pub fn load(path: Option<&Path>) -> Result<AppConfig, AppError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = AppConfig::default();

    if !config_path.exists() {
        return Ok(config);
    }

    let raw = fs::read_to_string(&config_path).map_err(|source| AppError::ConfigRead {
        path: config_path.clone(),
        source,
    })?;

    let file_config: FileConfig = toml::from_str(&raw).map_err(|source| AppError::ConfigParse {
        path: config_path,
        source,
    })?;

    file_config.merge_into(&mut config);
    validate(&config)?;
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), AppError> {
    if config.api.base_url.trim().is_empty() {
        return Err(AppError::ConfigInvalid {
            field: "api.base_url",
            details: "must not be empty".into(),
        });
    }

    if config.api.request_timeout_ms == 0 {
        return Err(AppError::ConfigInvalid {
            field: "api.request_timeout_ms",
            details: "must be greater than zero".into(),
        });
    }

    if config.sync.foreground_interval_ms == 0 {
        return Err(AppError::ConfigInvalid {
            field: "sync.foreground_interval_ms",
            details: "must be greater than zero".into(),
        });
    }

    Ok(())
}
