use thiserror::Error;

use crate::usecases::contracts::SourceError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to build http client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("request is not authorized")]
    Unauthorized,
    #[error("access denied: {0}")]
    Forbidden(String),
    #[error("resource not found")]
    NotFound,
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("response could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),
}

impl From<ApiError> for SourceError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::ClientBuild(_) | ApiError::Transport(_) => SourceError::Unavailable,
            ApiError::Unauthorized => SourceError::Unauthorized,
            ApiError::Forbidden(_) => SourceError::Forbidden,
            ApiError::NotFound => SourceError::NotFound,
            ApiError::Status { status, message } if (400..500).contains(&status) => {
                SourceError::Rejected(message)
            }
            ApiError::Status { .. } => SourceError::Unavailable,
            ApiError::Decode(_) => SourceError::InvalidData,
        }
    }
}
