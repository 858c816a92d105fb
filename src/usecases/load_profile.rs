use async_trait::async_trait;

use crate::{
    domain::{profile::ProfileDetails, session::User},
    infra::contracts::SnapshotStore,
};

use super::{
    contracts::SourceError,
    offline_cache::{fetch_or_cached, Cached, PROFILE_KEY},
};

const PROFILE_DETAILS_FAILED: &str = "PROFILE_DETAILS_FAILED";

#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Identity only (`GET /profile`).
    async fn profile(&self) -> Result<ProfileDetails, SourceError>;
    /// Identity plus faculty and semester statistics (`GET /profile/details`).
    async fn profile_details(&self) -> Result<ProfileDetails, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadProfileError {
    Unauthorized,
    NotFound,
    TemporarilyUnavailable,
}

impl LoadProfileError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Your session has expired. Log in again.",
            Self::NotFound => "This account no longer exists.",
            Self::TemporarilyUnavailable => "The profile could not be refreshed.",
        }
    }
}

pub type LoadProfileOutput = Cached<ProfileDetails, LoadProfileError>;

/// Loads the detailed profile. When the statistics query fails server-side
/// the basic profile is used instead; both are cached.
pub async fn load_profile(source: &dyn ProfileSource, cache: &dyn SnapshotStore) -> LoadProfileOutput {
    fetch_or_cached(cache, PROFILE_KEY, async {
        match source.profile_details().await {
            Ok(details) => Ok(details),
            Err(error @ (SourceError::Unavailable | SourceError::InvalidData)) => {
                tracing::warn!(code = PROFILE_DETAILS_FAILED, error = ?error, "falling back to basic profile");
                source.profile().await.map_err(map_source_error)
            }
            Err(error) => Err(map_source_error(error)),
        }
    })
    .await
}

/// Profile to show when nothing could be fetched or cached.
pub fn session_profile(user: &User) -> ProfileDetails {
    ProfileDetails::from(user.clone())
}

fn map_source_error(error: SourceError) -> LoadProfileError {
    match error {
        SourceError::Unauthorized => LoadProfileError::Unauthorized,
        SourceError::NotFound => LoadProfileError::NotFound,
        SourceError::Forbidden
        | SourceError::Rejected(_)
        | SourceError::Unavailable
        | SourceError::InvalidData => LoadProfileError::TemporarilyUnavailable,
    }
}
