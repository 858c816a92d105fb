use async_trait::async_trait;

use crate::{
    domain::{
        profile::Contact,
        session::{User, UserRole},
    },
    infra::contracts::SnapshotStore,
};

use super::{
    contracts::SourceError,
    offline_cache::{fetch_or_cached, Cached, CONTACTS_KEY},
};

#[async_trait]
pub trait ContactsSource: Send + Sync {
    /// Teachers who have lessons with the student's group (`GET /teachers/my`).
    async fn my_teachers(&self) -> Result<Vec<Contact>, SourceError>;
    /// Students of every group the teacher has taught (`GET /students/my`).
    async fn my_students(&self) -> Result<Vec<Contact>, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListContactsError {
    /// Accounts other than students and teachers have no contact list.
    NotSupported,
    Unauthorized,
    /// Student account without a group, or user gone.
    ProfileIncomplete,
    TemporarilyUnavailable,
}

impl ListContactsError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotSupported => "Only students and teachers have contacts.",
            Self::Unauthorized => "Your session has expired. Log in again.",
            Self::ProfileIncomplete => "Your profile has no study group, so no contacts can be found.",
            Self::TemporarilyUnavailable => "Contacts could not be refreshed.",
        }
    }
}

pub type ListContactsOutput = Cached<Vec<Contact>, ListContactsError>;

/// Contacts of `viewer`, grouped by affiliation then ordered by name, without
/// the viewer and without duplicates.
pub async fn list_contacts(
    source: &dyn ContactsSource,
    cache: &dyn SnapshotStore,
    viewer: &User,
) -> ListContactsOutput {
    if !matches!(viewer.role, UserRole::Student | UserRole::Teacher) {
        return Cached::Unavailable {
            reason: ListContactsError::NotSupported,
        };
    }

    fetch_or_cached(cache, CONTACTS_KEY, async {
        let fetched = match viewer.role {
            UserRole::Student => source.my_teachers().await,
            _ => source.my_students().await,
        };
        let mut contacts = fetched.map_err(map_source_error)?;

        contacts.retain(|contact| contact.id != viewer.id);
        contacts.sort_by(|left, right| {
            left.affiliation()
                .cmp(&right.affiliation())
                .then_with(|| left.full_name.cmp(&right.full_name))
                .then_with(|| left.id.cmp(&right.id))
        });
        contacts.dedup_by_key(|contact| contact.id);
        Ok::<_, ListContactsError>(contacts)
    })
    .await
}

fn map_source_error(error: SourceError) -> ListContactsError {
    match error {
        SourceError::Unauthorized => ListContactsError::Unauthorized,
        SourceError::Forbidden => ListContactsError::NotSupported,
        SourceError::NotFound => ListContactsError::ProfileIncomplete,
        SourceError::Rejected(_) | SourceError::Unavailable | SourceError::InvalidData => {
            ListContactsError::TemporarilyUnavailable
        }
    }
}
