use async_trait::async_trait;

use crate::{
    domain::profile::{Contact, ProfileDetails},
    usecases::{
        contracts::SourceError, list_contacts::ContactsSource, load_profile::ProfileSource,
    },
};

use super::client::ApiClient;

#[async_trait]
impl ProfileSource for ApiClient {
    async fn profile(&self) -> Result<ProfileDetails, SourceError> {
        Ok(self.get_json("/profile", &[]).await?)
    }

    async fn profile_details(&self) -> Result<ProfileDetails, SourceError> {
        Ok(self.get_json("/profile/details", &[]).await?)
    }
}

#[async_trait]
impl ContactsSource for ApiClient {
    async fn my_teachers(&self) -> Result<Vec<Contact>, SourceError> {
        Ok(self.get_json("/teachers/my", &[]).await?)
    }

    async fn my_students(&self) -> Result<Vec<Contact>, SourceError> {
        Ok(self.get_json("/students/my", &[]).await?)
    }
}
