use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    domain::schedule::ScheduleEntry,
    usecases::{contracts::SourceError, load_schedule::ScheduleSource},
};

use super::client::ApiClient;

#[async_trait]
impl ScheduleSource for ApiClient {
    async fn schedule_for(&self, date: NaiveDate) -> Result<Vec<ScheduleEntry>, SourceError> {
        let query = [("date", date.format("%Y-%m-%d").to_string())];
        Ok(self.get_json("/schedule", &query).await?)
    }
}
