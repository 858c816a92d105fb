use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{domain::schedule::ScheduleEntry, infra::contracts::SnapshotStore};

use super::{
    contracts::SourceError,
    offline_cache::{fetch_or_cached, schedule_key, Cached},
};

#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn schedule_for(&self, date: NaiveDate) -> Result<Vec<ScheduleEntry>, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadScheduleError {
    Unauthorized,
    ProfileNotFound,
    TemporarilyUnavailable,
    DataContractViolation,
}

impl LoadScheduleError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Your session has expired. Log in again.",
            Self::ProfileNotFound => "No student or teacher profile is linked to this account.",
            Self::TemporarilyUnavailable => "The schedule could not be refreshed.",
            Self::DataContractViolation => "The server sent a schedule this client cannot read.",
        }
    }
}

pub type LoadScheduleOutput = Cached<Vec<ScheduleEntry>, LoadScheduleError>;

/// Lessons for one day ordered by start time, cached per date.
pub async fn load_schedule(
    source: &dyn ScheduleSource,
    cache: &dyn SnapshotStore,
    date: NaiveDate,
) -> LoadScheduleOutput {
    fetch_or_cached(cache, &schedule_key(date), async {
        let mut lessons = source.schedule_for(date).await.map_err(map_source_error)?;
        lessons.sort_by(|left, right| left.time_start.cmp(&right.time_start));
        Ok::<_, LoadScheduleError>(lessons)
    })
    .await
}

fn map_source_error(error: SourceError) -> LoadScheduleError {
    match error {
        SourceError::Unauthorized => LoadScheduleError::Unauthorized,
        SourceError::NotFound => LoadScheduleError::ProfileNotFound,
        SourceError::InvalidData => LoadScheduleError::DataContractViolation,
        SourceError::Forbidden | SourceError::Unavailable | SourceError::Rejected(_) => {
            LoadScheduleError::TemporarilyUnavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::infra::stubs::MemorySnapshotStore;

    struct StubSource {
        result: Result<Vec<ScheduleEntry>, SourceError>,
        captured: Mutex<Option<NaiveDate>>,
    }

    impl StubSource {
        fn with_result(result: Result<Vec<ScheduleEntry>, SourceError>) -> Self {
            Self {
                result,
                captured: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ScheduleSource for StubSource {
        async fn schedule_for(&self, date: NaiveDate) -> Result<Vec<ScheduleEntry>, SourceError> {
            *self.captured.lock().expect("captured lock") = Some(date);
            self.result.clone()
        }
    }

    fn lesson(id: i64, time_start: &str) -> ScheduleEntry {
        ScheduleEntry {
            id,
            date: "2024-10-15".to_owned(),
            time_start: time_start.to_owned(),
            time_end: "23:59".to_owned(),
            subject: format!("Subject {id}"),
            lesson_type: None,
            subgroup: None,
            group_name: None,
            teacher_name: None,
            auditory: None,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 15).expect("valid date")
    }

    #[tokio::test]
    async fn lessons_are_ordered_by_start_time() {
        let source = StubSource::with_result(Ok(vec![lesson(2, "13:00"), lesson(1, "09:00")]));
        let cache = MemorySnapshotStore::default();

        let output = load_schedule(&source, &cache, day()).await;

        let ids: Vec<i64> = output
            .value()
            .expect("fresh schedule")
            .iter()
            .map(|entry| entry.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(*source.captured.lock().expect("captured lock"), Some(day()));
    }

    #[tokio::test]
    async fn cached_day_is_served_offline() {
        let source = StubSource::with_result(Err(SourceError::Unavailable));
        let cache = MemorySnapshotStore::default();
        cache.insert_json(&schedule_key(day()), &vec![lesson(1, "09:00")]);

        let output = load_schedule(&source, &cache, day()).await;

        assert_eq!(
            output,
            Cached::Offline {
                value: vec![lesson(1, "09:00")],
                reason: LoadScheduleError::TemporarilyUnavailable,
            }
        );
    }

    #[tokio::test]
    async fn other_days_are_not_used_as_fallback() {
        let source = StubSource::with_result(Err(SourceError::Unavailable));
        let cache = MemorySnapshotStore::default();
        let tomorrow = day().succ_opt().expect("valid date");
        cache.insert_json(&schedule_key(tomorrow), &vec![lesson(1, "09:00")]);

        let output = load_schedule(&source, &cache, day()).await;

        assert!(matches!(output, Cached::Unavailable { .. }));
    }
}
