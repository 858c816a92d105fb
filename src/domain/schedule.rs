use serde::{Deserialize, Serialize};

/// One lesson from `GET /schedule?date=`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: i64,
    pub date: String,
    pub time_start: String,
    pub time_end: String,
    pub subject: String,
    #[serde(default)]
    pub lesson_type: Option<String>,
    #[serde(default)]
    pub subgroup: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub teacher_name: Option<String>,
    #[serde(default)]
    pub auditory: Option<String>,
}

impl ScheduleEntry {
    pub fn time_range(&self) -> String {
        format!("{}-{}", self.time_start, self.time_end)
    }

    /// Location and counterpart, e.g. "room 301, Ivanov O.".
    pub fn details(&self) -> String {
        [
            self.lesson_type.as_deref(),
            self.auditory.as_deref(),
            self.teacher_name.as_deref(),
            self.group_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}
