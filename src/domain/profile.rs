use serde::{Deserialize, Serialize};

use super::session::{User, UserRole};

/// Account details from `GET /profile/details`, with the study statistics of
/// the current semester. `GET /profile` fills only the identity fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDetails {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    #[serde(rename = "user_type")]
    pub role: UserRole,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub teacher_name: Option<String>,
    #[serde(default)]
    pub faculty: Option<String>,
    #[serde(default)]
    pub course: Option<i64>,
    #[serde(default)]
    pub semester: Option<i64>,
    #[serde(default)]
    pub total_subjects: Option<i64>,
    #[serde(default)]
    pub total_lessons: Option<i64>,
    /// Students only.
    #[serde(default)]
    pub total_days: Option<i64>,
    /// Teachers only.
    #[serde(default)]
    pub total_groups: Option<i64>,
}

impl ProfileDetails {
    pub fn has_statistics(&self) -> bool {
        [
            self.total_subjects,
            self.total_lessons,
            self.total_days,
            self.total_groups,
        ]
        .iter()
        .any(Option::is_some)
    }
}

impl From<User> for ProfileDetails {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            group_name: user.group,
            teacher_name: user.teacher,
            faculty: None,
            course: None,
            semester: None,
            total_subjects: None,
            total_lessons: None,
            total_days: None,
            total_groups: None,
        }
    }
}

/// Someone the viewer can start a private chat with: the teachers of a
/// student's group, or the students a teacher has lessons with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub teacher_name: Option<String>,
}

impl Contact {
    /// Group for students, schedule name for teachers.
    pub fn affiliation(&self) -> Option<&str> {
        self.group_name
            .as_deref()
            .or(self.teacher_name.as_deref())
            .filter(|value| !value.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_student_details_with_statistics() {
        let raw = r#"{"id": 8, "email": "s@uni.edu", "full_name": "Student Eight", "user_type": "student",
            "group_name": "IS-21", "teacher_name": null, "faculty": "Informatics", "course": 2,
            "semester": 3, "total_subjects": 9, "total_days": 40, "total_lessons": 120}"#;

        let details: ProfileDetails = serde_json::from_str(raw).expect("details should decode");

        assert_eq!(details.role, UserRole::Student);
        assert_eq!(details.course, Some(2));
        assert_eq!(details.total_groups, None);
        assert!(details.has_statistics());
    }

    #[test]
    fn basic_profile_has_no_statistics() {
        let raw = r#"{"id": 4, "email": "t@uni.edu", "full_name": "Oleg Ivanov", "user_type": "teacher",
            "group_name": null, "teacher_name": "Ivanov O."}"#;

        let details: ProfileDetails = serde_json::from_str(raw).expect("profile should decode");

        assert_eq!(details.teacher_name.as_deref(), Some("Ivanov O."));
        assert!(!details.has_statistics());
    }

    #[test]
    fn contact_affiliation_prefers_group() {
        let student: Contact = serde_json::from_str(
            r#"{"id": 8, "full_name": "Student Eight", "email": "s@uni.edu", "group_name": "IS-21"}"#,
        )
        .expect("student contact should decode");
        let teacher: Contact = serde_json::from_str(
            r#"{"id": 4, "full_name": "Oleg Ivanov", "email": "t@uni.edu", "teacher_name": "Ivanov O."}"#,
        )
        .expect("teacher contact should decode");

        assert_eq!(student.affiliation(), Some("IS-21"));
        assert_eq!(teacher.affiliation(), Some("Ivanov O."));
    }
}
