use crate::domain::{
    profile::{Contact, ProfileDetails},
    session::UserRole,
};

use super::chat_list::OFFLINE_MARKER;

pub fn render_profile(profile: &ProfileDetails, offline: bool) -> Vec<String> {
    let mut lines = Vec::new();
    if offline {
        lines.push(OFFLINE_MARKER.to_owned());
    }

    lines.push(format!("{} ({})", profile.full_name, profile.role.as_label()));
    lines.push(format!("Email:     {}", profile.email));
    push_field(&mut lines, "Group:", profile.group_name.as_deref());
    push_field(&mut lines, "Schedule:", profile.teacher_name.as_deref());
    push_field(&mut lines, "Faculty:", profile.faculty.as_deref());
    if let Some(course) = profile.course {
        lines.push(format!("Course:    {course}"));
    }
    if let Some(semester) = profile.semester {
        lines.push(format!("Semester:  {semester}"));
    }

    if profile.has_statistics() {
        lines.push("This semester:".to_owned());
        let counters = [
            ("subjects", profile.total_subjects),
            ("lessons", profile.total_lessons),
            ("study days", profile.total_days),
            ("groups", profile.total_groups),
        ];
        for (label, value) in counters {
            if let Some(value) = value {
                lines.push(format!("  {value} {label}"));
            }
        }
    }

    lines
}

pub fn render_contacts(contacts: &[Contact], viewer_role: UserRole, offline: bool) -> Vec<String> {
    let mut lines = Vec::new();
    if offline {
        lines.push(OFFLINE_MARKER.to_owned());
    }

    let title = match viewer_role {
        UserRole::Student => "Your teachers",
        _ => "Your students",
    };
    if contacts.is_empty() {
        lines.push(format!("{title}: none found."));
        return lines;
    }

    lines.push(format!("{title} ({})", contacts.len()));
    let mut section: Option<&str> = None;
    for contact in contacts {
        let affiliation = contact.affiliation();
        if viewer_role == UserRole::Teacher && affiliation != section {
            lines.push(format!("[{}]", affiliation.unwrap_or("no group")));
            section = affiliation;
        }

        let mut line = format!("{:>6}  {}", contact.id, contact.full_name);
        if let Some(email) = contact.email.as_deref().filter(|email| !email.is_empty()) {
            line.push_str(&format!(" <{email}>"));
        }
        lines.push(line);
    }
    lines.push("Start a chat with `campus new-chat private --user-id <id>`.".to_owned());

    lines
}

fn push_field(lines: &mut Vec<String>, label: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|value| !value.trim().is_empty()) {
        lines.push(format!("{label:<10} {value}"));
    }
}
