use chrono::NaiveDate;

use crate::domain::schedule::ScheduleEntry;

use super::chat_list::OFFLINE_MARKER;

pub fn render_schedule(date: NaiveDate, lessons: &[ScheduleEntry], offline: bool) -> Vec<String> {
    let mut lines = Vec::new();

    if offline {
        lines.push(OFFLINE_MARKER.to_owned());
    }

    lines.push(format!("Schedule for {}", date.format("%A, %-d %B %Y")));

    if lessons.is_empty() {
        lines.push("No lessons on this day.".to_owned());
        return lines;
    }

    for lesson in lessons {
        let mut line = format!("{:<11}  {}", lesson.time_range(), lesson.subject);
        if let Some(subgroup) = lesson.subgroup.as_deref().filter(|sub| !sub.trim().is_empty()) {
            line.push_str(&format!(" (subgroup {subgroup})"));
        }
        lines.push(line);

        let details = lesson.details();
        if !details.is_empty() {
            lines.push(format!("{:<11}  {details}", ""));
        }
    }

    lines
}
