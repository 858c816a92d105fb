//! Message list rendering for the line-oriented chat screen.
//!
//! - Date separators between messages from different local days
//! - Sender grouping (consecutive messages from one sender show the name once)
//! - Multi-line bodies indented under the time column

use chrono::Local;

use crate::domain::message::Message;

const OWN_SENDER_LABEL: &str = "You";
const EMPTY_MESSAGE: &str = "[Empty message]";
const INDENT: &str = "      ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageListElement {
    /// Date separator line, e.g. "--- 14 Feb 2026 ---".
    DateSeparator(String),
    Message {
        time: String,
        sender: Option<String>,
        content: String,
    },
}

/// Builds visual elements for `messages` as seen by `viewer_id`.
///
/// `previous` is the message printed just before this batch, if any; it keeps
/// grouping and separators continuous across incremental renders.
pub fn build_message_list_elements(
    messages: &[Message],
    viewer_id: i64,
    previous: Option<&Message>,
) -> Vec<MessageListElement> {
    let mut elements = Vec::new();
    let mut prev_date = previous.map(Message::local_date);
    let mut prev_sender = previous.map(|message| message.sender_id);

    for message in messages {
        let date = message.local_date();

        if prev_date != Some(date) {
            elements.push(MessageListElement::DateSeparator(
                date.format("%-d %b %Y").to_string(),
            ));
            prev_sender = None;
        }

        let sender = (prev_sender != Some(message.sender_id)).then(|| {
            if message.is_from(viewer_id) {
                OWN_SENDER_LABEL.to_owned()
            } else {
                message.sender_label().to_owned()
            }
        });

        elements.push(MessageListElement::Message {
            time: message
                .created_at
                .with_timezone(&Local)
                .format("%H:%M")
                .to_string(),
            sender,
            content: message.text.clone(),
        });

        prev_date = Some(date);
        prev_sender = Some(message.sender_id);
    }

    elements
}

pub fn element_lines(element: &MessageListElement) -> Vec<String> {
    match element {
        MessageListElement::DateSeparator(date) => vec![format!("--- {date} ---")],
        MessageListElement::Message {
            time,
            sender: Some(sender),
            content,
        } => {
            let mut lines = vec![format!("{time:>5} {sender}:")];
            lines.extend(body_lines(content).map(|line| format!("{INDENT}{line}")));
            lines
        }
        MessageListElement::Message {
            time,
            sender: None,
            content,
        } => body_lines(content)
            .enumerate()
            .map(|(index, line)| {
                if index == 0 {
                    format!("{time:>5} {line}")
                } else {
                    format!("{INDENT}{line}")
                }
            })
            .collect(),
    }
}

pub fn render_messages(messages: &[Message], viewer_id: i64, previous: Option<&Message>) -> Vec<String> {
    build_message_list_elements(messages, viewer_id, previous)
        .iter()
        .flat_map(element_lines)
        .collect()
}

fn body_lines(content: &str) -> Box<dyn Iterator<Item = &str> + '_> {
    if content.trim().is_empty() {
        Box::new(std::iter::once(EMPTY_MESSAGE))
    } else {
        Box::new(content.lines())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn msg(id: i64, sender_id: i64, sender: &str, text: &str, minutes: i64) -> Message {
        Message {
            id,
            chat_id: 1,
            sender_id,
            sender_name: Some(sender.to_owned()),
            text: text.to_owned(),
            created_at: Utc
                .with_ymd_and_hms(2026, 2, 14, 12, 0, 0)
                .single()
                .expect("valid timestamp")
                + Duration::minutes(minutes),
        }
    }

    #[test]
    fn starts_with_date_separator() {
        let elements = build_message_list_elements(&[msg(1, 2, "Alice", "Hello", 0)], 1, None);

        assert_eq!(elements.len(), 2);
        assert!(matches!(&elements[0], MessageListElement::DateSeparator(_)));
    }

    #[test]
    fn groups_consecutive_messages_from_same_sender() {
        let messages = vec![
            msg(1, 2, "Alice", "First", 0),
            msg(2, 2, "Alice", "Second", 1),
            msg(3, 3, "Bob", "Third", 2),
        ];

        let elements = build_message_list_elements(&messages, 1, None);

        let senders: Vec<Option<&str>> = elements
            .iter()
            .filter_map(|element| match element {
                MessageListElement::Message { sender, .. } => Some(sender.as_deref()),
                MessageListElement::DateSeparator(_) => None,
            })
            .collect();
        assert_eq!(senders, vec![Some("Alice"), None, Some("Bob")]);
    }

    #[test]
    fn own_messages_are_labelled_you() {
        let elements = build_message_list_elements(&[msg(1, 7, "Me Myself", "Hi", 0)], 7, None);

        assert!(matches!(
            &elements[1],
            MessageListElement::Message { sender: Some(sender), .. } if sender == "You"
        ));
    }

    #[test]
    fn new_day_inserts_separator_and_repeats_sender() {
        let messages = vec![
            msg(1, 2, "Alice", "Today", 0),
            msg(2, 2, "Alice", "Tomorrow", 48 * 60),
        ];

        let elements = build_message_list_elements(&messages, 1, None);

        assert_eq!(elements.len(), 4);
        assert!(matches!(&elements[2], MessageListElement::DateSeparator(_)));
        assert!(matches!(
            &elements[3],
            MessageListElement::Message { sender: Some(_), .. }
        ));
    }

    #[test]
    fn continues_group_from_previous_batch() {
        let previous = msg(1, 2, "Alice", "Earlier", 0);

        let elements =
            build_message_list_elements(&[msg(2, 2, "Alice", "Later", 1)], 1, Some(&previous));

        assert_eq!(elements.len(), 1);
        assert!(matches!(
            &elements[0],
            MessageListElement::Message { sender: None, .. }
        ));
    }

    #[test]
    fn multi_line_and_empty_bodies_are_indented() {
        let lines = element_lines(&MessageListElement::Message {
            time: "10:00".to_owned(),
            sender: Some("Alice".to_owned()),
            content: "one\ntwo".to_owned(),
        });
        assert_eq!(lines, vec!["10:00 Alice:", "      one", "      two"]);

        let grouped = element_lines(&MessageListElement::Message {
            time: "10:01".to_owned(),
            sender: None,
            content: "  ".to_owned(),
        });
        assert_eq!(grouped, vec!["10:01 [Empty message]"]);
    }

    #[test]
    fn unknown_sender_gets_fallback_label() {
        let mut message = msg(1, 2, "", "Hi", 0);
        message.sender_name = None;

        let lines = render_messages(&[message], 1, None);

        assert!(lines[1].ends_with("Unknown:"));
    }
}
