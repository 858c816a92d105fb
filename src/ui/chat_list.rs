use chrono::{DateTime, Local};

use crate::domain::chat_list_state::{ChatListState, ChatListUiState};

pub(crate) const OFFLINE_MARKER: &str = "[offline] showing saved data, the server could not be reached";
const EMPTY_CHAT_LIST: &str = "No chats yet. Start one with `campus new-chat`.";
const CHAT_LIST_ERROR: &str = "Chats could not be loaded.";
const PREVIEW_WIDTH: usize = 48;

pub fn render_chat_list(state: &ChatListState, now: &DateTime<Local>) -> Vec<String> {
    let mut lines = Vec::new();

    if state.is_offline() {
        lines.push(OFFLINE_MARKER.to_owned());
    }

    match state.ui_state() {
        ChatListUiState::Loading => lines.push("Loading chats...".to_owned()),
        ChatListUiState::Error => lines.push(CHAT_LIST_ERROR.to_owned()),
        ChatListUiState::Empty => lines.push(EMPTY_CHAT_LIST.to_owned()),
        ChatListUiState::Ready => {
            let unread = state.total_unread();
            if unread > 0 {
                lines.push(format!("Chats ({unread} unread)"));
            } else {
                lines.push("Chats".to_owned());
            }

            for chat in state.chats() {
                let badge = match chat.unread_count {
                    0 => String::new(),
                    count => format!(" ({count})"),
                };
                let when = chat
                    .last_message_at
                    .map(|at| format_when(at.with_timezone(&Local), now))
                    .unwrap_or_default();
                let preview = chat
                    .last_message
                    .as_deref()
                    .map(truncate_preview)
                    .unwrap_or_default();

                lines.push(format!(
                    "{:>6}  {}{}  {}  {}",
                    chat.id,
                    chat.list_title(),
                    badge,
                    when,
                    preview
                ).trim_end().to_owned());
            }
        }
    }

    lines
}

fn format_when(at: DateTime<Local>, now: &DateTime<Local>) -> String {
    if at.date_naive() == now.date_naive() {
        at.format("%H:%M").to_string()
    } else {
        at.format("%d.%m.%y").to_string()
    }
}

fn truncate_preview(text: &str) -> String {
    let single_line = text.lines().next().unwrap_or_default();
    if single_line.chars().count() <= PREVIEW_WIDTH {
        return single_line.to_owned();
    }

    let mut cut: String = single_line.chars().take(PREVIEW_WIDTH - 3).collect();
    cut.push_str("...");
    cut
}
