use std::collections::HashSet;

use super::{chat::ChatHeader, message::Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenChatUiState {
    Empty,
    Loading,
    Ready,
    /// First load failed and no snapshot was available.
    Error,
}

/// Result of applying a page to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUpdate {
    /// Newest identifier unchanged; nothing to re-render.
    Unchanged,
    Changed { scroll_to_bottom: bool },
}

/// How a newest-first page is combined with the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatestPagePolicy {
    /// The page becomes the whole window.
    Replace,
    /// Older messages already in the window are kept when the page connects to them.
    Merge,
}

/// Messages displayed for one open chat, oldest first.
///
/// The window is always a gap-free run ending at the newest known message:
/// older pages only extend it backwards, newest pages either replace it or
/// connect to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenChatState {
    chat_id: Option<i64>,
    header: ChatHeader,
    messages: Vec<Message>,
    ui_state: OpenChatUiState,
    newest_id: Option<i64>,
    has_more: bool,
    offline: bool,
    at_bottom: bool,
    extended: bool,
    /// Bumped whenever the window is rebuilt instead of extended; an older-page
    /// offset taken under one generation is meaningless under the next.
    generation: u64,
}

impl Default for OpenChatState {
    fn default() -> Self {
        Self {
            chat_id: None,
            header: ChatHeader::fallback(),
            messages: Vec::new(),
            ui_state: OpenChatUiState::Empty,
            newest_id: None,
            has_more: true,
            offline: false,
            at_bottom: true,
            extended: false,
            generation: 0,
        }
    }
}

impl OpenChatState {
    pub fn chat_id(&self) -> Option<i64> {
        self.chat_id
    }

    pub fn header(&self) -> &ChatHeader {
        &self.header
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn ui_state(&self) -> OpenChatUiState {
        self.ui_state
    }

    /// Identifier of the newest message seen; the poll change-detection key.
    pub fn newest_id(&self) -> Option<i64> {
        self.newest_id
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn is_at_bottom(&self) -> bool {
        self.at_bottom
    }

    /// True once older pages were prepended beyond the newest page.
    pub fn is_extended(&self) -> bool {
        self.extended
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Offset of the next older page: the window is the newest `len` messages.
    pub fn older_page_offset(&self) -> usize {
        self.messages.len()
    }

    pub fn set_loading(&mut self, chat_id: i64, header: ChatHeader) {
        *self = Self {
            chat_id: Some(chat_id),
            header,
            ui_state: OpenChatUiState::Loading,
            generation: self.generation + 1,
            ..Self::default()
        };
    }

    pub fn set_header(&mut self, header: ChatHeader) {
        self.header = header;
    }

    pub fn set_at_bottom(&mut self, at_bottom: bool) {
        self.at_bottom = at_bottom;
    }

    pub fn set_error(&mut self) {
        self.messages.clear();
        self.newest_id = None;
        self.has_more = false;
        self.ui_state = OpenChatUiState::Error;
    }

    /// Applies a newest-first page of at most `page_size` messages.
    ///
    /// Returns `Unchanged` when the newest identifier matches the last one
    /// seen, or when the page is older than what the window already shows (a
    /// poll answered before our own send was echoed). The window and scroll
    /// position stay untouched.
    pub fn apply_latest_page(
        &mut self,
        page: Vec<Message>,
        page_size: usize,
        policy: LatestPagePolicy,
    ) -> WindowUpdate {
        let incoming_newest = page.first().map(|message| message.id);
        let live = self.ui_state == OpenChatUiState::Ready && !self.offline;
        if live && (incoming_newest == self.newest_id || self.is_behind(&page)) {
            return WindowUpdate::Unchanged;
        }

        let full_page = page.len() >= page_size;
        let page = chronological(page);

        if policy == LatestPagePolicy::Merge && self.connects_to(&page, full_page) {
            self.messages = merge_runs(std::mem::take(&mut self.messages), page);
        } else {
            self.messages = page;
            self.has_more = full_page;
            self.extended = false;
            self.generation += 1;
        }

        self.newest_id = incoming_newest.or(self.newest_id);
        self.ui_state = OpenChatUiState::Ready;
        self.offline = false;

        WindowUpdate::Changed {
            scroll_to_bottom: self.at_bottom,
        }
    }

    /// Prepends a newest-first page fetched at `older_page_offset()`.
    /// Returns how many messages were actually new to the window.
    pub fn prepend_older_page(&mut self, page: Vec<Message>, requested: usize) -> usize {
        self.has_more = page.len() >= requested;
        if page.is_empty() {
            return 0;
        }

        let before = self.messages.len();
        self.messages = merge_runs(chronological(page), std::mem::take(&mut self.messages));
        self.extended = true;

        self.messages.len() - before
    }

    /// Appends the server's echo of a message we sent.
    pub fn append_sent(&mut self, message: Message) -> WindowUpdate {
        self.newest_id = Some(message.id);
        self.messages = merge_runs(std::mem::take(&mut self.messages), vec![message]);
        self.ui_state = OpenChatUiState::Ready;
        self.at_bottom = true;

        WindowUpdate::Changed {
            scroll_to_bottom: true,
        }
    }

    /// Shows a cached newest-first snapshot after a failed first load.
    pub fn show_offline_snapshot(&mut self, snapshot: Vec<Message>, page_size: usize) {
        self.newest_id = snapshot.first().map(|message| message.id);
        self.has_more = snapshot.len() >= page_size;
        self.messages = chronological(snapshot);
        self.extended = false;
        self.generation += 1;
        self.offline = true;
        self.ui_state = OpenChatUiState::Ready;
    }

    fn is_behind(&self, page: &[Message]) -> bool {
        let incoming = page.iter().map(Message::order_key).max();
        let shown = self.messages.last().map(Message::order_key);
        matches!((incoming, shown), (Some(incoming), Some(shown)) if incoming < shown)
    }

    /// A page connects when it is the whole history or when its oldest message
    /// is not newer than our newest one.
    fn connects_to(&self, page: &[Message], full_page: bool) -> bool {
        let Some(window_newest) = self.messages.last() else {
            return false;
        };

        match page.first() {
            None => false,
            Some(_) if !full_page => true,
            Some(page_oldest) => page_oldest.order_key() <= window_newest.order_key(),
        }
    }
}

fn chronological(mut page: Vec<Message>) -> Vec<Message> {
    page.reverse();
    page.sort_by_key(Message::order_key);
    page
}

/// Merges two ordered runs; on identifier clashes the later run wins.
fn merge_runs(older: Vec<Message>, newer: Vec<Message>) -> Vec<Message> {
    let newer_ids: HashSet<i64> = newer.iter().map(|message| message.id).collect();

    let mut merged: Vec<Message> = older
        .into_iter()
        .filter(|message| !newer_ids.contains(&message.id))
        .chain(newer)
        .collect();
    merged.sort_by_key(Message::order_key);
    merged
}
