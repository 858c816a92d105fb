use super::chat::ChatSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatListUiState {
    Loading,
    Ready,
    Empty,
    Error,
}

/// Chat list as shown to the user, with selection kept by chat id across
/// refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatListState {
    ui_state: ChatListUiState,
    chats: Vec<ChatSession>,
    selected_index: Option<usize>,
    offline: bool,
}

impl Default for ChatListState {
    fn default() -> Self {
        Self {
            ui_state: ChatListUiState::Loading,
            chats: Vec::new(),
            selected_index: None,
            offline: false,
        }
    }
}

impl ChatListState {
    pub fn ui_state(&self) -> ChatListUiState {
        self.ui_state
    }

    pub fn chats(&self) -> &[ChatSession] {
        &self.chats
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn selected_chat(&self) -> Option<&ChatSession> {
        self.selected_index.and_then(|index| self.chats.get(index))
    }

    /// True when the list comes from the cached snapshot.
    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn total_unread(&self) -> u32 {
        self.chats.iter().map(|chat| chat.unread_count).sum()
    }

    pub fn set_loading(&mut self) {
        self.ui_state = ChatListUiState::Loading;
        self.chats.clear();
        self.selected_index = None;
        self.offline = false;
    }

    pub fn set_ready(&mut self, chats: Vec<ChatSession>, offline: bool) {
        self.offline = offline;
        if chats.is_empty() {
            self.ui_state = ChatListUiState::Empty;
            self.chats.clear();
            self.selected_index = None;
            return;
        }

        let previous_selected_chat_id = self.selected_chat().map(|chat| chat.id);
        self.ui_state = ChatListUiState::Ready;
        self.chats = chats;
        self.selected_index = resolve_selection_index(&self.chats, previous_selected_chat_id);
    }

    pub fn set_error(&mut self) {
        self.ui_state = ChatListUiState::Error;
        self.chats.clear();
        self.selected_index = None;
    }

    pub fn select_chat(&mut self, chat_id: i64) -> bool {
        match self.chats.iter().position(|chat| chat.id == chat_id) {
            Some(index) => {
                self.selected_index = Some(index);
                true
            }
            None => false,
        }
    }
}

fn resolve_selection_index(
    chats: &[ChatSession],
    previous_selected_chat_id: Option<i64>,
) -> Option<usize> {
    if chats.is_empty() {
        return None;
    }

    previous_selected_chat_id
        .and_then(|chat_id| chats.iter().position(|chat| chat.id == chat_id))
        .or(Some(0))
}
