//! State management for the message composer.

/// Maximum accepted draft length in characters.
const MAX_INPUT_LENGTH: usize = 4096;

/// Draft text plus the in-flight send guard.
///
/// The draft is only cleared once the server has accepted the message, so a
/// failed send leaves it in place for a retry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageInputState {
    text: String,
    sending: bool,
}

impl MessageInputState {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Replaces the draft. Text past the length limit is dropped.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.chars().take(MAX_INPUT_LENGTH).collect();
    }

    /// Returns the text to send and marks a send in flight, or `None` when
    /// the draft is blank or another send has not finished.
    pub fn begin_send(&mut self) -> Option<String> {
        if self.sending || self.is_blank() {
            return None;
        }

        self.sending = true;
        Some(self.text.trim().to_owned())
    }

    pub fn finish_send(&mut self, delivered: bool) {
        self.sending = false;
        if delivered {
            self.text.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_blank() {
        let state = MessageInputState::default();

        assert!(state.is_blank());
        assert_eq!(state.text(), "");
        assert!(!state.is_sending());
    }

    #[test]
    fn blank_draft_is_not_sent() {
        let mut state = MessageInputState::default();
        state.set_text("   ");

        assert_eq!(state.begin_send(), None);
        assert!(!state.is_sending());
    }

    #[test]
    fn only_one_send_at_a_time() {
        let mut state = MessageInputState::default();
        state.set_text(" hello ");

        assert_eq!(state.begin_send().as_deref(), Some("hello"));
        assert_eq!(state.begin_send(), None);
    }

    #[test]
    fn failed_send_keeps_draft() {
        let mut state = MessageInputState::default();
        state.set_text("hello");
        state.begin_send();

        state.finish_send(false);

        assert_eq!(state.text(), "hello");
        assert!(!state.is_sending());
    }

    #[test]
    fn delivered_send_clears_draft() {
        let mut state = MessageInputState::default();
        state.set_text("hello");
        state.begin_send();

        state.finish_send(true);

        assert!(state.is_blank());
    }

    #[test]
    fn set_text_respects_max_length_limit() {
        let mut state = MessageInputState::default();

        state.set_text(&"x".repeat(MAX_INPUT_LENGTH + 10));

        assert_eq!(state.text().chars().count(), MAX_INPUT_LENGTH);
    }

    #[test]
    fn handles_unicode_characters() {
        let mut state = MessageInputState::default();

        state.set_text("Привет");

        assert_eq!(state.begin_send().as_deref(), Some("Привет"));
    }
}
