//! Draft state for the message composer.

/// WhatsApp rejects text bodies above this length.
const MAX_DRAFT_CHARS: usize = 65_536;

/// Message the draft replies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    pub message_id: String,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComposerState {
    text: String,
    /// Cursor as a character index.
    cursor: usize,
    reply_to: Option<ReplyTarget>,
    /// Set while the draft is in flight; edits are refused until it settles.
    sending: bool,
}

impl ComposerState {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn reply_to(&self) -> Option<&ReplyTarget> {
        self.reply_to.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Marks the draft as submitted. Returns false when it is empty or a
    /// send is already in flight.
    pub fn begin_send(&mut self) -> bool {
        if self.sending || self.is_empty() {
            return false;
        }
        self.sending = true;
        true
    }

    /// Releases the draft after a failed send so it can be edited again.
    pub fn cancel_send(&mut self) {
        self.sending = false;
    }

    pub fn set_reply_to(&mut self, target: Option<ReplyTarget>) {
        self.reply_to = target;
    }

    /// Returns false when the draft is already at its maximum length.
    pub fn insert(&mut self, ch: char) -> bool {
        if self.sending || self.text.chars().count() >= MAX_DRAFT_CHARS {
            return false;
        }

        let at = self.byte_index(self.cursor);
        self.text.insert(at, ch);
        self.cursor += 1;
        true
    }

    pub fn backspace(&mut self) {
        if self.sending || self.cursor == 0 {
            return;
        }

        self.cursor -= 1;
        let start = self.byte_index(self.cursor);
        let end = self.byte_index(self.cursor + 1);
        self.text.drain(start..end);
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    /// Takes the draft for sending and resets the composer.
    pub fn take(&mut self) -> (String, Option<ReplyTarget>) {
        self.cursor = 0;
        self.sending = false;
        (std::mem::take(&mut self.text), self.reply_to.take())
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map(|(byte_index, _)| byte_index)
            .unwrap_or(self.text.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> ComposerState {
        let mut state = ComposerState::default();
        for ch in text.chars() {
            state.insert(ch);
        }
        state
    }

    #[test]
    fn insert_in_the_middle_respects_cursor() {
        let mut state = typed("Ho");
        state.move_left();
        state.insert('i');

        assert_eq!(state.text(), "Hio");
        assert_eq!(state.cursor(), 2);
    }

    #[test]
    fn backspace_handles_multibyte_characters() {
        let mut state = typed("Olá");
        state.backspace();

        assert_eq!(state.text(), "Ol");

        state.move_left();
        state.move_left();
        state.backspace();
        assert_eq!(state.text(), "Ol");
        assert_eq!(state.cursor(), 0);
    }

    #[test]
    fn cursor_stays_within_text() {
        let mut state = typed("ab");
        state.move_right();
        assert_eq!(state.cursor(), 2);

        state.move_left();
        state.move_left();
        state.move_left();
        assert_eq!(state.cursor(), 0);
    }

    #[test]
    fn whitespace_only_draft_counts_as_empty() {
        assert!(typed("   ").is_empty());
        assert!(!typed(" x ").is_empty());
    }

    #[test]
    fn take_returns_draft_and_reply_then_resets() {
        let mut state = typed("yes");
        state.set_reply_to(Some(ReplyTarget {
            message_id: "ABC".to_owned(),
            preview: "are you there?".to_owned(),
        }));

        let (text, reply) = state.take();

        assert_eq!(text, "yes");
        assert_eq!(reply.map(|r| r.message_id), Some("ABC".to_owned()));
        assert_eq!(state, ComposerState::default());
    }

    #[test]
    fn in_flight_draft_is_locked_until_released() {
        let mut state = typed("ok");

        assert!(state.begin_send());
        assert!(!state.begin_send());
        assert!(!state.insert('!'));
        state.backspace();
        assert_eq!(state.text(), "ok");

        state.cancel_send();
        assert!(state.insert('!'));
        assert_eq!(state.text(), "ok!");
    }

    #[test]
    fn empty_draft_is_never_sent() {
        let mut state = typed("  ");

        assert!(!state.begin_send());
        assert!(!state.is_sending());
    }
}
