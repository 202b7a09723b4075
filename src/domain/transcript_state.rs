use std::{collections::HashMap, time::Instant};

use super::{
    autoscroll::{AutoscrollController, AutoscrollDecision, ScrollPosition},
    chat::Contact,
    instance::IntegrationType,
    ordering::{RenderKey, TranscriptEntry},
    quote::QuoteHighlight,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptUiState {
    Empty,
    Loading,
    Ready,
    Error,
}

/// Which chat is open and under which instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenChat {
    pub instance: String,
    pub integration: IntegrationType,
    pub remote_jid: String,
    pub title: String,
}

/// Line layout of the rendered transcript, reported back by the view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptLayout {
    /// First line of each entry, in entry order.
    pub entry_line_starts: Vec<usize>,
    pub total_lines: usize,
    pub viewport_height: usize,
}

impl TranscriptLayout {
    fn max_offset(&self) -> usize {
        self.total_lines.saturating_sub(self.viewport_height)
    }
}

/// State of the open chat's transcript view.
///
/// Every `open` starts a new request epoch. Poll results carrying an older
/// epoch belong to a chat the user already left and are ignored.
#[derive(Debug, Clone)]
pub struct TranscriptState {
    chat: Option<OpenChat>,
    epoch: u64,
    entries: Vec<TranscriptEntry>,
    contacts: Vec<Contact>,
    ui_state: TranscriptUiState,
    autoscroll: AutoscrollController,
    highlight: QuoteHighlight,
    layout: TranscriptLayout,
    scroll_offset: usize,
    follow_bottom: bool,
}

impl Default for TranscriptState {
    fn default() -> Self {
        Self::with_pin_threshold(crate::domain::autoscroll::DEFAULT_PIN_THRESHOLD)
    }
}

impl TranscriptState {
    pub fn with_pin_threshold(threshold: u32) -> Self {
        Self {
            chat: None,
            epoch: 0,
            entries: Vec::new(),
            contacts: Vec::new(),
            ui_state: TranscriptUiState::Empty,
            autoscroll: AutoscrollController::with_threshold(threshold),
            highlight: QuoteHighlight::default(),
            layout: TranscriptLayout::default(),
            scroll_offset: 0,
            follow_bottom: true,
        }
    }

    pub fn chat(&self) -> Option<&OpenChat> {
        self.chat.as_ref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn ui_state(&self) -> TranscriptUiState {
        self.ui_state
    }

    pub fn autoscroll(&self) -> &AutoscrollController {
        &self.autoscroll
    }

    pub fn highlight(&self) -> &QuoteHighlight {
        &self.highlight
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn is_open(&self) -> bool {
        self.chat.is_some()
    }

    /// Opens `chat`, discarding the previous transcript. Returns the new epoch.
    pub fn open(&mut self, chat: OpenChat) -> u64 {
        self.epoch += 1;
        self.chat = Some(chat);
        self.entries.clear();
        self.contacts.clear();
        self.ui_state = TranscriptUiState::Loading;
        self.autoscroll.reset();
        self.highlight.clear();
        self.layout = TranscriptLayout::default();
        self.scroll_offset = 0;
        self.follow_bottom = true;
        self.epoch
    }

    pub fn close(&mut self) {
        self.epoch += 1;
        self.chat = None;
        self.entries.clear();
        self.contacts.clear();
        self.ui_state = TranscriptUiState::Empty;
        self.autoscroll.reset();
        self.highlight.clear();
        self.scroll_offset = 0;
    }

    pub fn set_contacts(&mut self, contacts: Vec<Contact>) {
        self.contacts = contacts;
    }

    /// Replaces the transcript with a freshly reconciled one. Returns false
    /// when `epoch` is stale and nothing was applied.
    pub fn apply(&mut self, epoch: u64, entries: Vec<TranscriptEntry>) -> bool {
        if epoch != self.epoch || self.chat.is_none() {
            tracing::debug!(
                stale_epoch = epoch,
                current_epoch = self.epoch,
                "discarding transcript for a chat that is no longer open"
            );
            return false;
        }

        let first_load = self.ui_state != TranscriptUiState::Ready;
        let arrived = count_arrivals(&self.entries, &entries);

        self.entries = entries;
        self.ui_state = TranscriptUiState::Ready;

        if first_load {
            self.follow_bottom = true;
        } else if arrived > 0 {
            match self.autoscroll.on_new_messages(arrived) {
                AutoscrollDecision::ScrollToBottom => self.follow_bottom = true,
                AutoscrollDecision::Hold { unread } => {
                    tracing::trace!(unread, "new messages held while scrolled up");
                }
            }
        }

        true
    }

    pub fn set_error(&mut self, epoch: u64) {
        if epoch == self.epoch && self.ui_state != TranscriptUiState::Ready {
            self.ui_state = TranscriptUiState::Error;
        }
    }

    /// Records the layout computed by the view and settles the scroll offset.
    pub fn update_layout(&mut self, layout: TranscriptLayout) {
        self.layout = layout;
        let max_offset = self.layout.max_offset();

        if self.follow_bottom || (self.autoscroll.is_pinned() && self.scroll_offset > max_offset) {
            self.scroll_offset = max_offset;
            self.follow_bottom = false;
        }

        self.scroll_offset = self.scroll_offset.min(max_offset);
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
        self.report_scroll();
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = (self.scroll_offset + lines).min(self.layout.max_offset());
        self.report_scroll();
    }

    /// Explicit jump to the newest message.
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.layout.max_offset();
        self.follow_bottom = true;
        self.autoscroll.scroll_to_bottom();
    }

    /// Entry whose lines end the visible window; replies are followed from it.
    pub fn focused_index(&self) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }

        let visible_end = self.scroll_offset + self.layout.viewport_height.max(1);
        let index = self
            .layout
            .entry_line_starts
            .iter()
            .take(self.entries.len())
            .rposition(|&start| start < visible_end)
            .unwrap_or(self.entries.len() - 1);

        Some(index)
    }

    /// Follows the reply of the focused entry: scrolls its quoted message to
    /// the top of the viewport and highlights it. Returns false on a miss.
    pub fn follow_quote(&mut self, now: Instant) -> bool {
        let Some(quoted_id) = self
            .focused_index()
            .and_then(|index| self.entries[index].message.quoted_id.clone())
        else {
            return false;
        };

        let Some(index) = self.highlight.jump_to(&quoted_id, &self.entries, now) else {
            return false;
        };

        if let Some(&start) = self.layout.entry_line_starts.get(index) {
            self.scroll_offset = start.min(self.layout.max_offset());
            self.follow_bottom = false;
            self.report_scroll();
        }

        true
    }

    /// Drops an elapsed jump highlight. Returns true if the view changed.
    pub fn expire_highlight(&mut self, now: Instant) -> bool {
        self.highlight.expire(now)
    }

    fn report_scroll(&mut self) {
        self.autoscroll.on_scroll(ScrollPosition {
            offset: to_u32(self.scroll_offset),
            max_offset: to_u32(self.layout.max_offset()),
        });
    }
}

/// Identity used to tell arrivals from messages already on screen. Id-less
/// messages match on content: their render keys move with their position.
#[derive(Debug, PartialEq, Eq, Hash)]
enum ArrivalKey {
    Id(String),
    Content {
        timestamp: i64,
        sender: String,
        body: String,
    },
}

fn arrival_key(entry: &TranscriptEntry) -> ArrivalKey {
    match &entry.key {
        RenderKey::Id(id) => ArrivalKey::Id(id.clone()),
        RenderKey::Synthetic { timestamp, .. } => ArrivalKey::Content {
            timestamp: *timestamp,
            sender: entry.message.sender_id(),
            body: entry.message.display_content(),
        },
    }
}

/// Entries of `next` not present in `previous`. Identical id-less messages
/// are matched one to one, so a repeated text still counts once per copy.
fn count_arrivals(previous: &[TranscriptEntry], next: &[TranscriptEntry]) -> usize {
    let mut known: HashMap<ArrivalKey, usize> = HashMap::new();
    for entry in previous {
        *known.entry(arrival_key(entry)).or_default() += 1;
    }

    next.iter()
        .filter(|entry| match known.get_mut(&arrival_key(entry)) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                false
            }
            _ => true,
        })
        .count()
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        autoscroll::ScrollMode,
        message::{Message, MessagePayload},
        ordering::order_transcript,
    };

    fn chat(remote_jid: &str) -> OpenChat {
        OpenChat {
            instance: "main".to_owned(),
            integration: IntegrationType::Baileys,
            remote_jid: remote_jid.to_owned(),
            title: "Ana".to_owned(),
        }
    }

    fn entries(ids: &[&str]) -> Vec<TranscriptEntry> {
        order_transcript(
            ids.iter()
                .enumerate()
                .map(|(index, id)| {
                    Message::new(
                        Some(*id),
                        Some(index as i64),
                        MessagePayload::Text(format!("message {id}")),
                    )
                })
                .collect(),
        )
    }

    /// One line per entry.
    fn layout(count: usize, viewport_height: usize) -> TranscriptLayout {
        TranscriptLayout {
            entry_line_starts: (0..count).collect(),
            total_lines: count,
            viewport_height,
        }
    }

    fn ready_state(count: usize, threshold: u32) -> (TranscriptState, u64) {
        let mut state = TranscriptState::with_pin_threshold(threshold);
        let epoch = state.open(chat("1@s.whatsapp.net"));
        let ids: Vec<String> = (0..count).map(|i| format!("m{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        state.apply(epoch, entries(&refs));
        state.update_layout(layout(count, 10));
        (state, epoch)
    }

    #[test]
    fn default_state_is_empty() {
        let state = TranscriptState::default();

        assert_eq!(state.ui_state(), TranscriptUiState::Empty);
        assert!(!state.is_open());
        assert!(state.entries().is_empty());
    }

    #[test]
    fn open_starts_loading_with_new_epoch() {
        let mut state = TranscriptState::default();

        let first = state.open(chat("a"));
        let second = state.open(chat("b"));

        assert!(second > first);
        assert_eq!(state.ui_state(), TranscriptUiState::Loading);
        assert_eq!(state.chat().map(|c| c.remote_jid.as_str()), Some("b"));
    }

    #[test]
    fn stale_epoch_results_are_discarded() {
        let mut state = TranscriptState::default();
        let stale = state.open(chat("a"));
        let current = state.open(chat("b"));

        assert!(!state.apply(stale, entries(&["old"])));
        assert!(state.entries().is_empty());

        assert!(state.apply(current, entries(&["new"])));
        assert_eq!(state.entries().len(), 1);
        assert_eq!(state.ui_state(), TranscriptUiState::Ready);
    }

    #[test]
    fn first_load_lands_at_bottom() {
        let (state, _) = ready_state(30, 2);

        assert_eq!(state.scroll_offset(), 20);
        assert_eq!(state.autoscroll().mode(), ScrollMode::Pinned);
    }

    #[test]
    fn pinned_view_follows_new_messages() {
        let (mut state, epoch) = ready_state(30, 2);

        let ids: Vec<String> = (0..32).map(|i| format!("m{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        state.apply(epoch, entries(&refs));
        state.update_layout(layout(32, 10));

        assert_eq!(state.scroll_offset(), 22);
        assert_eq!(state.autoscroll().unread_count(), 0);
    }

    #[test]
    fn scrolled_up_view_counts_unread_and_holds_position() {
        let (mut state, epoch) = ready_state(30, 2);
        state.scroll_up(10);
        assert_eq!(state.autoscroll().mode(), ScrollMode::ScrolledUp);

        let ids: Vec<String> = (0..33).map(|i| format!("m{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        state.apply(epoch, entries(&refs));
        state.update_layout(layout(33, 10));

        assert_eq!(state.scroll_offset(), 10);
        assert_eq!(state.autoscroll().unread_count(), 3);

        state.scroll_to_bottom();
        assert_eq!(state.scroll_offset(), 23);
        assert_eq!(state.autoscroll().unread_count(), 0);
        assert_eq!(state.autoscroll().mode(), ScrollMode::Pinned);
    }

    fn idless(timestamps: &[i64]) -> Vec<TranscriptEntry> {
        order_transcript(
            timestamps
                .iter()
                .map(|ts| Message::new(None, Some(*ts), MessagePayload::Text(format!("at {ts}"))))
                .collect(),
        )
    }

    #[test]
    fn older_idless_message_counts_once_while_scrolled_up() {
        let mut state = TranscriptState::with_pin_threshold(2);
        let epoch = state.open(chat("a"));
        let timestamps: Vec<i64> = (10..40).collect();
        state.apply(epoch, idless(&timestamps));
        state.update_layout(layout(30, 10));
        state.scroll_up(15);
        assert_eq!(state.autoscroll().mode(), ScrollMode::ScrolledUp);

        // Lands first, shifting every synthetic key.
        let mut with_older = vec![5];
        with_older.extend(&timestamps);
        state.apply(epoch, idless(&with_older));

        assert_eq!(state.autoscroll().unread_count(), 1);
    }

    #[test]
    fn repeated_idless_text_counts_each_new_copy() {
        let previous = idless(&[1, 2]);
        let mut next_messages: Vec<Message> =
            previous.iter().map(|entry| entry.message.clone()).collect();
        next_messages.push(previous[1].message.clone());

        assert_eq!(count_arrivals(&previous, &order_transcript(next_messages)), 1);
        assert_eq!(count_arrivals(&previous, &previous), 0);
    }

    #[test]
    fn follow_quote_scrolls_to_and_highlights_target() {
        let mut state = TranscriptState::with_pin_threshold(2);
        let epoch = state.open(chat("a"));
        let mut messages: Vec<Message> = (0..20)
            .map(|i: i64| {
                let id = format!("m{i}");
                Message::new(Some(id.as_str()), Some(i), MessagePayload::Text("x".to_owned()))
            })
            .collect();
        messages[19].quoted_id = Some("m3".to_owned());
        state.apply(epoch, order_transcript(messages));
        state.update_layout(layout(20, 5));

        let now = Instant::now();
        assert!(state.follow_quote(now));

        assert_eq!(state.scroll_offset(), 3);
        assert!(state
            .highlight()
            .is_highlighted(&state.entries()[3].key, now));
        assert_eq!(state.autoscroll().mode(), ScrollMode::ScrolledUp);
    }

    #[test]
    fn follow_quote_misses_when_target_not_loaded() {
        let mut state = TranscriptState::default();
        let epoch = state.open(chat("a"));
        let mut message = Message::new(Some("m0"), Some(1), MessagePayload::Text("x".to_owned()));
        message.quoted_id = Some("elsewhere".to_owned());
        state.apply(epoch, order_transcript(vec![message]));
        state.update_layout(layout(1, 5));

        assert!(!state.follow_quote(Instant::now()));
    }

    #[test]
    fn error_does_not_replace_a_loaded_transcript() {
        let (mut state, epoch) = ready_state(3, 2);

        state.set_error(epoch);

        assert_eq!(state.ui_state(), TranscriptUiState::Ready);
    }
}
