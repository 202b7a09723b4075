//! Selection state shared by the instance and chat panes.

use super::{chat::ChatSummary, instance::Instance};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListUiState {
    Loading,
    Ready,
    Empty,
    Error,
}

/// Identity used to keep the selection across refreshes.
pub trait ListKey {
    fn list_key(&self) -> &str;
}

impl ListKey for Instance {
    fn list_key(&self) -> &str {
        &self.name
    }
}

impl ListKey for ChatSummary {
    fn list_key(&self) -> &str {
        &self.remote_jid
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectableList<T> {
    ui_state: ListUiState,
    items: Vec<T>,
    selected_index: Option<usize>,
}

pub type InstanceListState = SelectableList<Instance>;
pub type ChatListState = SelectableList<ChatSummary>;

impl<T> Default for SelectableList<T> {
    fn default() -> Self {
        Self {
            ui_state: ListUiState::Loading,
            items: Vec::new(),
            selected_index: None,
        }
    }
}

impl<T: ListKey> SelectableList<T> {
    pub fn ui_state(&self) -> ListUiState {
        self.ui_state
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn selected(&self) -> Option<&T> {
        self.selected_index.and_then(|index| self.items.get(index))
    }

    pub fn set_loading(&mut self) {
        self.ui_state = ListUiState::Loading;
        self.items.clear();
        self.selected_index = None;
    }

    /// Replaces the items, keeping the selection on the same key if it is
    /// still present.
    pub fn set_ready(&mut self, items: Vec<T>) {
        if items.is_empty() {
            self.set_empty();
            return;
        }

        let previous_key = self.selected().map(|item| item.list_key().to_owned());
        self.ui_state = ListUiState::Ready;
        self.items = items;
        self.selected_index = previous_key
            .and_then(|key| self.items.iter().position(|item| item.list_key() == key))
            .or(Some(0));
    }

    pub fn set_empty(&mut self) {
        self.ui_state = ListUiState::Empty;
        self.items.clear();
        self.selected_index = None;
    }

    pub fn set_error(&mut self) {
        self.ui_state = ListUiState::Error;
        self.items.clear();
        self.selected_index = None;
    }

    pub fn select_next(&mut self) {
        let Some(index) = self.selected_index else {
            return;
        };

        let last_index = self.items.len().saturating_sub(1);
        self.selected_index = Some(index.saturating_add(1).min(last_index));
    }

    pub fn select_previous(&mut self) {
        let Some(index) = self.selected_index else {
            return;
        };

        self.selected_index = Some(index.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(remote_jid: &str, title: &str) -> ChatSummary {
        ChatSummary {
            remote_jid: remote_jid.to_owned(),
            title: title.to_owned(),
            avatar_url: None,
            unread_count: 0,
            last_message_preview: None,
            last_message_unix: None,
        }
    }

    #[test]
    fn default_state_is_loading_without_selection() {
        let state = ChatListState::default();

        assert_eq!(state.ui_state(), ListUiState::Loading);
        assert!(state.items().is_empty());
        assert_eq!(state.selected_index(), None);
    }

    #[test]
    fn set_ready_with_data_selects_first_item() {
        let mut state = ChatListState::default();

        state.set_ready(vec![chat("1", "General"), chat("2", "Backend")]);

        assert_eq!(state.ui_state(), ListUiState::Ready);
        assert_eq!(
            state.selected().map(|item| item.remote_jid.as_str()),
            Some("1")
        );
    }

    #[test]
    fn set_ready_with_empty_list_transitions_to_empty_state() {
        let mut state = InstanceListState::default();

        state.set_ready(vec![]);

        assert_eq!(state.ui_state(), ListUiState::Empty);
        assert_eq!(state.selected_index(), None);
    }

    #[test]
    fn set_error_clears_items_and_selection() {
        let mut state = InstanceListState::default();
        state.set_ready(vec![Instance::named("main")]);

        state.set_error();

        assert_eq!(state.ui_state(), ListUiState::Error);
        assert!(state.items().is_empty());
        assert_eq!(state.selected_index(), None);
    }

    #[test]
    fn selection_moves_within_bounds() {
        let mut state = ChatListState::default();
        state.set_ready(vec![chat("1", "General"), chat("2", "Backend")]);

        state.select_next();
        state.select_next();
        assert_eq!(state.selected_index(), Some(1));

        state.select_previous();
        state.select_previous();
        assert_eq!(state.selected_index(), Some(0));
    }

    #[test]
    fn set_ready_preserves_selection_by_key() {
        let mut state = InstanceListState::default();
        state.set_ready(vec![
            Instance::named("a"),
            Instance::named("b"),
            Instance::named("c"),
        ]);
        state.select_next();

        state.set_ready(vec![
            Instance::named("x"),
            Instance::named("b"),
            Instance::named("y"),
        ]);

        assert_eq!(state.selected().map(|i| i.name.as_str()), Some("b"));
        assert_eq!(state.selected_index(), Some(1));
    }

    #[test]
    fn set_ready_falls_back_to_first_when_selection_disappears() {
        let mut state = ChatListState::default();
        state.set_ready(vec![chat("1", "General"), chat("2", "Backend")]);
        state.select_next();

        state.set_ready(vec![chat("10", "Infra"), chat("11", "Design")]);

        assert_eq!(state.selected_index(), Some(0));
    }
}
