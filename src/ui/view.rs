use std::time::Instant;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::domain::{
    chat::ChatSummary,
    instance::Instance,
    list_state::{ListKey, ListUiState, SelectableList},
    shell_state::{ActivePane, ShellState},
    transcript_state::{TranscriptLayout, TranscriptUiState},
};

use super::{composer::render_composer, styles, transcript_rendering::render_transcript};

pub fn render(frame: &mut Frame<'_>, state: &mut ShellState, now: Instant) {
    let [content_area, status_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .areas(frame.area());

    let [instances_area, chats_area, conversation_area] = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(20),
            Constraint::Percentage(28),
            Constraint::Percentage(52),
        ])
        .areas(content_area);

    // Composer: 1 border + 1 text + 1 border.
    let [transcript_area, composer_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .areas(conversation_area);

    let active_pane = state.active_pane();
    render_instances_panel(frame, instances_area, state, active_pane);
    render_chats_panel(frame, chats_area, state, active_pane);
    render_transcript_panel(frame, transcript_area, state, active_pane, now);
    render_composer(frame, composer_area, state.composer(), active_pane);

    frame.render_widget(Paragraph::new(status_line(state)), status_area);
}

fn render_instances_panel(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &ShellState,
    active_pane: ActivePane,
) {
    let instances = state.instances();
    let title = format!("Instances ({})", instances.items().len());
    let items = instances.items().iter().map(instance_item).collect();

    render_list_panel(
        frame,
        area,
        ListPanel {
            title,
            list: instances,
            items,
            active: active_pane == ActivePane::Instances,
            empty_text: "No instances on this server.",
            loading_text: "Loading instances...",
        },
    );
}

fn render_chats_panel(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &ShellState,
    active_pane: ActivePane,
) {
    let Some(instance) = state.chats_instance() else {
        let panel = Paragraph::new(Span::styled(
            "Select an instance to list its chats",
            styles::placeholder_style(),
        ))
        .block(panel_block("Chats".to_owned(), active_pane == ActivePane::Chats));
        frame.render_widget(panel, area);
        return;
    };

    let chats = state.chats();
    let inner_width = usize::from(area.width.saturating_sub(2));
    let items = chats
        .items()
        .iter()
        .map(|chat| ListItem::new(chat_item_line(chat, inner_width)))
        .collect();

    render_list_panel(
        frame,
        area,
        ListPanel {
            title: format!("Chats \u{00B7} {instance}"),
            list: chats,
            items,
            active: active_pane == ActivePane::Chats,
            empty_text: "No chats yet.",
            loading_text: "Loading chats...",
        },
    );
}

struct ListPanel<'a, T> {
    title: String,
    list: &'a SelectableList<T>,
    items: Vec<ListItem<'static>>,
    active: bool,
    empty_text: &'static str,
    loading_text: &'static str,
}

fn render_list_panel<T: ListKey>(frame: &mut Frame<'_>, area: Rect, panel: ListPanel<'_, T>) {
    let placeholder = match panel.list.ui_state() {
        ListUiState::Loading => Some(panel.loading_text),
        ListUiState::Empty => Some(panel.empty_text),
        ListUiState::Error => Some("Failed to load. Press r to retry."),
        ListUiState::Ready => None,
    };

    let block = panel_block(panel.title, panel.active);
    if let Some(text) = placeholder {
        let paragraph =
            Paragraph::new(Span::styled(text, styles::placeholder_style())).block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let list = List::new(panel.items)
        .block(block)
        .highlight_style(styles::selected_row_style());
    let mut list_state = ListState::default();
    list_state.select(panel.list.selected_index());
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn instance_item(instance: &Instance) -> ListItem<'static> {
    ListItem::new(Line::from(vec![
        Span::styled("\u{25CF} ", styles::instance_status_style(instance.status)),
        Span::styled(instance.name.clone(), styles::chat_name_style()),
        Span::styled(
            format!(" {}", instance.status.label()),
            styles::chat_preview_style(),
        ),
    ]))
}

fn chat_item_line(chat: &ChatSummary, width: usize) -> Line<'static> {
    let badge = match chat.unread_count {
        0 => String::new(),
        count => format!(" [{count}]"),
    };
    let preview = chat
        .last_message_preview
        .as_deref()
        .map(|preview| preview.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|preview| !preview.is_empty())
        .unwrap_or_else(|| "No messages yet".to_owned());

    let used = chat.title.width() + 1 + badge.width();
    let preview = truncate_to_width(&preview, width.saturating_sub(used));

    let mut spans = vec![
        Span::styled(chat.title.clone(), styles::chat_name_style()),
        Span::raw(" "),
        Span::styled(preview, styles::chat_preview_style()),
    ];
    if !badge.is_empty() {
        spans.push(Span::styled(badge, styles::unread_count_style()));
    }

    Line::from(spans)
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_owned();
    }

    let mut truncated = String::new();
    for ch in text.chars() {
        let candidate = format!("{truncated}{ch}...");
        if candidate.width() > width {
            break;
        }
        truncated.push(ch);
    }

    if truncated.is_empty() {
        return String::new();
    }
    format!("{truncated}...")
}

fn render_transcript_panel(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &mut ShellState,
    active_pane: ActivePane,
    now: Instant,
) {
    let active = active_pane == ActivePane::Transcript;
    let transcript = state.transcript();
    let title = match transcript.chat() {
        Some(chat) => format!("Transcript \u{00B7} {}", chat.title),
        None => "Transcript".to_owned(),
    };

    let placeholder = match transcript.ui_state() {
        TranscriptUiState::Empty if !transcript.is_open() => {
            Some("Select a chat to view messages")
        }
        TranscriptUiState::Empty => Some("No messages in this chat"),
        TranscriptUiState::Ready if transcript.entries().is_empty() => {
            Some("No messages in this chat")
        }
        TranscriptUiState::Loading => Some("Loading messages..."),
        TranscriptUiState::Error => Some("Failed to load messages. Retrying..."),
        TranscriptUiState::Ready => None,
    };
    if let Some(text) = placeholder {
        let paragraph = Paragraph::new(Span::styled(text, styles::placeholder_style()))
            .block(panel_block(title, active));
        frame.render_widget(paragraph, area);
        return;
    }

    let inner_width = usize::from(area.width.saturating_sub(2));
    let viewport_height = usize::from(area.height.saturating_sub(2));
    let rendered = render_transcript(
        transcript.entries(),
        transcript.contacts(),
        transcript.highlight(),
        now,
        inner_width,
    );

    let transcript = state.transcript_mut();
    transcript.update_layout(TranscriptLayout {
        entry_line_starts: rendered.entry_line_starts,
        total_lines: rendered.lines.len(),
        viewport_height,
    });

    let mut block = panel_block(title, active);
    if transcript.autoscroll().shows_jump_control() {
        block = block.title_bottom(jump_control_line(transcript.autoscroll().unread_badge()));
    }

    let scroll = u16::try_from(transcript.scroll_offset()).unwrap_or(u16::MAX);
    let paragraph = Paragraph::new(rendered.lines)
        .block(block)
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn jump_control_line(unread_badge: Option<String>) -> Line<'static> {
    let text = match unread_badge {
        Some(badge) => format!(" \u{2193} {badge} new \u{00B7} G "),
        None => " \u{2193} G ".to_owned(),
    };

    Line::from(Span::styled(text, styles::jump_control_style())).right_aligned()
}

fn panel_block(title: String, active: bool) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(styles::pane_border_style(active))
}

fn status_line(state: &ShellState) -> Line<'static> {
    if let Some(toast) = state.toast() {
        return Line::from(Span::styled(
            toast.text.clone(),
            styles::toast_style(toast.kind),
        ));
    }

    let hint = match state.active_pane() {
        ActivePane::Instances => "j/k: move | Enter: chats | c: connect | y: copy token | r: refresh | q: quit",
        ActivePane::Chats => "j/k: move | Enter: open | Esc: instances | Tab: next pane | q: quit",
        ActivePane::Transcript => {
            "j/k: scroll | G: bottom | o: follow reply | i: write | R: reply | Esc: chats"
        }
        ActivePane::Composer => "Enter: send | Esc: leave composer",
    };

    let mut spans = Vec::new();
    if !state.server_label().is_empty() {
        spans.push(Span::styled(
            format!("{} | ", state.server_label()),
            styles::chat_name_style(),
        ));
    }
    spans.push(Span::styled(hint, styles::status_hint_style()));

    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use ratatui::{backend::TestBackend, Terminal};

    use super::*;
    use crate::domain::{
        message::{Message, MessagePayload},
        ordering::order_transcript,
        toast::Toast,
        transcript_state::{OpenChat, TranscriptState},
    };

    fn chat(title: &str, unread_count: u32, preview: Option<&str>) -> ChatSummary {
        ChatSummary {
            remote_jid: format!("{title}@s.whatsapp.net"),
            title: title.to_owned(),
            avatar_url: None,
            unread_count,
            last_message_preview: preview.map(ToOwned::to_owned),
            last_message_unix: None,
        }
    }

    fn line_to_string(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    fn draw(state: &mut ShellState, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
        terminal
            .draw(|frame| render(frame, state, Instant::now()))
            .expect("draw");

        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    fn open_chat(state: &mut ShellState, count: usize) {
        let epoch = state.transcript_mut().open(OpenChat {
            instance: "main".to_owned(),
            integration: Default::default(),
            remote_jid: "5511999@s.whatsapp.net".to_owned(),
            title: "Ana".to_owned(),
        });
        let messages = (0..count)
            .map(|index| {
                let id = format!("M{index}");
                Message::new(
                    Some(&id),
                    Some(1_771_070_400 + index as i64),
                    MessagePayload::Text(format!("message {index}")),
                )
            })
            .collect();
        state.transcript_mut().apply(epoch, order_transcript(messages));
    }

    #[test]
    fn chat_item_includes_title_preview_and_badge() {
        let text = line_to_string(&chat_item_line(&chat("General", 3, Some("Hello")), 40));

        assert!(text.contains("General"));
        assert!(text.contains("Hello"));
        assert!(text.contains("[3]"));
    }

    #[test]
    fn chat_item_falls_back_to_placeholder_and_normalizes_whitespace() {
        let blank = line_to_string(&chat_item_line(&chat("General", 0, Some(" \n\t ")), 40));
        let spaced = line_to_string(&chat_item_line(
            &chat("General", 0, Some("  Hello\n\n  from\t\tEvo  ")),
            40,
        ));

        assert!(blank.contains("No messages yet"));
        assert!(!blank.contains("[0]"));
        assert!(spaced.contains("Hello from Evo"));
    }

    #[test]
    fn chat_item_truncates_long_preview() {
        let text = line_to_string(&chat_item_line(
            &chat("Ana", 0, Some("a very long preview that will not fit")),
            20,
        ));

        assert!(text.ends_with("..."));
        assert!(text.width() <= 20);
    }

    #[test]
    fn status_line_prefers_toast() {
        let mut state = ShellState::new("evo.example.com".to_owned(), TranscriptState::default());
        assert!(line_to_string(&status_line(&state)).starts_with("evo.example.com | "));

        state.show_toast(Toast::error("Send failed", Instant::now()));

        assert_eq!(line_to_string(&status_line(&state)), "Send failed");
    }

    #[test]
    fn renders_three_panes_and_placeholders() {
        let mut state = ShellState::default();

        let screen = draw(&mut state, 120, 20);

        assert!(screen.contains("Instances (0)"));
        assert!(screen.contains("Select an instance"));
        assert!(screen.contains("Select a chat to view messages"));
    }

    #[test]
    fn rendering_reports_layout_and_pins_to_bottom() {
        let mut state = ShellState::default();
        open_chat(&mut state, 30);

        let screen = draw(&mut state, 120, 20);

        assert!(screen.contains("message 29"));
        assert!(!screen.contains("message 0 "));
        assert!(state.transcript().scroll_offset() > 0);
        assert_eq!(state.transcript().focused_index(), Some(29));
    }

    #[test]
    fn jump_control_appears_after_scrolling_up() {
        let mut state = ShellState::default();
        open_chat(&mut state, 30);
        draw(&mut state, 120, 20);

        state.transcript_mut().scroll_up(40);
        let screen = draw(&mut state, 120, 20);

        assert!(screen.contains("\u{2193} G"));
    }
}
