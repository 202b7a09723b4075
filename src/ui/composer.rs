//! Composer rendering.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::domain::{composer_state::ComposerState, shell_state::ActivePane};

use super::styles;

const PLACEHOLDER_TEXT: &str = "Press 'i' to write, 'R' to reply to the focused message";
const PROMPT_SYMBOL: &str = "> ";

pub fn render_composer(
    frame: &mut Frame<'_>,
    area: Rect,
    composer: &ComposerState,
    active_pane: ActivePane,
) {
    let is_focused = active_pane == ActivePane::Composer;

    let title = composer_title(composer);
    let paragraph = Paragraph::new(build_input_line(composer, is_focused)).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(styles::pane_border_style(is_focused)),
    );
    frame.render_widget(paragraph, area);

    if is_focused {
        let before_cursor: String = composer.text().chars().take(composer.cursor()).collect();
        let offset = PROMPT_SYMBOL.width() + before_cursor.width();
        let cursor_x = area
            .x
            .saturating_add(1)
            .saturating_add(u16::try_from(offset).unwrap_or(u16::MAX));
        frame.set_cursor_position((cursor_x, area.y.saturating_add(1)));
    }
}

fn composer_title(composer: &ComposerState) -> String {
    let title = match composer.reply_to() {
        Some(reply) => format!("Reply to: {}", reply.preview),
        None => "Message".to_owned(),
    };

    if composer.is_sending() {
        format!("{title} (sending...)")
    } else {
        title
    }
}

fn build_input_line(composer: &ComposerState, is_focused: bool) -> Line<'static> {
    let prompt = Span::styled(PROMPT_SYMBOL, styles::input_prompt_style());

    if composer.is_empty() && !is_focused {
        return Line::from(vec![
            prompt,
            Span::styled(PLACEHOLDER_TEXT, styles::input_placeholder_style()),
        ]);
    }

    Line::from(vec![
        prompt,
        Span::styled(composer.text().to_owned(), styles::message_text_style()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn shows_placeholder_when_empty_and_unfocused() {
        let text = line_text(&build_input_line(&ComposerState::default(), false));

        assert!(text.starts_with(PROMPT_SYMBOL));
        assert!(text.contains(PLACEHOLDER_TEXT));
    }

    #[test]
    fn shows_bare_prompt_when_focused_and_empty() {
        let text = line_text(&build_input_line(&ComposerState::default(), true));

        assert_eq!(text, PROMPT_SYMBOL);
    }

    #[test]
    fn shows_draft_when_unfocused() {
        let mut composer = ComposerState::default();
        composer.insert('H');
        composer.insert('i');

        let text = line_text(&build_input_line(&composer, false));

        assert_eq!(text, "> Hi");
    }

    #[test]
    fn title_marks_draft_in_flight() {
        let mut composer = ComposerState::default();
        composer.insert('x');
        assert_eq!(composer_title(&composer), "Message");

        composer.begin_send();
        assert_eq!(composer_title(&composer), "Message (sending...)");
    }
}
