//! Style definitions for the UI components.

use ratatui::style::{Color, Modifier, Style};

use crate::domain::{instance::ConnectionStatus, toast::ToastKind};

// =============================================================================
// Panes
// =============================================================================

pub fn pane_border_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

pub fn selected_row_style() -> Style {
    Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
}

/// Placeholder text for loading, empty and error panes.
pub fn placeholder_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

// =============================================================================
// Instance and chat lists
// =============================================================================

pub fn instance_status_style(status: ConnectionStatus) -> Style {
    let color = match status {
        ConnectionStatus::Open => Color::Green,
        ConnectionStatus::Connecting => Color::Yellow,
        ConnectionStatus::Close => Color::Red,
        ConnectionStatus::Unknown => Color::DarkGray,
    };
    Style::default().fg(color)
}

pub fn chat_name_style() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

pub fn chat_preview_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn unread_count_style() -> Style {
    Style::default().fg(Color::Green)
}

// =============================================================================
// Transcript
// =============================================================================

pub fn message_time_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn message_sender_style() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

pub fn own_sender_style() -> Style {
    Style::default()
        .fg(Color::Green)
        .add_modifier(Modifier::BOLD)
}

pub fn message_text_style() -> Style {
    Style::default().fg(Color::White)
}

/// Payload labels like [Image], [Audio].
pub fn message_media_style() -> Style {
    Style::default().fg(Color::Cyan)
}

pub fn quote_style() -> Style {
    Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::ITALIC)
}

pub fn reaction_style() -> Style {
    Style::default().fg(Color::Yellow)
}

pub fn delivery_status_style() -> Style {
    Style::default().fg(Color::Blue)
}

/// Applied to the message reached through a reply jump.
pub fn highlight_style() -> Style {
    Style::default().bg(Color::Rgb(60, 60, 20))
}

pub fn date_separator_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn jump_control_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

// =============================================================================
// Composer and status line
// =============================================================================

pub fn input_prompt_style() -> Style {
    Style::default().fg(Color::Cyan)
}

pub fn input_placeholder_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn toast_style(kind: ToastKind) -> Style {
    match kind {
        ToastKind::Info => Style::default().fg(Color::Green),
        ToastKind::Error => Style::default()
            .fg(Color::Red)
            .add_modifier(Modifier::BOLD),
    }
}

pub fn status_hint_style() -> Style {
    Style::default().fg(Color::DarkGray)
}
