//! Transcript rendering.
//!
//! Turns reconciled entries into pre-wrapped lines so the view knows exactly
//! which line every entry starts on:
//! - header line with time, sender and delivery marker
//! - quoted-message preview for replies
//! - wrapped body
//! - aggregated reactions
//! - date separators between days

use std::time::Instant;

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

use crate::domain::{
    chat::{display_name, Contact},
    message::{Message, Reaction},
    ordering::TranscriptEntry,
    quote::{quote_preview, resolve_quote, QuoteHighlight},
};

use super::styles;

const INDENT: &str = "      ";
const MIN_BODY_WIDTH: usize = 10;
const QUOTE_PREVIEW_CHARS: usize = 60;

#[derive(Debug, Default)]
pub struct RenderedTranscript {
    pub lines: Vec<Line<'static>>,
    /// First line of each entry, in entry order.
    pub entry_line_starts: Vec<usize>,
}

pub fn render_transcript(
    entries: &[TranscriptEntry],
    contacts: &[Contact],
    highlight: &QuoteHighlight,
    now: Instant,
    width: usize,
) -> RenderedTranscript {
    let body_width = width.saturating_sub(INDENT.len()).max(MIN_BODY_WIDTH);
    let mut rendered = RenderedTranscript::default();
    let mut previous_date: Option<NaiveDate> = None;

    for entry in entries {
        let message = &entry.message;
        let local_time = message.timestamp.and_then(local_datetime);

        if let Some(date) = local_time.map(|time| time.date_naive()) {
            if previous_date != Some(date) {
                rendered.lines.push(date_separator_line(date));
                previous_date = Some(date);
            }
        }

        rendered.entry_line_starts.push(rendered.lines.len());

        let mut lines = vec![header_line(message, local_time, contacts)];
        // Unresolvable replies render as plain messages.
        if let Some(quoted) = resolve_quote(message, entries.iter().map(|entry| &entry.message)) {
            lines.push(quote_line(quoted, contacts));
        }
        lines.extend(body_lines(message, body_width));
        if let Some(reactions) = message.reactions.as_deref() {
            lines.push(reactions_line(reactions));
        }

        if highlight.is_highlighted(&entry.key, now) {
            lines = lines
                .into_iter()
                .map(|line| line.patch_style(styles::highlight_style()))
                .collect();
        }
        rendered.lines.extend(lines);
    }

    rendered
}

fn header_line(
    message: &Message,
    local_time: Option<DateTime<Local>>,
    contacts: &[Contact],
) -> Line<'static> {
    let time = local_time
        .map(|time| time.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_owned());

    let (sender, sender_style) = if message.from_me {
        ("You".to_owned(), styles::own_sender_style())
    } else {
        (sender_name(message, contacts), styles::message_sender_style())
    };

    let mut spans = vec![
        Span::styled(format!("{time:>5} "), styles::message_time_style()),
        Span::styled(sender, sender_style),
    ];
    if message.from_me {
        if let Some(status) = message.latest_status() {
            spans.push(Span::styled(
                format!(" {}", status.marker()),
                styles::delivery_status_style(),
            ));
        }
    }

    Line::from(spans)
}

fn sender_name(message: &Message, contacts: &[Contact]) -> String {
    if let Some(participant) = message.participant.as_deref() {
        let name = display_name(participant, contacts);
        if name != participant.split('@').next().unwrap_or(participant) {
            return name.to_owned();
        }
        if let Some(push_name) = message.push_name.as_deref().filter(|name| !name.is_empty()) {
            return push_name.to_owned();
        }
        return name.to_owned();
    }

    message
        .push_name
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| display_name(&message.remote_jid, contacts).to_owned())
}

fn quote_line(quoted: &Message, contacts: &[Contact]) -> Line<'static> {
    let author = if quoted.from_me {
        "You".to_owned()
    } else {
        sender_name(quoted, contacts)
    };
    let text = format!("\u{2502} {author}: {}", quote_preview(quoted, QUOTE_PREVIEW_CHARS));

    Line::from(vec![
        Span::raw(INDENT),
        Span::styled(text, styles::quote_style()),
    ])
}

fn body_lines(message: &Message, width: usize) -> Vec<Line<'static>> {
    let label = message.payload.label();
    let body = message.payload.body();

    let mut lines = Vec::new();
    if let Some(label) = label {
        lines.push(Line::from(vec![
            Span::raw(INDENT),
            Span::styled(label, styles::message_media_style()),
        ]));
    }

    for paragraph in body.lines() {
        for chunk in wrap_text(paragraph, width) {
            lines.push(Line::from(vec![
                Span::raw(INDENT),
                Span::styled(chunk, styles::message_text_style()),
            ]));
        }
    }

    if lines.is_empty() {
        lines.push(Line::from(vec![
            Span::raw(INDENT),
            Span::styled("[Empty message]", styles::message_media_style()),
        ]));
    }

    lines
}

/// Emoji with their counts, in order of first appearance.
fn reactions_line(reactions: &[Reaction]) -> Line<'static> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for reaction in reactions {
        match counts.iter_mut().find(|(emoji, _)| *emoji == reaction.emoji) {
            Some((_, count)) => *count += 1,
            None => counts.push((&reaction.emoji, 1)),
        }
    }

    let summary = counts
        .into_iter()
        .map(|(emoji, count)| match count {
            1 => emoji.to_owned(),
            count => format!("{emoji} {count}"),
        })
        .collect::<Vec<_>>()
        .join("  ");

    Line::from(vec![
        Span::raw(INDENT),
        Span::styled(summary, styles::reaction_style()),
    ])
}

fn date_separator_line(date: NaiveDate) -> Line<'static> {
    Line::from(Span::styled(
        format!("\u{2500}\u{2500}\u{2500} {} \u{2500}\u{2500}\u{2500}", date.format("%-d %b %Y")),
        styles::date_separator_style(),
    ))
    .centered()
}

/// Greedy word wrap by display width; words wider than `width` are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in text.split(' ') {
        let word_width = display_width(word);
        let separator = usize::from(!current.is_empty());

        if current_width + separator + word_width <= width {
            if separator == 1 {
                current.push(' ');
            }
            current.push_str(word);
            current_width += separator + word_width;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }

        for ch in word.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if current_width + ch_width > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(ch);
            current_width += ch_width;
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }

    lines
}

fn display_width(text: &str) -> usize {
    text.chars().map(|ch| ch.width().unwrap_or(0)).sum()
}

fn local_datetime(timestamp: i64) -> Option<DateTime<Local>> {
    match Local.timestamp_opt(timestamp, 0) {
        chrono::LocalResult::Single(time) => Some(time),
        chrono::LocalResult::Ambiguous(time, _) => Some(time),
        chrono::LocalResult::None => None,
    }
}
