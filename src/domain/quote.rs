//! Quoted-message lookup and jump-to-message highlighting.

use std::time::{Duration, Instant};

use super::{
    message::Message,
    ordering::{RenderKey, TranscriptEntry},
};

/// How long a jumped-to message stays highlighted.
pub const HIGHLIGHT_DURATION: Duration = Duration::from_secs(2);

/// Finds the message `message` replies to within the loaded window.
///
/// Returns `None` when there is no reference, the reference is empty, the
/// target is not loaded, or the target is a key-distribution placeholder.
pub fn resolve_quote<'a, I>(message: &Message, transcript: I) -> Option<&'a Message>
where
    I: IntoIterator<Item = &'a Message>,
{
    let quoted_id = message.quoted_id.as_deref().filter(|id| !id.is_empty())?;

    transcript.into_iter().find(|candidate| {
        candidate.id.as_deref() == Some(quoted_id) && !candidate.payload.is_key_distribution()
    })
}

/// One-line preview of a quoted message.
pub fn quote_preview(quoted: &Message, max_chars: usize) -> String {
    let content = quoted
        .display_content()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if content.chars().count() <= max_chars {
        return content;
    }

    let truncated: String = content.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{truncated}...")
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveHighlight {
    key: RenderKey,
    until: Instant,
}

/// Tracks the transient highlight applied after jumping to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteHighlight {
    active: Option<ActiveHighlight>,
}

impl QuoteHighlight {
    /// Locates the entry bound to `message_id` and highlights it until
    /// `now + HIGHLIGHT_DURATION`. Returns the entry index to bring into view,
    /// or `None` when nothing is bound to that identifier.
    pub fn jump_to(
        &mut self,
        message_id: &str,
        entries: &[TranscriptEntry],
        now: Instant,
    ) -> Option<usize> {
        let index = entries
            .iter()
            .position(|entry| entry.message.id.as_deref() == Some(message_id))?;

        self.active = Some(ActiveHighlight {
            key: entries[index].key.clone(),
            until: now + HIGHLIGHT_DURATION,
        });

        Some(index)
    }

    pub fn is_highlighted(&self, key: &RenderKey, now: Instant) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| &active.key == key && now < active.until)
    }

    /// Drops an expired highlight. Returns true when one was removed.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.active.as_ref().is_some_and(|active| now >= active.until) {
            self.active = None;
            return true;
        }

        false
    }

    pub fn clear(&mut self) {
        self.active = None;
    }
}
