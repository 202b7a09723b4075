//! Ordering and dedup view over a reconciled transcript.

use std::collections::HashMap;
use std::fmt;

use super::message::Message;

/// Render identity of a transcript entry.
///
/// Synthetic keys are only stable within a single pass: they depend on the
/// entry's position after sorting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RenderKey {
    Id(String),
    Synthetic { timestamp: i64, index: usize },
}

impl fmt::Display for RenderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => f.write_str(id),
            Self::Synthetic { timestamp, index } => write!(f, "{timestamp}-{index}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub key: RenderKey,
    pub message: Message,
}

/// Seconds used for ordering; missing timestamps count as the epoch.
pub fn sort_timestamp(message: &Message) -> i64 {
    message.timestamp.unwrap_or(0)
}

/// Produces the visible transcript: placeholders removed, duplicates
/// collapsed, stable ascending order by timestamp, one render key per entry.
pub fn order_transcript(messages: Vec<Message>) -> Vec<TranscriptEntry> {
    let mut ordered = dedup_by_id(
        messages
            .into_iter()
            .filter(|message| !message.payload.is_key_distribution())
            .collect(),
    );

    // `sort_by_key` is stable, so equal timestamps keep their input order.
    ordered.sort_by_key(sort_timestamp);

    ordered
        .into_iter()
        .enumerate()
        .map(|(index, message)| {
            let key = match message.id.as_deref().filter(|id| !id.is_empty()) {
                Some(id) => RenderKey::Id(id.to_owned()),
                None => RenderKey::Synthetic {
                    timestamp: sort_timestamp(&message),
                    index,
                },
            };
            TranscriptEntry { key, message }
        })
        .collect()
}

/// Collapses messages sharing an identifier. The first occurrence keeps its
/// slot; the last copy's content replaces it.
fn dedup_by_id(messages: Vec<Message>) -> Vec<Message> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Message> = Vec::with_capacity(messages.len());

    for message in messages {
        let Some(id) = message.id.clone().filter(|id| !id.is_empty()) else {
            unique.push(message);
            continue;
        };

        match slots.get(&id) {
            Some(&slot) => unique[slot] = message,
            None => {
                slots.insert(id, unique.len());
                unique.push(message);
            }
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::MessagePayload;

    fn msg(id: Option<&str>, timestamp: Option<i64>, body: &str) -> Message {
        Message::new(id, timestamp, MessagePayload::Text(body.to_owned()))
    }

    fn bodies(entries: &[TranscriptEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| entry.message.display_content())
            .collect()
    }

    #[test]
    fn missing_timestamps_sort_first_and_keep_relative_order() {
        let entries = order_transcript(vec![
            msg(Some("a"), None, "first-missing"),
            msg(Some("b"), Some(100), "hundred"),
            msg(Some("c"), Some(50), "fifty"),
            msg(Some("d"), None, "second-missing"),
        ]);

        assert_eq!(
            bodies(&entries),
            vec!["first-missing", "second-missing", "fifty", "hundred"]
        );
    }

    #[test]
    fn equal_timestamps_preserve_input_order() {
        let entries = order_transcript(vec![
            msg(Some("x"), Some(7), "x"),
            msg(Some("y"), Some(7), "y"),
            msg(Some("z"), Some(3), "z"),
        ]);

        assert_eq!(bodies(&entries), vec!["z", "x", "y"]);
    }

    #[test]
    fn key_distribution_placeholders_are_removed() {
        let entries = order_transcript(vec![
            msg(Some("a"), Some(1), "hello"),
            Message::new(Some("k"), Some(2), MessagePayload::KeyDistribution),
        ]);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, RenderKey::Id("a".to_owned()));
    }

    #[test]
    fn identifier_less_messages_get_synthetic_keys_from_position() {
        let entries = order_transcript(vec![
            msg(Some("a"), Some(20), "has id"),
            msg(None, Some(10), "no id"),
            msg(Some(""), None, "empty id"),
        ]);

        assert_eq!(
            entries[0].key,
            RenderKey::Synthetic {
                timestamp: 0,
                index: 0
            }
        );
        assert_eq!(entries[1].key.to_string(), "10-1");
        assert_eq!(entries[2].key.to_string(), "a");
    }

    #[test]
    fn duplicate_identifiers_collapse_to_latest_copy() {
        let entries = order_transcript(vec![
            msg(Some("a"), Some(1), "stale"),
            msg(Some("b"), Some(2), "other"),
            msg(Some("a"), Some(1), "fresh"),
        ]);

        assert_eq!(bodies(&entries), vec!["fresh", "other"]);
    }

    #[test]
    fn empty_input_yields_empty_view() {
        assert!(order_transcript(Vec::new()).is_empty());
    }
}
