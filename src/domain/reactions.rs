//! Folds reaction pseudo-messages onto the messages they target.
//!
//! Reactions are recomputed from scratch on every pass. For each target only
//! the most recent reaction survives; an empty glyph is a retraction and
//! leaves the target with an empty reaction list.

use std::collections::{HashMap, HashSet};

use super::message::{Message, MessagePayload, Reaction};

/// Removes reaction messages from `messages` and attaches the latest reaction
/// state to each message they target.
///
/// Reactions without a target id, or whose target is not in the window, are
/// dropped. Messages nobody reacted to pass through untouched.
pub fn fold_reactions(messages: Vec<Message>) -> Vec<Message> {
    let mut latest: HashMap<String, Reaction> = HashMap::new();
    let mut visible = Vec::with_capacity(messages.len());

    for message in messages {
        let MessagePayload::Reaction(payload) = &message.payload else {
            visible.push(message);
            continue;
        };

        let Some(target_id) = payload.target_id.as_deref().filter(|id| !id.is_empty()) else {
            tracing::trace!(message_id = ?message.id, "reaction without target skipped");
            continue;
        };

        let candidate = Reaction {
            emoji: payload.emoji.clone(),
            sender: message.sender_id(),
            message_id: target_id.to_owned(),
            timestamp_ms: payload.sender_timestamp_ms,
        };

        let replaces = latest
            .get(target_id)
            .map_or(true, |current| is_newer(&candidate, current));
        if replaces {
            latest.insert(target_id.to_owned(), candidate);
        }
    }

    for message in &mut visible {
        let Some(id) = message.id.as_deref() else {
            continue;
        };

        if let Some(reaction) = latest.get(id) {
            message.reactions = Some(if reaction.emoji.is_empty() {
                Vec::new()
            } else {
                vec![reaction.clone()]
            });
        }
    }

    let visible_ids: HashSet<&str> = visible.iter().filter_map(|m| m.id.as_deref()).collect();
    let orphaned = latest
        .keys()
        .filter(|target| !visible_ids.contains(target.as_str()))
        .count();
    if orphaned > 0 {
        tracing::debug!(
            orphaned,
            "reactions targeting messages outside the loaded window dropped"
        );
    }

    visible
}

/// Strictly newer wins so that ties keep the first reaction seen.
/// A missing timestamp ranks below any present one.
fn is_newer(candidate: &Reaction, current: &Reaction) -> bool {
    match (candidate.timestamp_ms, current.timestamp_ms) {
        (Some(candidate), Some(current)) => candidate > current,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::ReactionPayload;

    fn text(id: &str, body: &str) -> Message {
        Message::new(Some(id), Some(10), MessagePayload::Text(body.to_owned()))
    }

    fn reaction(id: &str, target: &str, emoji: &str, ts_ms: Option<i64>) -> Message {
        let mut message = Message::new(
            Some(id),
            Some(11),
            MessagePayload::Reaction(ReactionPayload {
                target_id: Some(target.to_owned()),
                emoji: emoji.to_owned(),
                sender_timestamp_ms: ts_ms,
            }),
        );
        message.remote_jid = "555@s.whatsapp.net".to_owned();
        message
    }

    #[test]
    fn empty_glyph_retracts_earlier_reaction() {
        let folded = fold_reactions(vec![
            text("A", "hello"),
            reaction("r1", "A", "👍", Some(1)),
            reaction("r2", "A", "", Some(2)),
        ]);

        assert_eq!(folded.len(), 1);
        assert_eq!(folded[0].id.as_deref(), Some("A"));
        assert_eq!(folded[0].reactions, Some(vec![]));
    }

    #[test]
    fn latest_reaction_wins_regardless_of_input_order() {
        let folded = fold_reactions(vec![
            text("B", "hello"),
            reaction("r1", "B", "❤️", Some(5)),
            reaction("r2", "B", "👍", Some(3)),
        ]);

        let reactions = folded[0].reactions.as_ref().expect("B must carry reactions");
        assert_eq!(reactions.len(), 1);
        assert_eq!(reactions[0].emoji, "❤️");
        assert_eq!(reactions[0].message_id, "B");
        assert_eq!(reactions[0].sender, "555@s.whatsapp.net");
        assert_eq!(reactions[0].timestamp_ms, Some(5));
    }

    #[test]
    fn orphan_reaction_is_dropped_without_touching_other_messages() {
        let folded = fold_reactions(vec![
            text("A", "one"),
            reaction("r1", "missing", "👍", Some(1)),
            text("B", "two"),
        ]);

        assert_eq!(folded.len(), 2);
        assert!(folded.iter().all(|message| message.reactions.is_none()));
    }

    #[test]
    fn large_window_folds_present_targets_and_drops_missing_ones() {
        let mut messages: Vec<Message> = (0..500)
            .map(|i| text(&format!("m{i}"), "body"))
            .collect();
        messages.push(reaction("r1", "m499", "👍", Some(1)));
        messages.push(reaction("r2", "gone", "😂", Some(2)));

        let folded = fold_reactions(messages);

        assert_eq!(folded.len(), 500);
        assert_eq!(
            folded[499].reactions.as_ref().map(|r| r[0].emoji.as_str()),
            Some("👍")
        );
        assert_eq!(folded.iter().filter(|m| m.reactions.is_some()).count(), 1);
    }

    #[test]
    fn messages_without_reactions_pass_through_unchanged() {
        let original = vec![text("A", "one"), text("B", "two")];

        assert_eq!(fold_reactions(original.clone()), original);
    }

    #[test]
    fn reaction_without_timestamp_ranks_last() {
        let folded = fold_reactions(vec![
            text("A", "one"),
            reaction("r1", "A", "🔥", None),
            reaction("r2", "A", "👍", Some(1)),
        ]);

        assert_eq!(
            folded[0].reactions.as_ref().map(|r| r[0].emoji.as_str()),
            Some("👍")
        );
    }

    #[test]
    fn equal_timestamps_keep_the_first_reaction() {
        let folded = fold_reactions(vec![
            text("A", "one"),
            reaction("r1", "A", "👍", Some(4)),
            reaction("r2", "A", "😂", Some(4)),
        ]);

        assert_eq!(
            folded[0].reactions.as_ref().map(|r| r[0].emoji.as_str()),
            Some("👍")
        );
    }

    #[test]
    fn reaction_with_empty_target_is_skipped() {
        let mut broken = reaction("r1", "", "👍", Some(1));
        if let MessagePayload::Reaction(payload) = &mut broken.payload {
            payload.target_id = Some(String::new());
        }

        let folded = fold_reactions(vec![text("A", "one"), broken]);

        assert_eq!(folded.len(), 1);
        assert!(folded[0].reactions.is_none());
    }

    #[test]
    fn reaction_targeting_a_later_message_still_folds() {
        let folded = fold_reactions(vec![reaction("r1", "Z", "👀", Some(9)), text("Z", "late")]);

        assert_eq!(folded.len(), 1);
        assert_eq!(
            folded[0].reactions.as_ref().map(|r| r[0].emoji.as_str()),
            Some("👀")
        );
    }
}
