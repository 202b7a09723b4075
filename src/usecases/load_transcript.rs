//! Fetches a chat's messages and reconciles them into renderable order.

use crate::domain::{
    instance::IntegrationType,
    message::Message,
    ordering::{order_transcript, TranscriptEntry},
    reactions::fold_reactions,
};

use super::contracts::SourceError;

const DEFAULT_MESSAGES_PAGE_SIZE: usize = 200;
const MAX_MESSAGES_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTranscriptQuery {
    pub instance: String,
    pub remote_jid: String,
    pub integration: IntegrationType,
    pub limit: usize,
}

impl LoadTranscriptQuery {
    pub fn new(
        instance: impl Into<String>,
        remote_jid: impl Into<String>,
        integration: IntegrationType,
    ) -> Self {
        Self {
            instance: instance.into(),
            remote_jid: remote_jid.into(),
            integration,
            limit: DEFAULT_MESSAGES_PAGE_SIZE,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn normalized_limit(&self) -> usize {
        match self.limit {
            0 => DEFAULT_MESSAGES_PAGE_SIZE,
            value if value > MAX_MESSAGES_PAGE_SIZE => MAX_MESSAGES_PAGE_SIZE,
            value => value,
        }
    }
}

pub trait TranscriptSource {
    fn find_messages(
        &self,
        instance: &str,
        remote_jid: &str,
        integration: IntegrationType,
        limit: usize,
    ) -> Result<Vec<Message>, SourceError>;
}

impl<T> TranscriptSource for &T
where
    T: TranscriptSource + ?Sized,
{
    fn find_messages(
        &self,
        instance: &str,
        remote_jid: &str,
        integration: IntegrationType,
        limit: usize,
    ) -> Result<Vec<Message>, SourceError> {
        (*self).find_messages(instance, remote_jid, integration, limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadTranscriptError {
    #[error("the server rejected the API key")]
    Unauthorized,
    #[error("chat or instance not found")]
    ChatNotFound,
    #[error("server temporarily unavailable")]
    TemporarilyUnavailable,
    #[error("server sent messages in an unexpected shape")]
    DataContractViolation,
    #[error("{0}")]
    Rejected(String),
}

/// Fetches normalized messages without reconciling them.
pub fn fetch_messages(
    source: &dyn TranscriptSource,
    query: &LoadTranscriptQuery,
) -> Result<Vec<Message>, LoadTranscriptError> {
    source
        .find_messages(
            &query.instance,
            &query.remote_jid,
            query.integration,
            query.normalized_limit(),
        )
        .map_err(map_source_error)
}

/// Full reconciliation pass: reactions folded onto their targets, then
/// placeholders dropped, duplicates collapsed and entries ordered.
pub fn reconcile(messages: Vec<Message>) -> Vec<TranscriptEntry> {
    order_transcript(fold_reactions(messages))
}

pub fn load_transcript(
    source: &dyn TranscriptSource,
    query: LoadTranscriptQuery,
) -> Result<Vec<TranscriptEntry>, LoadTranscriptError> {
    fetch_messages(source, &query).map(reconcile)
}

fn map_source_error(error: SourceError) -> LoadTranscriptError {
    match error {
        SourceError::Unauthorized => LoadTranscriptError::Unauthorized,
        SourceError::NotFound => LoadTranscriptError::ChatNotFound,
        SourceError::Unavailable => LoadTranscriptError::TemporarilyUnavailable,
        SourceError::InvalidData => LoadTranscriptError::DataContractViolation,
        SourceError::Rejected(message) => LoadTranscriptError::Rejected(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        message::{MessagePayload, ReactionPayload},
        ordering::RenderKey,
    };

    struct StubSource {
        result: Result<Vec<Message>, SourceError>,
        captured: std::sync::Mutex<Option<(String, String, IntegrationType, usize)>>,
    }

    impl StubSource {
        fn with_result(result: Result<Vec<Message>, SourceError>) -> Self {
            Self {
                result,
                captured: std::sync::Mutex::new(None),
            }
        }
    }

    impl TranscriptSource for StubSource {
        fn find_messages(
            &self,
            instance: &str,
            remote_jid: &str,
            integration: IntegrationType,
            limit: usize,
        ) -> Result<Vec<Message>, SourceError> {
            *self.captured.lock().expect("captured lock") = Some((
                instance.to_owned(),
                remote_jid.to_owned(),
                integration,
                limit,
            ));
            self.result.clone()
        }
    }

    fn text(id: &str, timestamp: i64, body: &str) -> Message {
        Message::new(Some(id), Some(timestamp), MessagePayload::Text(body.to_owned()))
    }

    fn reaction(id: &str, target: &str, emoji: &str, at_ms: i64) -> Message {
        Message::new(
            Some(id),
            Some(at_ms / 1000),
            MessagePayload::Reaction(ReactionPayload {
                target_id: Some(target.to_owned()),
                emoji: emoji.to_owned(),
                sender_timestamp_ms: Some(at_ms),
            }),
        )
    }

    fn query() -> LoadTranscriptQuery {
        LoadTranscriptQuery::new("main", "5511999@s.whatsapp.net", IntegrationType::Business)
    }

    #[test]
    fn passes_chat_coordinates_and_limit_to_source() {
        let source = StubSource::with_result(Ok(vec![]));

        let _ = load_transcript(&source, query().with_limit(5000)).expect("load should succeed");

        assert_eq!(
            *source.captured.lock().expect("captured lock"),
            Some((
                "main".to_owned(),
                "5511999@s.whatsapp.net".to_owned(),
                IntegrationType::Business,
                1000
            ))
        );
    }

    #[test]
    fn reconciles_reactions_and_order() {
        let source = StubSource::with_result(Ok(vec![
            text("B", 20, "second"),
            reaction("R1", "A", "\u{1F44D}", 30_000),
            text("A", 10, "first"),
            Message::new(Some("K"), Some(5), MessagePayload::KeyDistribution),
        ]));

        let entries = load_transcript(&source, query()).expect("load should succeed");

        let keys: Vec<RenderKey> = entries.iter().map(|entry| entry.key.clone()).collect();
        assert_eq!(
            keys,
            vec![RenderKey::Id("A".to_owned()), RenderKey::Id("B".to_owned())]
        );
        assert_eq!(
            entries[0]
                .message
                .reactions
                .as_ref()
                .map(|reactions| reactions[0].emoji.as_str()),
            Some("\u{1F44D}")
        );
        assert_eq!(entries[1].message.reactions, None);
    }

    #[test]
    fn fetch_messages_leaves_input_unreconciled() {
        let raw = vec![text("B", 20, "second"), text("A", 10, "first")];
        let source = StubSource::with_result(Ok(raw.clone()));

        let fetched = fetch_messages(&source, &query()).expect("fetch should succeed");

        assert_eq!(fetched, raw);
    }

    #[test]
    fn maps_not_found_error() {
        let source = StubSource::with_result(Err(SourceError::NotFound));

        let err = load_transcript(&source, query()).expect_err("must fail");

        assert_eq!(err, LoadTranscriptError::ChatNotFound);
    }

    #[test]
    fn maps_unavailable_error() {
        let source = StubSource::with_result(Err(SourceError::Unavailable));

        let err = load_transcript(&source, query()).expect_err("must fail");

        assert_eq!(err, LoadTranscriptError::TemporarilyUnavailable);
    }
}
