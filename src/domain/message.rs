/// Delivery status reported by the server for an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Pending,
    ServerAck,
    Delivered,
    Read,
    Played,
    Deleted,
    Unknown,
}

impl DeliveryStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "SERVER_ACK" | "SENT" => Self::ServerAck,
            "DELIVERY_ACK" | "DELIVERED" => Self::Delivered,
            "READ" => Self::Read,
            "PLAYED" => Self::Played,
            "DELETED" => Self::Deleted,
            _ => Self::Unknown,
        }
    }

    /// Tick marker shown next to outgoing messages.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Pending => "\u{2022}",
            Self::ServerAck => "\u{2713}",
            Self::Delivered => "\u{2713}\u{2713}",
            Self::Read | Self::Played => "\u{2713}\u{2713}*",
            Self::Deleted => "\u{2715}",
            Self::Unknown => "",
        }
    }
}

/// Reaction payload as carried by a reaction pseudo-message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReactionPayload {
    pub target_id: Option<String>,
    pub emoji: String,
    pub sender_timestamp_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessagePayload {
    Text(String),
    ExtendedText(String),
    Image {
        caption: Option<String>,
        url: Option<String>,
    },
    Video {
        caption: Option<String>,
        url: Option<String>,
    },
    Audio {
        seconds: Option<u32>,
        voice_note: bool,
    },
    Document {
        file_name: Option<String>,
        caption: Option<String>,
    },
    Sticker,
    Contact {
        display_name: String,
    },
    Location {
        latitude: f64,
        longitude: f64,
        name: Option<String>,
    },
    Reaction(ReactionPayload),
    /// Sender-key distribution handshake; never shown to the user.
    KeyDistribution,
    Unsupported(String),
}

impl MessagePayload {
    pub fn is_reaction(&self) -> bool {
        matches!(self, Self::Reaction(_))
    }

    pub fn is_key_distribution(&self) -> bool {
        matches!(self, Self::KeyDistribution)
    }

    /// Returns a display label for non-text payloads.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::Text(_) | Self::ExtendedText(_) => None,
            Self::Image { .. } => Some("[Image]"),
            Self::Video { .. } => Some("[Video]"),
            Self::Audio {
                voice_note: true, ..
            } => Some("[Voice]"),
            Self::Audio { .. } => Some("[Audio]"),
            Self::Document { .. } => Some("[Document]"),
            Self::Sticker => Some("[Sticker]"),
            Self::Contact { .. } => Some("[Contact]"),
            Self::Location { .. } => Some("[Location]"),
            Self::Reaction(_) => Some("[Reaction]"),
            Self::KeyDistribution => None,
            Self::Unsupported(_) => Some("[Unsupported]"),
        }
    }

    pub(crate) fn body(&self) -> String {
        match self {
            Self::Text(text) | Self::ExtendedText(text) => text.clone(),
            Self::Image { caption, .. } | Self::Video { caption, .. } => {
                caption.clone().unwrap_or_default()
            }
            Self::Audio {
                seconds: Some(seconds),
                ..
            } => format!("{}:{:02}", seconds / 60, seconds % 60),
            Self::Audio { seconds: None, .. } | Self::Sticker | Self::KeyDistribution => {
                String::new()
            }
            Self::Document { file_name, caption } => match (file_name, caption) {
                (Some(name), Some(caption)) => format!("{name} - {caption}"),
                (Some(name), None) => name.clone(),
                (None, Some(caption)) => caption.clone(),
                (None, None) => String::new(),
            },
            Self::Contact { display_name } => display_name.clone(),
            Self::Location {
                latitude,
                longitude,
                name,
            } => match name {
                Some(name) => format!("{name} ({latitude:.5}, {longitude:.5})"),
                None => format!("{latitude:.5}, {longitude:.5}"),
            },
            Self::Reaction(reaction) => reaction.emoji.clone(),
            Self::Unsupported(kind) => kind.clone(),
        }
    }
}

/// A reaction folded onto its target message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub emoji: String,
    pub sender: String,
    pub message_id: String,
    pub timestamp_ms: Option<i64>,
}

/// One transcript entry, normalized from either server data shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Option<String>,
    pub remote_jid: String,
    pub from_me: bool,
    /// Sender JID inside group chats.
    pub participant: Option<String>,
    pub push_name: Option<String>,
    /// Seconds since epoch; `None` when missing or unparseable.
    pub timestamp: Option<i64>,
    pub payload: MessagePayload,
    pub quoted_id: Option<String>,
    pub status_updates: Vec<DeliveryStatus>,
    /// Set only on messages targeted by at least one reaction.
    pub reactions: Option<Vec<Reaction>>,
}

impl Message {
    pub fn new(id: Option<&str>, timestamp: Option<i64>, payload: MessagePayload) -> Self {
        Self {
            id: id.map(ToOwned::to_owned),
            remote_jid: String::new(),
            from_me: false,
            participant: None,
            push_name: None,
            timestamp,
            payload,
            quoted_id: None,
            status_updates: Vec::new(),
            reactions: None,
        }
    }

    /// Returns the display content: payload label + body, or just the body.
    pub fn display_content(&self) -> String {
        let body = self.payload.body();
        match (self.payload.label(), body.is_empty()) {
            (Some(label), true) => label.to_owned(),
            (Some(label), false) => format!("{label} {body}"),
            (None, _) => body,
        }
    }

    /// Identifier of whoever sent this message, used as reaction sender.
    pub fn sender_id(&self) -> String {
        if self.from_me {
            return "me".to_owned();
        }

        self.participant
            .clone()
            .unwrap_or_else(|| self.remote_jid.clone())
    }

    pub fn latest_status(&self) -> Option<DeliveryStatus> {
        self.status_updates.last().copied()
    }

    pub fn is_deleted(&self) -> bool {
        self.status_updates.contains(&DeliveryStatus::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(payload: MessagePayload) -> Message {
        Message::new(Some("A"), Some(1), payload)
    }

    #[test]
    fn display_content_returns_text_only_for_plain_text() {
        assert_eq!(
            msg(MessagePayload::Text("Hello".to_owned())).display_content(),
            "Hello"
        );
    }

    #[test]
    fn display_content_returns_label_only_when_caption_missing() {
        let message = msg(MessagePayload::Image {
            caption: None,
            url: None,
        });

        assert_eq!(message.display_content(), "[Image]");
    }

    #[test]
    fn display_content_combines_label_and_caption() {
        let message = msg(MessagePayload::Document {
            file_name: Some("report.pdf".to_owned()),
            caption: None,
        });

        assert_eq!(message.display_content(), "[Document] report.pdf");
    }

    #[test]
    fn voice_notes_have_their_own_label() {
        let message = msg(MessagePayload::Audio {
            seconds: Some(75),
            voice_note: true,
        });

        assert_eq!(message.display_content(), "[Voice] 1:15");
    }

    #[test]
    fn sender_id_prefers_participant_for_group_messages() {
        let mut message = msg(MessagePayload::Text("hi".to_owned()));
        message.remote_jid = "123@g.us".to_owned();
        message.participant = Some("555@s.whatsapp.net".to_owned());

        assert_eq!(message.sender_id(), "555@s.whatsapp.net");

        message.from_me = true;
        assert_eq!(message.sender_id(), "me");
    }

    #[test]
    fn delivery_status_parses_server_labels() {
        assert_eq!(DeliveryStatus::parse("DELIVERY_ACK"), DeliveryStatus::Delivered);
        assert_eq!(DeliveryStatus::parse("read"), DeliveryStatus::Read);
        assert_eq!(DeliveryStatus::parse("whatever"), DeliveryStatus::Unknown);
    }
}
