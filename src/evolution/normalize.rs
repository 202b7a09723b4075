//! Shape adapters: turn raw server rows into the normalized domain types.
//!
//! Instances on the native protocol (Baileys) and on the official Business
//! API store messages in different layouts; each gets its own adapter and
//! everything downstream sees a single `Message` shape.

use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::{
    chat::{ChatSummary, Contact},
    instance::{ConnectionStatus, Instance, IntegrationType},
    message::{DeliveryStatus, Message, MessagePayload, ReactionPayload},
};

use super::wire::{
    lenient_i64, str_at, RawChat, RawContact, RawInstance, RawLegacyInstance, RawMessageRecord,
};

const KEY_DISTRIBUTION: &str = "senderKeyDistributionMessage";

/// Content keys checked when `messageType` is missing, most specific first.
const BAILEYS_CONTENT_KEYS: [&str; 13] = [
    "reactionMessage",
    "extendedTextMessage",
    "conversation",
    "imageMessage",
    "videoMessage",
    "audioMessage",
    "documentMessage",
    "documentWithCaptionMessage",
    "stickerMessage",
    "contactMessage",
    "locationMessage",
    "protocolMessage",
    KEY_DISTRIBUTION,
];

const BUSINESS_CONTENT_KEYS: [&str; 9] = [
    "reaction", "text", "image", "video", "audio", "document", "sticker", "contacts", "location",
];

pub fn normalize_messages(rows: Vec<Value>, integration: IntegrationType) -> Vec<Message> {
    rows.into_iter()
        .filter_map(decode::<RawMessageRecord>)
        .map(|record| match integration {
            IntegrationType::Baileys => normalize_baileys(&record),
            IntegrationType::Business => normalize_business(&record),
        })
        .collect()
}

pub fn normalize_baileys(record: &RawMessageRecord) -> Message {
    let kind = baileys_kind(&record.message, record.message_type.as_deref());
    let payload = baileys_payload(&record.message, kind.as_deref());
    let quoted_id = baileys_quote(record, kind.as_deref());

    base_message(record, payload, quoted_id)
}

pub fn normalize_business(record: &RawMessageRecord) -> Message {
    let Some(kind) = business_kind(&record.message, record.message_type.as_deref()) else {
        // Business rows echoed through the native store use the Baileys layout.
        return normalize_baileys(record);
    };

    let content = &record.message[kind];
    let payload = match kind {
        "reaction" => MessagePayload::Reaction(ReactionPayload {
            target_id: str_at(content, &["message_id"]).map(ToOwned::to_owned),
            emoji: str_at(content, &["emoji"]).unwrap_or_default().to_owned(),
            sender_timestamp_ms: lenient_i64(&record.message_timestamp)
                .map(|seconds| seconds.saturating_mul(1000)),
        }),
        "text" => MessagePayload::Text(str_at(content, &["body"]).unwrap_or_default().to_owned()),
        "image" => MessagePayload::Image {
            caption: owned(str_at(content, &["caption"])),
            url: owned(str_at(content, &["link"]).or_else(|| str_at(content, &["url"]))),
        },
        "video" => MessagePayload::Video {
            caption: owned(str_at(content, &["caption"])),
            url: owned(str_at(content, &["link"]).or_else(|| str_at(content, &["url"]))),
        },
        "audio" => MessagePayload::Audio {
            seconds: None,
            voice_note: content["voice"].as_bool().unwrap_or(false),
        },
        "document" => MessagePayload::Document {
            file_name: owned(str_at(content, &["filename"])),
            caption: owned(str_at(content, &["caption"])),
        },
        "sticker" => MessagePayload::Sticker,
        "contacts" => MessagePayload::Contact {
            display_name: content
                .get(0)
                .and_then(|contact| str_at(contact, &["name", "formatted_name"]))
                .unwrap_or_default()
                .to_owned(),
        },
        "location" => location(content, "latitude", "longitude"),
        other => MessagePayload::Unsupported(other.to_owned()),
    };

    let quoted_id = owned(
        str_at(&record.message, &["context", "id"])
            .or_else(|| str_at(&record.context_info, &["stanzaId"])),
    );

    base_message(record, payload, quoted_id)
}

pub fn normalize_instance(row: Value) -> Option<Instance> {
    if let Some(legacy) = row.get("instance").filter(|nested| nested.is_object()) {
        let raw: RawLegacyInstance = decode(legacy.clone())?;
        let token = str_at(&row, &["hash", "apikey"])
            .or_else(|| str_at(&row, &["hash"]))
            .or_else(|| str_at(&raw.integration, &["token"]));
        let integration = str_at(&raw.integration, &["integration"])
            .or_else(|| raw.integration.as_str())
            .map(IntegrationType::parse)
            .unwrap_or_default();

        return Some(Instance {
            id: raw.instance_id,
            name: raw.instance_name.filter(|name| !name.is_empty())?,
            token: owned(token),
            status: raw
                .status
                .as_deref()
                .map(ConnectionStatus::parse)
                .unwrap_or_default(),
            integration,
            owner_jid: raw.owner,
            profile_name: raw.profile_name,
        });
    }

    let raw: RawInstance = decode(row)?;
    Some(Instance {
        id: raw.id,
        name: raw.name.filter(|name| !name.is_empty())?,
        token: raw.token,
        status: raw
            .connection_status
            .as_deref()
            .map(ConnectionStatus::parse)
            .unwrap_or_default(),
        integration: raw
            .integration
            .as_deref()
            .map(IntegrationType::parse)
            .unwrap_or_default(),
        owner_jid: raw.owner_jid,
        profile_name: raw.profile_name,
    })
}

pub fn normalize_chat(row: Value) -> Option<ChatSummary> {
    let raw: RawChat = decode(row)?;
    let remote_jid = raw
        .remote_jid
        .or(raw.id)
        .filter(|jid| jid.contains('@'))?;

    let title = raw
        .name
        .or(raw.push_name)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| bare_number(&remote_jid).to_owned());

    let (last_message_preview, last_message_unix) = match raw.last_message.as_object() {
        Some(_) => {
            let record: Option<RawMessageRecord> = decode(raw.last_message.clone());
            let preview = record.as_ref().map(|record| {
                let kind = baileys_kind(&record.message, record.message_type.as_deref());
                Message::new(None, None, baileys_payload(&record.message, kind.as_deref()))
                    .display_content()
            });
            let unix = lenient_i64(&raw.last_message["messageTimestamp"]);
            (preview.filter(|text| !text.is_empty()), unix)
        }
        None => (None, None),
    };

    Some(ChatSummary {
        title,
        avatar_url: raw.profile_pic_url,
        unread_count: lenient_i64(&raw.unread_count)
            .and_then(|count| u32::try_from(count).ok())
            .unwrap_or(0),
        last_message_preview,
        last_message_unix: last_message_unix.or_else(|| iso_seconds(&raw.updated_at)),
        remote_jid,
    })
}

pub fn normalize_contact(row: Value) -> Option<Contact> {
    let raw: RawContact = decode(row)?;

    Some(Contact {
        remote_jid: raw.remote_jid.or(raw.id).filter(|jid| jid.contains('@'))?,
        push_name: raw.push_name,
        avatar_url: raw.profile_pic_url,
    })
}

fn decode<T: DeserializeOwned>(row: Value) -> Option<T> {
    match serde_json::from_value(row) {
        Ok(decoded) => Some(decoded),
        Err(error) => {
            tracing::debug!(error = %error, "skipping row with unexpected shape");
            None
        }
    }
}

fn base_message(
    record: &RawMessageRecord,
    payload: MessagePayload,
    quoted_id: Option<String>,
) -> Message {
    let mut status_updates: Vec<DeliveryStatus> = record
        .message_update
        .iter()
        .filter_map(|update| update.status.as_deref())
        .map(DeliveryStatus::parse)
        .collect();
    if status_updates.is_empty() {
        status_updates.extend(record.status.as_deref().map(DeliveryStatus::parse));
    }

    Message {
        id: record.key.id.clone().filter(|id| !id.is_empty()),
        remote_jid: record.key.remote_jid.clone().unwrap_or_default(),
        from_me: record.key.from_me,
        participant: record.key.participant.clone().filter(|jid| !jid.is_empty()),
        push_name: record.push_name.clone(),
        timestamp: lenient_i64(&record.message_timestamp),
        payload,
        quoted_id,
        status_updates,
        reactions: None,
    }
}

fn baileys_kind(message: &Value, message_type: Option<&str>) -> Option<String> {
    if let Some(kind) = message_type.filter(|kind| !kind.is_empty()) {
        if kind == KEY_DISTRIBUTION || message.get(kind).is_some() {
            return Some(kind.to_owned());
        }
    }

    BAILEYS_CONTENT_KEYS
        .iter()
        .find(|key| message.get(**key).is_some())
        .map(|key| (*key).to_owned())
        .or_else(|| message_type.map(ToOwned::to_owned))
}

fn baileys_payload(message: &Value, kind: Option<&str>) -> MessagePayload {
    let Some(kind) = kind else {
        return MessagePayload::Unsupported("empty".to_owned());
    };
    let content = &message[kind];

    match kind {
        "conversation" => MessagePayload::Text(content.as_str().unwrap_or_default().to_owned()),
        "extendedTextMessage" => {
            MessagePayload::ExtendedText(str_at(content, &["text"]).unwrap_or_default().to_owned())
        }
        "imageMessage" => MessagePayload::Image {
            caption: owned(str_at(content, &["caption"])),
            url: owned(str_at(content, &["url"])),
        },
        "videoMessage" => MessagePayload::Video {
            caption: owned(str_at(content, &["caption"])),
            url: owned(str_at(content, &["url"])),
        },
        "audioMessage" => MessagePayload::Audio {
            seconds: lenient_i64(&content["seconds"]).and_then(|seconds| u32::try_from(seconds).ok()),
            voice_note: content["ptt"].as_bool().unwrap_or(false),
        },
        "documentMessage" => document(content),
        "documentWithCaptionMessage" => document(&content["message"]["documentMessage"]),
        "stickerMessage" => MessagePayload::Sticker,
        "contactMessage" => MessagePayload::Contact {
            display_name: str_at(content, &["displayName"])
                .unwrap_or_default()
                .to_owned(),
        },
        "locationMessage" => location(content, "degreesLatitude", "degreesLongitude"),
        "reactionMessage" => MessagePayload::Reaction(ReactionPayload {
            target_id: owned(str_at(content, &["key", "id"])),
            emoji: content["text"].as_str().unwrap_or_default().to_owned(),
            sender_timestamp_ms: lenient_i64(&content["senderTimestampMs"]),
        }),
        KEY_DISTRIBUTION => MessagePayload::KeyDistribution,
        other => MessagePayload::Unsupported(other.to_owned()),
    }
}

fn baileys_quote(record: &RawMessageRecord, kind: Option<&str>) -> Option<String> {
    let nested = kind
        .and_then(|kind| str_at(&record.message, &[kind, "contextInfo", "stanzaId"]));

    owned(str_at(&record.context_info, &["stanzaId"]).or(nested))
}

fn business_kind(message: &Value, message_type: Option<&str>) -> Option<&'static str> {
    let declared = str_at(message, &["type"]).or(message_type);

    BUSINESS_CONTENT_KEYS
        .iter()
        .copied()
        .find(|key| declared == Some(*key) && message.get(*key).is_some())
        .or_else(|| {
            BUSINESS_CONTENT_KEYS
                .iter()
                .copied()
                .find(|key| message.get(*key).is_some_and(Value::is_object))
        })
}

fn document(content: &Value) -> MessagePayload {
    MessagePayload::Document {
        file_name: owned(str_at(content, &["fileName"])),
        caption: owned(str_at(content, &["caption"])),
    }
}

fn location(content: &Value, latitude_key: &str, longitude_key: &str) -> MessagePayload {
    MessagePayload::Location {
        latitude: content[latitude_key].as_f64().unwrap_or_default(),
        longitude: content[longitude_key].as_f64().unwrap_or_default(),
        name: owned(str_at(content, &["name"])),
    }
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(ToOwned::to_owned)
}

fn bare_number(jid: &str) -> &str {
    jid.split('@').next().unwrap_or(jid)
}

fn iso_seconds(value: &Value) -> Option<i64> {
    value
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.timestamp())
        .or_else(|| lenient_i64(value))
}
