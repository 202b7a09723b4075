//! Use case for sending text and media messages to a chat.

use std::path::PathBuf;

use super::contracts::SourceError;

const USER_JID_SUFFIX: &str = "@s.whatsapp.net";

/// Outgoing text message as handed to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingText {
    pub number: String,
    pub text: String,
    pub quoted_id: Option<String>,
}

/// Outgoing media message read from a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMedia {
    pub number: String,
    pub file: PathBuf,
    pub caption: Option<String>,
    pub quoted_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub instance: String,
    /// Phone number or chat JID.
    pub recipient: String,
    pub text: String,
    pub quoted_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMediaCommand {
    pub instance: String,
    pub recipient: String,
    pub file: PathBuf,
    pub caption: Option<String>,
    pub quoted_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendMessageError {
    #[error("message text is empty")]
    EmptyMessage,
    #[error("recipient is empty")]
    MissingRecipient,
    #[error("attachment {0} is not a readable file")]
    AttachmentMissing(PathBuf),
    #[error("the server rejected the API key")]
    Unauthorized,
    #[error("chat or instance not found")]
    ChatNotFound,
    #[error("server temporarily unavailable")]
    TemporarilyUnavailable,
    #[error("{0}")]
    Rejected(String),
}

/// Sends messages through one instance. Returns the server-assigned id of
/// the new message when the server reports one.
pub trait MessageSender {
    fn send_text(
        &self,
        instance: &str,
        message: &OutgoingText,
    ) -> Result<Option<String>, SourceError>;

    fn send_media(
        &self,
        instance: &str,
        media: &OutgoingMedia,
    ) -> Result<Option<String>, SourceError>;
}

impl<T: MessageSender + ?Sized> MessageSender for &T {
    fn send_text(
        &self,
        instance: &str,
        message: &OutgoingText,
    ) -> Result<Option<String>, SourceError> {
        (*self).send_text(instance, message)
    }

    fn send_media(
        &self,
        instance: &str,
        media: &OutgoingMedia,
    ) -> Result<Option<String>, SourceError> {
        (*self).send_media(instance, media)
    }
}

/// Validates and sends a text message, optionally as a reply.
pub fn send_message(
    sender: &dyn MessageSender,
    command: SendMessageCommand,
) -> Result<Option<String>, SendMessageError> {
    let text = command.text.trim();
    if text.is_empty() {
        return Err(SendMessageError::EmptyMessage);
    }

    let number = recipient_number(&command.recipient).ok_or(SendMessageError::MissingRecipient)?;
    let message = OutgoingText {
        number,
        text: text.to_owned(),
        quoted_id: non_empty(command.quoted_id),
    };

    let sent = sender
        .send_text(&command.instance, &message)
        .map_err(map_source_error)?;
    tracing::info!(
        instance = %command.instance,
        reply = message.quoted_id.is_some(),
        "text message sent"
    );

    Ok(sent)
}

pub fn send_media(
    sender: &dyn MessageSender,
    command: SendMediaCommand,
) -> Result<Option<String>, SendMessageError> {
    let number = recipient_number(&command.recipient).ok_or(SendMessageError::MissingRecipient)?;
    if !command.file.is_file() {
        return Err(SendMessageError::AttachmentMissing(command.file));
    }

    let media = OutgoingMedia {
        number,
        file: command.file,
        caption: non_empty(command.caption.map(|caption| caption.trim().to_owned())),
        quoted_id: non_empty(command.quoted_id),
    };

    let sent = sender
        .send_media(&command.instance, &media)
        .map_err(map_source_error)?;
    tracing::info!(instance = %command.instance, "media message sent");

    Ok(sent)
}

/// Number form accepted by the send endpoints: bare digits for user chats,
/// the full JID for groups.
pub fn recipient_number(recipient: &str) -> Option<String> {
    let recipient = recipient.trim();
    if recipient.is_empty() {
        return None;
    }

    let number = recipient.strip_suffix(USER_JID_SUFFIX).unwrap_or(recipient);
    Some(number.trim_start_matches('+').to_owned())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn map_source_error(error: SourceError) -> SendMessageError {
    match error {
        SourceError::Unauthorized => SendMessageError::Unauthorized,
        SourceError::NotFound => SendMessageError::ChatNotFound,
        SourceError::Unavailable | SourceError::InvalidData => {
            SendMessageError::TemporarilyUnavailable
        }
        SourceError::Rejected(message) => SendMessageError::Rejected(message),
    }
}
