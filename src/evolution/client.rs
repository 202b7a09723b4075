//! Blocking REST client for one Evolution server.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use reqwest::{
    blocking::{
        multipart::{Form, Part},
        Client, RequestBuilder,
    },
    Method, Url,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::{
    domain::{
        chat::{ChatSummary, Contact},
        instance::{ConnectionStatus, Instance, IntegrationType},
        message::Message,
    },
    infra::session_store::Session,
    usecases::{
        contracts::SourceError,
        instances::{CreateInstanceRequest, InstanceAdmin, PairingChallenge},
        list_chats::ChatsSource,
        load_transcript::TranscriptSource,
        login::{CredentialsVerifier, ServerHandshake},
        send_message::{MessageSender, OutgoingMedia, OutgoingText},
    },
};

use super::{
    normalize,
    wire::{self, ConnectResponse, ServerInfo},
};

const API_KEY_HEADER: &str = "apikey";

/// Which server to talk to and with which global API key. Passed explicitly
/// to every client; there is no process-wide credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerContext {
    pub base_url: String,
    pub api_key: String,
}

impl ServerContext {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_owned(),
            api_key: api_key.trim().to_owned(),
        }
    }

    pub fn from_session(session: &Session) -> Self {
        Self::new(&session.base_url, &session.api_key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("http client setup failed: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("invalid server url {url}: {details}")]
    InvalidBaseUrl { url: String, details: String },
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server answered {status} for {path}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },
    #[error("unexpected response from {path}: {details}")]
    Decode { path: String, details: String },
    #[error("cannot read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("missing {0}")]
    MissingInput(&'static str),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EvolutionClient {
    http: Client,
    context: ServerContext,
}

impl EvolutionClient {
    pub fn new(context: ServerContext, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("evoman/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::ClientBuild)?;

        Ok(Self { http, context })
    }

    pub fn context(&self) -> &ServerContext {
        &self.context
    }

    pub fn server_info(&self) -> Result<ServerInfo, ApiError> {
        let body = self.call(Method::GET, &[], None)?;
        decode_body("/", body)
    }

    pub fn verify_credentials(&self) -> Result<(), ApiError> {
        self.call(Method::POST, &["verify-creds"], Some(json!({})))
            .map(drop)
    }

    pub fn fetch_instances(&self) -> Result<Vec<Instance>, ApiError> {
        let body = self.call(Method::GET, &["instance", "fetchInstances"], None)?;
        let rows = expect_array("/instance/fetchInstances", body)?;

        Ok(rows.into_iter().filter_map(normalize::normalize_instance).collect())
    }

    pub fn create_instance(&self, request: &CreateInstanceRequest) -> Result<Instance, ApiError> {
        if request.name.trim().is_empty() {
            return Err(ApiError::MissingInput("instance name"));
        }

        let mut body = json!({
            "instanceName": request.name.trim(),
            "integration": request.integration.as_wire(),
            "qrcode": request.integration == IntegrationType::Baileys,
        });
        if let Some(token) = &request.token {
            body["token"] = json!(token);
        }
        if let Some(number) = &request.number {
            body["number"] = json!(number);
        }

        let response = self.call(Method::POST, &["instance", "create"], Some(body))?;
        normalize::normalize_instance(response).ok_or_else(|| ApiError::Decode {
            path: "/instance/create".to_owned(),
            details: "response carries no instance name".to_owned(),
        })
    }

    pub fn delete_instance(&self, instance: &str) -> Result<(), ApiError> {
        self.call(Method::DELETE, &["instance", "delete", instance], None)
            .map(drop)
    }

    pub fn connect_instance(&self, instance: &str) -> Result<ConnectResponse, ApiError> {
        let body = self.call(Method::GET, &["instance", "connect", instance], None)?;
        decode_body("/instance/connect", body)
    }

    pub fn connection_state(&self, instance: &str) -> Result<ConnectionStatus, ApiError> {
        let body = self.call(Method::GET, &["instance", "connectionState", instance], None)?;
        let state = wire::str_at(&body, &["instance", "state"])
            .or_else(|| wire::str_at(&body, &["state"]))
            .ok_or_else(|| ApiError::Decode {
                path: "/instance/connectionState".to_owned(),
                details: "state field missing".to_owned(),
            })?;

        Ok(ConnectionStatus::parse(state))
    }

    pub fn restart_instance(&self, instance: &str) -> Result<(), ApiError> {
        self.call(Method::POST, &["instance", "restart", instance], None)
            .map(drop)
    }

    pub fn logout_instance(&self, instance: &str) -> Result<(), ApiError> {
        self.call(Method::DELETE, &["instance", "logout", instance], None)
            .map(drop)
    }

    pub fn find_chats(&self, instance: &str) -> Result<Vec<ChatSummary>, ApiError> {
        let body = self.call(Method::POST, &["chat", "findChats", instance], Some(json!({})))?;
        let rows = expect_array("/chat/findChats", body)?;

        Ok(rows.into_iter().filter_map(normalize::normalize_chat).collect())
    }

    pub fn find_contacts(&self, instance: &str) -> Result<Vec<Contact>, ApiError> {
        let body = self.call(
            Method::POST,
            &["chat", "findContacts", instance],
            Some(json!({ "where": {} })),
        )?;
        let rows = expect_array("/chat/findContacts", body)?;

        Ok(rows.into_iter().filter_map(normalize::normalize_contact).collect())
    }

    pub fn find_messages(
        &self,
        instance: &str,
        remote_jid: &str,
        integration: IntegrationType,
        limit: usize,
    ) -> Result<Vec<Message>, ApiError> {
        let body = self.call(
            Method::POST,
            &["chat", "findMessages", instance],
            Some(json!({
                "where": { "key": { "remoteJid": remote_jid } },
                "offset": limit,
                "page": 1,
            })),
        )?;
        let rows = wire::message_rows(body).ok_or_else(|| ApiError::Decode {
            path: "/chat/findMessages".to_owned(),
            details: "neither a list nor a page of records".to_owned(),
        })?;

        Ok(normalize::normalize_messages(rows, integration))
    }

    /// Sends a text message. Returns the server-assigned message id.
    pub fn send_text(
        &self,
        instance: &str,
        message: &OutgoingText,
    ) -> Result<Option<String>, ApiError> {
        if message.number.trim().is_empty() {
            return Err(ApiError::MissingInput("recipient number"));
        }

        let mut body = json!({ "number": message.number, "text": message.text });
        if let Some(quoted_id) = &message.quoted_id {
            body["quoted"] = quoted_reference(quoted_id);
        }

        let response = self.call(Method::POST, &["message", "sendText", instance], Some(body))?;
        Ok(wire::str_at(&response, &["key", "id"]).map(ToOwned::to_owned))
    }

    pub fn send_media(
        &self,
        instance: &str,
        media: &OutgoingMedia,
    ) -> Result<Option<String>, ApiError> {
        if media.number.trim().is_empty() {
            return Err(ApiError::MissingInput("recipient number"));
        }

        let bytes = fs::read(&media.file).map_err(|source| ApiError::Attachment {
            path: media.file.clone(),
            source,
        })?;
        let file_name = media
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_owned());
        let kind = MediaKind::from_path(&media.file);
        let path = "/message/sendMedia";

        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(kind.mime_type)
            .map_err(|source| ApiError::Transport {
                path: path.to_owned(),
                source,
            })?;

        let mut form = Form::new()
            .text("number", media.number.clone())
            .text("mediatype", kind.media_type)
            .text("mimetype", kind.mime_type)
            .text("fileName", file_name)
            .part("file", part);
        if let Some(caption) = &media.caption {
            form = form.text("caption", caption.clone());
        }
        if let Some(quoted_id) = &media.quoted_id {
            form = form.text("quoted", quoted_reference(quoted_id).to_string());
        }

        let url = self.endpoint(&["message", "sendMedia", instance])?;
        let request = self.authorized(Method::POST, url).multipart(form);
        let response = self.execute(request, path)?;

        Ok(wire::str_at(&response, &["key", "id"]).map(ToOwned::to_owned))
    }

    fn call(&self, method: Method, segments: &[&str], body: Option<Value>) -> Result<Value, ApiError> {
        let url = self.endpoint(segments)?;
        let path = format!("/{}", route_segments(segments).join("/"));

        let mut request = self.authorized(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        self.execute(request, &path)
    }

    fn authorized(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(API_KEY_HEADER, &self.context.api_key)
    }

    fn execute(&self, request: RequestBuilder, path: &str) -> Result<Value, ApiError> {
        let transport = |source| ApiError::Transport {
            path: path.to_owned(),
            source,
        };

        let response = request.send().map_err(transport)?;
        let status = response.status();
        let text = response.text().map_err(transport)?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        tracing::debug!(path, status = status.as_u16(), "evolution api call finished");

        if !status.is_success() {
            return Err(ApiError::Status {
                path: path.to_owned(),
                status: status.as_u16(),
                message: server_message(&body).unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_owned()
                }),
            });
        }

        Ok(body)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        build_endpoint(&self.context.base_url, segments)
    }
}

impl From<ApiError> for SourceError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Status { status, message, .. } => match status {
                401 | 403 => Self::Unauthorized,
                404 => Self::NotFound,
                400..=499 => Self::Rejected(message),
                _ => Self::Unavailable,
            },
            ApiError::ClientBuild(_) | ApiError::Transport { .. } => Self::Unavailable,
            ApiError::Decode { .. } => Self::InvalidData,
            other @ (ApiError::InvalidBaseUrl { .. }
            | ApiError::Attachment { .. }
            | ApiError::MissingInput(_)) => Self::Rejected(other.to_string()),
        }
    }
}

fn log_failure(operation: &'static str, error: ApiError) -> SourceError {
    tracing::warn!(operation, error = %error, "evolution api request failed");
    SourceError::from(error)
}

impl ChatsSource for EvolutionClient {
    fn find_chats(&self, instance: &str) -> Result<Vec<ChatSummary>, SourceError> {
        EvolutionClient::find_chats(self, instance).map_err(|error| log_failure("find_chats", error))
    }

    fn find_contacts(&self, instance: &str) -> Result<Vec<Contact>, SourceError> {
        EvolutionClient::find_contacts(self, instance)
            .map_err(|error| log_failure("find_contacts", error))
    }
}

impl TranscriptSource for EvolutionClient {
    fn find_messages(
        &self,
        instance: &str,
        remote_jid: &str,
        integration: IntegrationType,
        limit: usize,
    ) -> Result<Vec<Message>, SourceError> {
        EvolutionClient::find_messages(self, instance, remote_jid, integration, limit)
            .map_err(|error| log_failure("find_messages", error))
    }
}

impl MessageSender for EvolutionClient {
    fn send_text(
        &self,
        instance: &str,
        message: &OutgoingText,
    ) -> Result<Option<String>, SourceError> {
        EvolutionClient::send_text(self, instance, message)
            .map_err(|error| log_failure("send_text", error))
    }

    fn send_media(
        &self,
        instance: &str,
        media: &OutgoingMedia,
    ) -> Result<Option<String>, SourceError> {
        EvolutionClient::send_media(self, instance, media)
            .map_err(|error| log_failure("send_media", error))
    }
}

impl InstanceAdmin for EvolutionClient {
    fn fetch_instances(&self) -> Result<Vec<Instance>, SourceError> {
        EvolutionClient::fetch_instances(self).map_err(|error| log_failure("fetch_instances", error))
    }

    fn create_instance(&self, request: &CreateInstanceRequest) -> Result<Instance, SourceError> {
        EvolutionClient::create_instance(self, request)
            .map_err(|error| log_failure("create_instance", error))
    }

    fn delete_instance(&self, instance: &str) -> Result<(), SourceError> {
        EvolutionClient::delete_instance(self, instance)
            .map_err(|error| log_failure("delete_instance", error))
    }

    fn connect_instance(&self, instance: &str) -> Result<PairingChallenge, SourceError> {
        let response = EvolutionClient::connect_instance(self, instance)
            .map_err(|error| log_failure("connect_instance", error))?;

        Ok(PairingChallenge {
            pairing_code: response.pairing_code,
            code: response.code,
            qr_base64: response.base64,
        })
    }

    fn connection_state(&self, instance: &str) -> Result<ConnectionStatus, SourceError> {
        EvolutionClient::connection_state(self, instance)
            .map_err(|error| log_failure("connection_state", error))
    }

    fn restart_instance(&self, instance: &str) -> Result<(), SourceError> {
        EvolutionClient::restart_instance(self, instance)
            .map_err(|error| log_failure("restart_instance", error))
    }

    fn logout_instance(&self, instance: &str) -> Result<(), SourceError> {
        EvolutionClient::logout_instance(self, instance)
            .map_err(|error| log_failure("logout_instance", error))
    }
}

/// Checks candidate credentials: the root endpoint must answer like an
/// Evolution server and the key must pass `verify-creds`.
#[derive(Debug, Clone, Copy)]
pub struct HttpCredentialsVerifier {
    timeout: Duration,
}

impl HttpCredentialsVerifier {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CredentialsVerifier for HttpCredentialsVerifier {
    fn verify(&mut self, base_url: &str, api_key: &str) -> Result<ServerHandshake, SourceError> {
        let client = EvolutionClient::new(ServerContext::new(base_url, api_key), self.timeout)?;

        let info = client.server_info()?;
        if info.version.is_none() && info.message.is_none() {
            return Err(SourceError::InvalidData);
        }
        client.verify_credentials()?;

        Ok(ServerHandshake {
            version: info.version,
            client_name: info.client_name,
        })
    }
}

fn build_endpoint(base_url: &str, segments: &[&str]) -> Result<Url, ApiError> {
    let invalid = |details: String| ApiError::InvalidBaseUrl {
        url: base_url.to_owned(),
        details,
    };

    let mut url = Url::parse(base_url).map_err(|source| invalid(source.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("url cannot carry a path".to_owned()))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

/// Route segments with the instance name left out, for logs and errors.
fn route_segments<'a>(segments: &[&'a str]) -> Vec<&'a str> {
    segments.iter().take(2).copied().collect()
}

fn quoted_reference(quoted_id: &str) -> Value {
    json!({ "key": { "id": quoted_id } })
}

fn expect_array(path: &str, body: Value) -> Result<Vec<Value>, ApiError> {
    match body {
        Value::Array(rows) => Ok(rows),
        other => Err(ApiError::Decode {
            path: path.to_owned(),
            details: format!("expected a list, got {}", json_kind(&other)),
        }),
    }
}

fn decode_body<T: DeserializeOwned>(path: &str, body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|source| ApiError::Decode {
        path: path.to_owned(),
        details: source.to_string(),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Best-effort human message from an error body: `response.message`, then
/// `message`, then `error`. Lists of messages are joined.
pub fn server_message(body: &Value) -> Option<String> {
    [&body["response"]["message"], &body["message"], &body["error"]]
        .into_iter()
        .find_map(|candidate| match candidate {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_owned()),
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| match item {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .filter(|text| !text.is_empty())
                    .collect();
                (!parts.is_empty()).then(|| parts.join("; "))
            }
            _ => None,
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MediaKind {
    media_type: &'static str,
    mime_type: &'static str,
}

impl MediaKind {
    fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let (media_type, mime_type) = match extension.as_str() {
            "jpg" | "jpeg" => ("image", "image/jpeg"),
            "png" => ("image", "image/png"),
            "gif" => ("image", "image/gif"),
            "webp" => ("image", "image/webp"),
            "mp4" => ("video", "video/mp4"),
            "3gp" => ("video", "video/3gpp"),
            "mp3" => ("audio", "audio/mpeg"),
            "ogg" | "opus" => ("audio", "audio/ogg"),
            "m4a" => ("audio", "audio/mp4"),
            "pdf" => ("document", "application/pdf"),
            "txt" => ("document", "text/plain"),
            "csv" => ("document", "text/csv"),
            _ => ("document", "application/octet-stream"),
        };

        Self {
            media_type,
            mime_type,
        }
    }
}
