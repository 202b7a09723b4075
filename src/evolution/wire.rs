//! Raw JSON shapes returned by the Evolution API.
//!
//! Fields the server fills inconsistently across versions stay as
//! `serde_json::Value` and are interpreted by `normalize`.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessageKey {
    pub id: Option<String>,
    pub remote_jid: Option<String>,
    #[serde(default)]
    pub from_me: bool,
    pub participant: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStatusUpdate {
    pub status: Option<String>,
}

/// One row of `findMessages`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessageRecord {
    #[serde(default)]
    pub key: RawMessageKey,
    pub push_name: Option<String>,
    pub message_type: Option<String>,
    #[serde(default)]
    pub message: Value,
    #[serde(default)]
    pub context_info: Value,
    /// Seconds; a number, a numeric string or a protobuf `Long` object.
    #[serde(default)]
    pub message_timestamp: Value,
    #[serde(default, rename = "MessageUpdate")]
    pub message_update: Vec<RawStatusUpdate>,
    pub status: Option<String>,
}

/// Instance row of `fetchInstances` (v2 layout).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInstance {
    pub id: Option<String>,
    pub name: Option<String>,
    pub connection_status: Option<String>,
    pub owner_jid: Option<String>,
    pub profile_name: Option<String>,
    pub integration: Option<String>,
    pub token: Option<String>,
}

/// Instance row of `fetchInstances` (v1 layout, nested under `instance`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLegacyInstance {
    pub instance_name: Option<String>,
    pub instance_id: Option<String>,
    pub status: Option<String>,
    pub owner: Option<String>,
    pub profile_name: Option<String>,
    #[serde(default)]
    pub integration: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChat {
    pub id: Option<String>,
    pub remote_jid: Option<String>,
    pub push_name: Option<String>,
    pub name: Option<String>,
    pub profile_pic_url: Option<String>,
    #[serde(default)]
    pub unread_count: Value,
    #[serde(default)]
    pub updated_at: Value,
    #[serde(default)]
    pub last_message: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContact {
    pub id: Option<String>,
    pub remote_jid: Option<String>,
    pub push_name: Option<String>,
    pub profile_pic_url: Option<String>,
}

/// Response of `GET /instance/connect/{instance}`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    pub pairing_code: Option<String>,
    pub code: Option<String>,
    /// PNG as a `data:image/png;base64,...` URL.
    pub base64: Option<String>,
}

/// Response of `GET /`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub message: Option<String>,
    pub version: Option<String>,
    pub client_name: Option<String>,
}

/// `findMessages` answers either a bare array (v1) or a paginated object
/// with `messages.records` (v2).
pub fn message_rows(body: Value) -> Option<Vec<Value>> {
    match body {
        Value::Array(rows) => Some(rows),
        Value::Object(mut object) => match object.remove("messages")? {
            Value::Array(rows) => Some(rows),
            Value::Object(mut page) => match page.remove("records")? {
                Value::Array(rows) => Some(rows),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

/// Reads an integer that may be encoded as a number, a numeric string or a
/// protobuf `Long` (`{low, high}`).
pub fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|float| float.is_finite()).map(|float| float as i64)),
        Value::String(text) => text.trim().parse().ok(),
        Value::Object(object) => {
            let low = object.get("low")?.as_i64()?;
            let high = object.get("high").and_then(Value::as_i64).unwrap_or(0);
            Some((high << 32) | (low & 0xFFFF_FFFF))
        }
        _ => None,
    }
}

/// Non-empty string at `path` inside `value`.
pub fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |current, segment| current.get(segment))?
        .as_str()
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn message_rows_accepts_both_response_layouts() {
        let legacy = json!([{ "key": { "id": "A" } }]);
        let paginated = json!({ "messages": { "total": 1, "records": [{ "key": { "id": "A" } }] } });

        assert_eq!(message_rows(legacy).map(|rows| rows.len()), Some(1));
        assert_eq!(message_rows(paginated).map(|rows| rows.len()), Some(1));
        assert_eq!(message_rows(json!({ "status": 500 })), None);
    }

    #[test]
    fn lenient_i64_reads_numbers_strings_and_longs() {
        assert_eq!(lenient_i64(&json!(1_717_000_000)), Some(1_717_000_000));
        assert_eq!(lenient_i64(&json!("1717000000")), Some(1_717_000_000));
        assert_eq!(lenient_i64(&json!(1.5e3)), Some(1500));
        assert_eq!(lenient_i64(&json!({ "low": 5, "high": 0, "unsigned": true })), Some(5));
        assert_eq!(lenient_i64(&json!("soon")), None);
        assert_eq!(lenient_i64(&Value::Null), None);
    }

    #[test]
    fn record_tolerates_missing_fields() {
        let record: RawMessageRecord =
            serde_json::from_value(json!({ "key": { "id": "A" } })).expect("decode");

        assert_eq!(record.key.id.as_deref(), Some("A"));
        assert!(!record.key.from_me);
        assert!(record.message.is_null());
        assert!(record.message_update.is_empty());
    }

    #[test]
    fn str_at_skips_empty_strings() {
        let value = json!({ "contextInfo": { "stanzaId": "", "participant": "x" } });

        assert_eq!(str_at(&value, &["contextInfo", "stanzaId"]), None);
        assert_eq!(str_at(&value, &["contextInfo", "participant"]), Some("x"));
        assert_eq!(str_at(&value, &["missing", "path"]), None);
    }
}
