/// A conversation partner as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub remote_jid: String,
    pub title: String,
    pub avatar_url: Option<String>,
    pub unread_count: u32,
    pub last_message_preview: Option<String>,
    pub last_message_unix: Option<i64>,
}

impl ChatSummary {
    pub fn is_group(&self) -> bool {
        self.remote_jid.ends_with("@g.us")
    }
}

/// Contact metadata used to resolve participant names in group chats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub remote_jid: String,
    pub push_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Display name for `jid`: the contact's push name, else the bare number.
pub fn display_name<'a>(jid: &'a str, contacts: &'a [Contact]) -> &'a str {
    contacts
        .iter()
        .find(|contact| contact.remote_jid == jid)
        .and_then(|contact| contact.push_name.as_deref())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| jid.split('@').next().unwrap_or(jid))
}
