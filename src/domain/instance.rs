use std::fmt;

/// Which WhatsApp transport an instance runs on. It decides the raw message
/// shape the server returns for that instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrationType {
    /// Native protocol connection (Baileys).
    #[default]
    Baileys,
    /// Official WhatsApp Business Cloud API.
    Business,
}

impl IntegrationType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "WHATSAPP-BUSINESS" | "BUSINESS" => Self::Business,
            _ => Self::Baileys,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Baileys => "WHATSAPP-BAILEYS",
            Self::Business => "WHATSAPP-BUSINESS",
        }
    }
}

impl fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    Open,
    Connecting,
    Close,
    #[default]
    Unknown,
}

impl ConnectionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "open" => Self::Open,
            "connecting" => Self::Connecting,
            "close" | "closed" => Self::Close,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Connecting => "connecting",
            Self::Close => "close",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: Option<String>,
    pub name: String,
    pub token: Option<String>,
    pub status: ConnectionStatus,
    pub integration: IntegrationType,
    pub owner_jid: Option<String>,
    pub profile_name: Option<String>,
}

impl Instance {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            token: None,
            status: ConnectionStatus::Unknown,
            integration: IntegrationType::Baileys,
            owner_jid: None,
            profile_name: None,
        }
    }

    /// Phone number part of the owner JID, if connected.
    pub fn owner_number(&self) -> Option<&str> {
        self.owner_jid
            .as_deref()
            .and_then(|jid| jid.split('@').next())
            .filter(|number| !number.is_empty())
    }
}
