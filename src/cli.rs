use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::instance::IntegrationType;

#[derive(Debug, Parser)]
#[command(
    name = "evoman",
    version,
    about = "Terminal console for Evolution API WhatsApp instances (CLI + TUI)"
)]
pub struct Cli {
    /// Path to config file (default: ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start TUI shell
    Run,
    /// Save the server URL and global API key
    Login {
        #[arg(long)]
        url: Option<String>,
        /// Prompted without echo when omitted
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Forget the saved session and cached QR codes
    Logout,
    /// List instances on the server
    Instances,
    /// Manage a single instance
    Instance {
        #[command(subcommand)]
        action: InstanceCommand,
    },
    /// List an instance's chats, most recent first
    Chats {
        instance: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print a chat's reconciled transcript
    Transcript {
        instance: String,
        remote_jid: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Send a text message
    Send {
        instance: String,
        number: String,
        text: String,
        /// Id of the message to reply to
        #[arg(long)]
        quote: Option<String>,
    },
    /// Send a file as image, video, audio or document
    SendMedia(SendMediaArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SendMediaArgs {
    pub instance: String,
    pub number: String,
    pub file: PathBuf,
    #[arg(long)]
    pub caption: Option<String>,
    #[arg(long)]
    pub quote: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum InstanceCommand {
    Create {
        name: String,
        #[arg(long, value_enum, default_value_t = IntegrationArg::Baileys)]
        integration: IntegrationArg,
        /// Instance token; generated by the server when omitted
        #[arg(long)]
        token: Option<String>,
        /// Phone number, required for business instances
        #[arg(long)]
        number: Option<String>,
    },
    Delete {
        name: String,
    },
    /// Request a QR code or pairing code and open the QR image
    Connect {
        name: String,
    },
    State {
        name: String,
    },
    Restart {
        name: String,
    },
    /// Log the instance out of WhatsApp
    Logout {
        name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IntegrationArg {
    Baileys,
    Business,
}

impl From<IntegrationArg> for IntegrationType {
    fn from(value: IntegrationArg) -> Self {
        match value {
            IntegrationArg::Baileys => Self::Baileys,
            IntegrationArg::Business => Self::Business,
        }
    }
}

impl Cli {
    pub fn command_or_default(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}
