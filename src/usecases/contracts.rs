use anyhow::Result;

use crate::domain::{events::AppEvent, instance::IntegrationType, shell_state::ShellState};

use super::send_message::SendMessageCommand;

pub trait AppEventSource {
    fn next_event(&mut self) -> Result<Option<AppEvent>>;
}

pub trait ShellOrchestrator {
    fn state(&self) -> &ShellState;
    fn state_mut(&mut self) -> &mut ShellState;
    fn handle_event(&mut self, event: AppEvent) -> Result<()>;
}

/// Failure reported by a server-backed source, shared by the use case
/// source traits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    Unauthorized,
    NotFound,
    Unavailable,
    InvalidData,
    /// The server refused the request and said why.
    Rejected(String),
}

/// What the background poller should fetch. `remote_jid` is set while a
/// chat is open; otherwise only the instance's chat list is refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTarget {
    pub instance: String,
    pub integration: IntegrationType,
    pub remote_jid: Option<String>,
    pub epoch: u64,
}

/// Commands for the background worker that polls the server and carries
/// out sends off the UI thread.
pub trait WorkerControl {
    fn retarget(&mut self, target: Option<PollTarget>);
    fn refresh(&mut self);
    /// Completion arrives as `AppEvent::SendCompleted`.
    fn send(&mut self, command: SendMessageCommand);
}
