use std::time::Instant;

use super::{
    composer_state::ComposerState,
    list_state::{ChatListState, InstanceListState},
    toast::Toast,
    transcript_state::TranscriptState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePane {
    Instances,
    Chats,
    Transcript,
    Composer,
}

impl ActivePane {
    /// Tab order; the composer is only entered explicitly.
    pub fn next(self) -> Self {
        match self {
            Self::Instances => Self::Chats,
            Self::Chats => Self::Transcript,
            Self::Transcript | Self::Composer => Self::Instances,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShellState {
    running: bool,
    active_pane: ActivePane,
    server_label: String,
    instances: InstanceListState,
    /// Instance whose chats are listed in the chat pane.
    chats_instance: Option<String>,
    chats: ChatListState,
    transcript: TranscriptState,
    composer: ComposerState,
    toast: Option<Toast>,
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new(String::new(), TranscriptState::default())
    }
}

impl ShellState {
    pub fn new(server_label: String, transcript: TranscriptState) -> Self {
        Self {
            running: true,
            active_pane: ActivePane::Instances,
            server_label,
            instances: InstanceListState::default(),
            chats_instance: None,
            chats: ChatListState::default(),
            transcript,
            composer: ComposerState::default(),
            toast: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn active_pane(&self) -> ActivePane {
        self.active_pane
    }

    pub fn set_active_pane(&mut self, pane: ActivePane) {
        self.active_pane = pane;
    }

    pub fn server_label(&self) -> &str {
        &self.server_label
    }

    pub fn instances(&self) -> &InstanceListState {
        &self.instances
    }

    pub fn instances_mut(&mut self) -> &mut InstanceListState {
        &mut self.instances
    }

    pub fn chats_instance(&self) -> Option<&str> {
        self.chats_instance.as_deref()
    }

    pub fn set_chats_instance(&mut self, instance: Option<String>) {
        self.chats_instance = instance;
    }

    pub fn chats(&self) -> &ChatListState {
        &self.chats
    }

    pub fn chats_mut(&mut self) -> &mut ChatListState {
        &mut self.chats
    }

    pub fn transcript(&self) -> &TranscriptState {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut TranscriptState {
        &mut self.transcript
    }

    pub fn composer(&self) -> &ComposerState {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut ComposerState {
        &mut self.composer
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn show_toast(&mut self, toast: Toast) {
        self.toast = Some(toast);
    }

    /// Clears an expired toast. Returns true when one was removed.
    pub fn expire_toast(&mut self, now: Instant) -> bool {
        if self.toast.as_ref().is_some_and(|toast| toast.is_expired(now)) {
            self.toast = None;
            return true;
        }

        false
    }
}
