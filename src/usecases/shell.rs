use std::time::Instant;

use anyhow::Result;

use crate::{
    domain::{
        composer_state::ReplyTarget,
        events::{AppEvent, KeyInput, PollPayload, PollScope, SendOutcome},
        instance::Instance,
        list_state::ListUiState,
        quote::quote_preview,
        shell_state::{ActivePane, ShellState},
        toast::Toast,
        transcript_state::OpenChat,
    },
    infra::{
        contracts::{ClipboardAdapter, ExternalOpener},
        storage_layout::StorageLayout,
    },
};

use super::{
    contracts::{PollTarget, ShellOrchestrator, WorkerControl},
    instances::{self, ConnectOutcome, InstanceAdmin},
    load_transcript::reconcile,
    send_message::SendMessageCommand,
};

const SHELL_POLL_DISCARDED: &str = "SHELL_POLL_DISCARDED";
const SHELL_POLL_FAILED: &str = "SHELL_POLL_FAILED";
const SHELL_ACTION_FAILED: &str = "SHELL_ACTION_FAILED";

const PAGE_SCROLL_LINES: usize = 10;
const REPLY_PREVIEW_CHARS: usize = 60;

/// `backend` serves instance management directly; polling and sends go
/// through the `worker`.
pub struct DefaultShellOrchestrator<B, P, C, O>
where
    B: InstanceAdmin,
    P: WorkerControl,
    C: ClipboardAdapter,
    O: ExternalOpener,
{
    state: ShellState,
    backend: B,
    poller: P,
    clipboard: C,
    opener: O,
    layout: StorageLayout,
}

impl<B, P, C, O> DefaultShellOrchestrator<B, P, C, O>
where
    B: InstanceAdmin,
    P: WorkerControl,
    C: ClipboardAdapter,
    O: ExternalOpener,
{
    pub fn new(
        state: ShellState,
        backend: B,
        poller: P,
        clipboard: C,
        opener: O,
        layout: StorageLayout,
    ) -> Self {
        Self {
            state,
            backend,
            poller,
            clipboard,
            opener,
            layout,
        }
    }

    /// Initial load once the terminal is up.
    pub fn start(&mut self) {
        self.refresh_instances(Instant::now());
    }

    fn on_tick(&mut self, now: Instant) {
        self.state.expire_toast(now);
        self.state.transcript_mut().expire_highlight(now);
    }

    fn on_polled(&mut self, epoch: u64, payload: PollPayload, now: Instant) {
        let current = self.state.transcript().epoch();
        if epoch != current {
            tracing::debug!(
                code = SHELL_POLL_DISCARDED,
                stale_epoch = epoch,
                current_epoch = current,
                "poll result belongs to a previous selection"
            );
            return;
        }

        match payload {
            PollPayload::Chats(chats) => self.state.chats_mut().set_ready(chats),
            PollPayload::Contacts(contacts) => self.state.transcript_mut().set_contacts(contacts),
            PollPayload::Transcript(messages) => {
                self.state.transcript_mut().apply(epoch, reconcile(messages));
            }
            PollPayload::Failed { scope, reason } => {
                tracing::warn!(code = SHELL_POLL_FAILED, ?scope, reason = %reason, "poll failed");
                match scope {
                    PollScope::Chats => {
                        if self.state.chats().ui_state() == ListUiState::Loading {
                            self.state.chats_mut().set_error();
                        }
                    }
                    PollScope::Transcript => self.state.transcript_mut().set_error(epoch),
                }
                self.state.show_toast(Toast::error(reason, now));
            }
        }
    }

    fn on_key(&mut self, key: KeyInput, now: Instant) {
        if key.ctrl && key.key == "c" {
            self.state.stop();
            return;
        }

        if self.state.active_pane() == ActivePane::Composer {
            self.on_composer_key(&key, now);
            return;
        }

        match key.key.as_str() {
            "q" => self.state.stop(),
            "tab" => {
                let next = self.state.active_pane().next();
                self.state.set_active_pane(next);
            }
            "r" => {
                self.refresh_instances(now);
                self.poller.refresh();
            }
            "y" => self.copy_instance_token(now),
            "c" => self.connect_instance(now),
            _ => match self.state.active_pane() {
                ActivePane::Instances => self.on_instances_key(&key),
                ActivePane::Chats => self.on_chats_key(&key),
                ActivePane::Transcript => self.on_transcript_key(&key, now),
                ActivePane::Composer => {}
            },
        }
    }

    fn on_instances_key(&mut self, key: &KeyInput) {
        match key.key.as_str() {
            "j" | "down" => self.state.instances_mut().select_next(),
            "k" | "up" => self.state.instances_mut().select_previous(),
            "enter" => self.select_instance(),
            _ => {}
        }
    }

    fn on_chats_key(&mut self, key: &KeyInput) {
        match key.key.as_str() {
            "j" | "down" => self.state.chats_mut().select_next(),
            "k" | "up" => self.state.chats_mut().select_previous(),
            "enter" => self.open_selected_chat(),
            "esc" => self.state.set_active_pane(ActivePane::Instances),
            _ => {}
        }
    }

    fn on_transcript_key(&mut self, key: &KeyInput, now: Instant) {
        let transcript = self.state.transcript_mut();

        match key.key.as_str() {
            "j" | "down" => transcript.scroll_down(1),
            "k" | "up" => transcript.scroll_up(1),
            "pagedown" => transcript.scroll_down(PAGE_SCROLL_LINES),
            "pageup" => transcript.scroll_up(PAGE_SCROLL_LINES),
            "G" | "end" => transcript.scroll_to_bottom(),
            "o" => {
                if !transcript.follow_quote(now) {
                    self.state
                        .show_toast(Toast::info("Quoted message is not loaded", now));
                }
            }
            "i" => self.begin_compose(false),
            "R" => self.begin_compose(true),
            "esc" => self.state.set_active_pane(ActivePane::Chats),
            _ => {}
        }
    }

    fn on_composer_key(&mut self, key: &KeyInput, now: Instant) {
        let composer = self.state.composer_mut();
        if composer.is_sending() && key.key != "esc" {
            return;
        }

        match key.key.as_str() {
            "esc" => {
                if composer.is_empty() {
                    composer.set_reply_to(None);
                }
                self.state.set_active_pane(ActivePane::Transcript);
            }
            "enter" => self.send_draft(now),
            "backspace" => composer.backspace(),
            "left" => composer.move_left(),
            "right" => composer.move_right(),
            other => {
                let mut chars = other.chars();
                if let (Some(ch), None) = (chars.next(), chars.next()) {
                    if !composer.insert(ch) {
                        self.state
                            .show_toast(Toast::error("Message is too long", now));
                    }
                }
            }
        }
    }

    fn refresh_instances(&mut self, now: Instant) {
        match instances::list_instances(&self.backend) {
            Ok(list) => self.state.instances_mut().set_ready(list),
            Err(error) => {
                tracing::warn!(code = SHELL_ACTION_FAILED, error = %error, "instance list failed");
                self.state.instances_mut().set_error();
                self.state
                    .show_toast(Toast::error(format!("Instances: {error}"), now));
            }
        }
    }

    fn select_instance(&mut self) {
        let Some(instance) = self.state.instances().selected().cloned() else {
            return;
        };

        let transcript = self.state.transcript_mut();
        transcript.close();
        let epoch = transcript.epoch();

        self.state.chats_mut().set_loading();
        self.state.set_chats_instance(Some(instance.name.clone()));
        self.state.set_active_pane(ActivePane::Chats);
        self.poller.retarget(Some(PollTarget {
            instance: instance.name,
            integration: instance.integration,
            remote_jid: None,
            epoch,
        }));
    }

    fn open_selected_chat(&mut self) {
        let Some(chat) = self.state.chats().selected().cloned() else {
            return;
        };
        let Some(instance) = self.chats_instance() else {
            tracing::debug!("chat selected without an instance; ignoring");
            return;
        };

        if self
            .state
            .transcript()
            .chat()
            .is_some_and(|open| open.remote_jid == chat.remote_jid && open.instance == instance.name)
        {
            self.state.set_active_pane(ActivePane::Transcript);
            return;
        }

        let epoch = self.state.transcript_mut().open(OpenChat {
            instance: instance.name.clone(),
            integration: instance.integration,
            remote_jid: chat.remote_jid.clone(),
            title: chat.title,
        });
        self.state.composer_mut().set_reply_to(None);
        self.state.set_active_pane(ActivePane::Transcript);
        self.poller.retarget(Some(PollTarget {
            instance: instance.name,
            integration: instance.integration,
            remote_jid: Some(chat.remote_jid),
            epoch,
        }));
    }

    fn begin_compose(&mut self, reply: bool) {
        if !self.state.transcript().is_open() {
            return;
        }

        if reply {
            let transcript = self.state.transcript();
            let target = transcript
                .focused_index()
                .map(|index| &transcript.entries()[index].message)
                .and_then(|message| {
                    Some(ReplyTarget {
                        message_id: message.id.clone()?,
                        preview: quote_preview(message, REPLY_PREVIEW_CHARS),
                    })
                });
            self.state.composer_mut().set_reply_to(target);
        }

        self.state.set_active_pane(ActivePane::Composer);
    }

    fn send_draft(&mut self, now: Instant) {
        let Some(chat) = self.state.transcript().chat().cloned() else {
            return;
        };
        let composer = self.state.composer_mut();
        if !composer.begin_send() {
            return;
        }

        let command = SendMessageCommand {
            instance: chat.instance,
            recipient: chat.remote_jid,
            text: composer.text().to_owned(),
            quoted_id: composer.reply_to().map(|reply| reply.message_id.clone()),
        };
        self.poller.send(command);
        self.state.show_toast(Toast::info("Sending...", now));
    }

    fn on_send_completed(&mut self, outcome: SendOutcome, now: Instant) {
        match outcome {
            SendOutcome::Sent { message_id } => {
                tracing::debug!(message_id = message_id.as_deref(), "draft delivered");
                self.state.composer_mut().take();
                self.state.transcript_mut().scroll_to_bottom();
                if self.state.active_pane() == ActivePane::Composer {
                    self.state.set_active_pane(ActivePane::Transcript);
                }
                self.state.show_toast(Toast::info("Sent", now));
            }
            SendOutcome::Failed { reason } => {
                tracing::warn!(code = SHELL_ACTION_FAILED, reason = %reason, "send failed");
                self.state.composer_mut().cancel_send();
                self.state
                    .show_toast(Toast::error(format!("Send failed: {reason}"), now));
            }
        }
    }

    fn copy_instance_token(&mut self, now: Instant) {
        let Some(instance) = self.focused_instance() else {
            return;
        };
        let Some(token) = instance.token.filter(|token| !token.is_empty()) else {
            self.state.show_toast(Toast::info(
                format!("{} has no instance token", instance.name),
                now,
            ));
            return;
        };

        match self.clipboard.copy(&token) {
            Ok(()) => self.state.show_toast(Toast::info(
                format!("Token of {} copied", instance.name),
                now,
            )),
            Err(error) => {
                tracing::warn!(code = SHELL_ACTION_FAILED, error = %error, "clipboard copy failed");
                self.state
                    .show_toast(Toast::error("Clipboard unavailable", now));
            }
        }
    }

    fn connect_instance(&mut self, now: Instant) {
        let Some(instance) = self.focused_instance() else {
            return;
        };
        let qr_path = self.layout.qr_code_file(&instance.name);

        let toast = match instances::connect_instance(&self.backend, &instance.name, &qr_path) {
            Ok(ConnectOutcome::AlreadyConnected) => {
                Toast::info(format!("{} is already connected", instance.name), now)
            }
            Ok(ConnectOutcome::AwaitingScan {
                qr_file,
                pairing_code,
            }) => {
                if let Some(path) = &qr_file {
                    if let Err(error) = self.opener.open(&path.to_string_lossy()) {
                        tracing::warn!(code = SHELL_ACTION_FAILED, error = %error, "qr viewer failed");
                    }
                }
                match (qr_file, pairing_code) {
                    (_, Some(code)) => Toast::info(format!("Pairing code: {code}"), now),
                    (Some(path), None) => {
                        Toast::info(format!("Scan the QR code in {}", path.display()), now)
                    }
                    (None, None) => Toast::info("Waiting for pairing", now),
                }
            }
            Err(error) => {
                tracing::warn!(code = SHELL_ACTION_FAILED, error = %error, "connect failed");
                Toast::error(format!("Connect failed: {error}"), now)
            }
        };

        self.state.show_toast(toast);
        self.refresh_instances(now);
    }

    /// Instance the user is looking at: the highlighted row in the instance
    /// pane, otherwise the one whose chats are listed.
    fn focused_instance(&self) -> Option<Instance> {
        if self.state.active_pane() == ActivePane::Instances {
            return self.state.instances().selected().cloned();
        }

        self.chats_instance()
    }

    fn chats_instance(&self) -> Option<Instance> {
        let name = self.state.chats_instance()?;
        self.state
            .instances()
            .items()
            .iter()
            .find(|instance| instance.name == name)
            .cloned()
    }
}

impl<B, P, C, O> ShellOrchestrator for DefaultShellOrchestrator<B, P, C, O>
where
    B: InstanceAdmin,
    P: WorkerControl,
    C: ClipboardAdapter,
    O: ExternalOpener,
{
    fn state(&self) -> &ShellState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ShellState {
        &mut self.state
    }

    fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        let now = Instant::now();

        match event {
            AppEvent::Tick => self.on_tick(now),
            AppEvent::QuitRequested => self.state.stop(),
            AppEvent::InputKey(key) => self.on_key(key, now),
            AppEvent::Polled { epoch, payload } => self.on_polled(epoch, payload, now),
            AppEvent::SendCompleted(outcome) => self.on_send_completed(outcome, now),
        }

        Ok(())
    }
}
