//! Background worker that keeps the chat list and the open transcript fresh
//! and carries out sends so the UI thread never waits on the network.
//!
//! Every cycle re-fetches the whole window; results are tagged with the epoch
//! of the target they were fetched for so the shell can drop stale ones.

use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError, SendError, Sender, TryRecvError},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    domain::events::{AppEvent, PollPayload, PollScope, SendOutcome},
    usecases::{
        contracts::{PollTarget, WorkerControl},
        list_chats::{list_chats, list_contacts, ChatsSource, ListChatsQuery},
        load_transcript::{fetch_messages, LoadTranscriptQuery, TranscriptSource},
        send_message::{send_message, MessageSender, SendMessageCommand},
    },
};

const POLLER_SHUTDOWN_FAILED: &str = "EVOLUTION_POLLER_SHUTDOWN_FAILED";
const POLLER_CONTROL_CLOSED: &str = "EVOLUTION_POLLER_CONTROL_CLOSED";
const GROUP_JID_SUFFIX: &str = "@g.us";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub message_limit: usize,
}

#[derive(Debug)]
enum WorkerCommand {
    Retarget(Option<PollTarget>),
    Refresh,
    Send(SendMessageCommand),
}

#[derive(Debug, thiserror::Error)]
pub enum PollerStartError {
    #[error("poller worker spawn failed: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

#[derive(Debug)]
pub struct TranscriptPoller {
    control_tx: Option<Sender<WorkerCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl TranscriptPoller {
    pub fn start<S>(
        source: S,
        settings: PollSettings,
        events: Sender<AppEvent>,
    ) -> Result<Self, PollerStartError>
    where
        S: ChatsSource + TranscriptSource + MessageSender + Send + 'static,
    {
        let (control_tx, control_rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("evoman-poller".to_owned())
            .spawn(move || {
                PollWorker {
                    source,
                    settings,
                    events,
                    target: None,
                    contacts_epoch: None,
                }
                .run(control_rx)
            })
            .map_err(PollerStartError::WorkerSpawn)?;

        Ok(Self {
            control_tx: Some(control_tx),
            worker: Some(worker),
        })
    }

    fn dispatch(&self, command: WorkerCommand) {
        let Some(control_tx) = &self.control_tx else {
            return;
        };

        if control_tx.send(command).is_err() {
            tracing::warn!(
                code = POLLER_CONTROL_CLOSED,
                "poller worker is gone; command dropped"
            );
        }
    }
}

impl WorkerControl for TranscriptPoller {
    fn retarget(&mut self, target: Option<PollTarget>) {
        self.dispatch(WorkerCommand::Retarget(target));
    }

    fn refresh(&mut self) {
        self.dispatch(WorkerCommand::Refresh);
    }

    fn send(&mut self, command: SendMessageCommand) {
        self.dispatch(WorkerCommand::Send(command));
    }
}

impl Drop for TranscriptPoller {
    fn drop(&mut self) {
        // Closing the channel is the stop signal.
        self.control_tx.take();

        if let Some(worker) = self.worker.take() {
            if let Err(error) = worker.join() {
                tracing::warn!(
                    code = POLLER_SHUTDOWN_FAILED,
                    error = ?error,
                    "poller worker panicked on shutdown"
                );
            }
        }
    }
}

struct PollWorker<S> {
    source: S,
    settings: PollSettings,
    events: Sender<AppEvent>,
    target: Option<PollTarget>,
    /// Epoch whose contacts were already delivered.
    contacts_epoch: Option<u64>,
}

impl<S> PollWorker<S>
where
    S: ChatsSource + TranscriptSource + MessageSender,
{
    fn run(mut self, control_rx: Receiver<WorkerCommand>) {
        loop {
            match control_rx.recv_timeout(self.settings.interval) {
                Ok(command) => {
                    if self.apply(command).is_err() {
                        return;
                    }
                    // Coalesce a burst of commands into a single fetch.
                    loop {
                        match control_rx.try_recv() {
                            Ok(command) => {
                                if self.apply(command).is_err() {
                                    return;
                                }
                            }
                            Err(TryRecvError::Empty) => break,
                            Err(TryRecvError::Disconnected) => return,
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }

            if self.poll_once().is_err() {
                tracing::debug!("event receiver dropped; poller exiting");
                return;
            }
        }
    }

    fn apply(&mut self, command: WorkerCommand) -> Result<(), SendError<AppEvent>> {
        match command {
            WorkerCommand::Retarget(target) => {
                tracing::debug!(
                    instance = target.as_ref().map(|target| target.instance.as_str()),
                    epoch = target.as_ref().map(|target| target.epoch),
                    "poller retargeted"
                );
                self.target = target;
                self.contacts_epoch = None;
            }
            WorkerCommand::Refresh => {}
            WorkerCommand::Send(command) => {
                let outcome = match send_message(&self.source, command) {
                    Ok(message_id) => SendOutcome::Sent { message_id },
                    Err(error) => SendOutcome::Failed {
                        reason: error.to_string(),
                    },
                };
                return self.events.send(AppEvent::SendCompleted(outcome));
            }
        }

        Ok(())
    }

    fn poll_once(&mut self) -> Result<(), SendError<AppEvent>> {
        let Some(target) = self.target.clone() else {
            return Ok(());
        };
        let epoch = target.epoch;

        let chats = match list_chats(&self.source, ListChatsQuery::new(target.instance.clone())) {
            Ok(output) => PollPayload::Chats(output.chats),
            Err(error) => PollPayload::Failed {
                scope: PollScope::Chats,
                reason: error.to_string(),
            },
        };
        self.emit(epoch, chats)?;

        let Some(remote_jid) = target.remote_jid.as_deref() else {
            return Ok(());
        };

        if remote_jid.ends_with(GROUP_JID_SUFFIX) && self.contacts_epoch != Some(epoch) {
            match list_contacts(&self.source, &target.instance) {
                Ok(contacts) => {
                    self.contacts_epoch = Some(epoch);
                    self.emit(epoch, PollPayload::Contacts(contacts))?;
                }
                // Senders fall back to their JIDs; retried next cycle.
                Err(error) => tracing::debug!(error = %error, "contacts fetch failed"),
            }
        }

        let query = LoadTranscriptQuery::new(target.instance.clone(), remote_jid, target.integration)
            .with_limit(self.settings.message_limit);
        let transcript = match fetch_messages(&self.source, &query) {
            Ok(messages) => PollPayload::Transcript(messages),
            Err(error) => PollPayload::Failed {
                scope: PollScope::Transcript,
                reason: error.to_string(),
            },
        };

        self.emit(epoch, transcript)
    }

    fn emit(&self, epoch: u64, payload: PollPayload) -> Result<(), SendError<AppEvent>> {
        self.events.send(AppEvent::Polled { epoch, payload })
    }
}
