use std::{path::Path, sync::mpsc, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::{
    cli::{Cli, Command, InstanceCommand, SendMediaArgs},
    domain::{
        self,
        instance::{Instance, IntegrationType},
        ordering::TranscriptEntry,
        shell_state::ShellState,
        transcript_state::TranscriptState,
    },
    evolution::{
        self,
        client::{EvolutionClient, HttpCredentialsVerifier, ServerContext},
        poller::{PollSettings, TranscriptPoller},
    },
    infra::{
        self,
        config::AppConfig,
        contracts::ExternalOpener,
        error::AppError,
        secrets::mask_secret,
        session_store::Session,
        stubs::{SystemClipboard, SystemOpener},
        storage_layout::StorageLayout,
    },
    ui,
    usecases::{
        self, bootstrap,
        context::AppContext,
        instances::{self, ConnectOutcome, CreateInstanceRequest},
        list_chats::{list_chats, ListChatsQuery},
        load_transcript::{load_transcript, LoadTranscriptQuery},
        login::{run_login, LoginOutcome, LoginPreset, StdTerminal},
        logout::logout,
        send_message::{send_media, send_message, SendMediaCommand, SendMessageCommand},
        shell::DefaultShellOrchestrator,
        startup::{plan_startup, StartupFlowState},
    },
};

const LOGIN_TUI_BOOTSTRAP_FAILED: &str = "LOGIN_TUI_BOOTSTRAP_FAILED";

pub fn run(cli: Cli) -> Result<()> {
    let command = cli.command_or_default();
    if matches!(command, Command::Logout) {
        return run_logout(cli.config.as_deref());
    }

    let (context, _log_guard) = bootstrap::bootstrap(cli.config.as_deref())?;
    tracing::debug!(
        ui = ui::module_name(),
        domain = domain::module_name(),
        evolution = evolution::module_name(),
        usecases = usecases::module_name(),
        infra = infra::module_name(),
        "module boundaries loaded"
    );

    match command {
        Command::Run => run_shell(&context)?,
        Command::Login { url, api_key } => {
            let preset = LoginPreset {
                base_url: url,
                api_key,
                suggested_url: context.config.server.base_url.clone(),
            };
            run_guided_login(&context, preset)?;
        }
        Command::Logout => report_logout(&context)?,
        Command::Instances => {
            let client = session_client(&context)?;
            for instance in instances::list_instances(&client)? {
                println!("{}", instance_line(&instance));
            }
        }
        Command::Instance { action } => run_instance_command(&context, action)?,
        Command::Chats { instance, limit } => {
            let client = session_client(&context)?;
            let mut query = ListChatsQuery::new(instance);
            if let Some(limit) = limit {
                query.limit = limit;
            }
            for chat in list_chats(&client, query)?.chats {
                let unread = match chat.unread_count {
                    0 => String::new(),
                    count => format!(" ({count} unread)"),
                };
                println!("{}\t{}{unread}", chat.remote_jid, chat.title);
            }
        }
        Command::Transcript {
            instance,
            remote_jid,
            limit,
        } => {
            let client = session_client(&context)?;
            let integration = integration_of(&client, &instance);
            let mut query = LoadTranscriptQuery::new(instance, remote_jid, integration);
            if let Some(limit) = limit {
                query = query.with_limit(limit);
            }
            for line in transcript_lines(&load_transcript(&client, query)?) {
                println!("{line}");
            }
        }
        Command::Send {
            instance,
            number,
            text,
            quote,
        } => {
            let client = session_client(&context)?;
            let sent = send_message(
                &client,
                SendMessageCommand {
                    instance,
                    recipient: number,
                    text,
                    quoted_id: quote,
                },
            )?;
            print_sent(sent);
        }
        Command::SendMedia(SendMediaArgs {
            instance,
            number,
            file,
            caption,
            quote,
        }) => {
            let client = session_client(&context)?;
            let sent = send_media(
                &client,
                SendMediaCommand {
                    instance,
                    recipient: number,
                    file,
                    caption,
                    quoted_id: quote,
                },
            )?;
            print_sent(sent);
        }
    }

    Ok(())
}

fn run_shell(context: &AppContext) -> Result<()> {
    let startup = plan_startup(&context.session_store)?;

    match startup.state {
        StartupFlowState::LaunchTui(session) => launch_tui(context, &session),
        StartupFlowState::GuidedLogin => {
            tracing::info!("no saved session, starting guided login");
            let preset = LoginPreset {
                suggested_url: context.config.server.base_url.clone(),
                ..LoginPreset::default()
            };

            if let Some(session) = run_guided_login(context, preset)? {
                if let Err(error) = launch_tui(context, &session) {
                    report_post_login_tui_failure(&error);
                }
            }
            Ok(())
        }
    }
}

fn run_guided_login(context: &AppContext, preset: LoginPreset) -> Result<Option<Session>> {
    let mut terminal = StdTerminal;
    let mut verifier = HttpCredentialsVerifier::new(request_timeout(&context.config));

    match run_login(&mut terminal, &mut verifier, &context.session_store, preset)? {
        LoginOutcome::Authenticated(session) => Ok(Some(session)),
        LoginOutcome::ExitWithGuidance => Ok(None),
    }
}

fn launch_tui(context: &AppContext, session: &Session) -> Result<()> {
    let client = build_client(&context.config, session)?;
    let (events_tx, events_rx) = mpsc::channel();

    let poller = TranscriptPoller::start(
        client.clone(),
        PollSettings {
            interval: Duration::from_millis(context.config.polling.interval_ms),
            message_limit: context.config.polling.message_limit,
        },
        events_tx,
    )?;

    let state = ShellState::new(
        session.base_url.clone(),
        TranscriptState::with_pin_threshold(context.config.transcript.pin_threshold_rows),
    );
    let mut orchestrator = DefaultShellOrchestrator::new(
        state,
        client,
        poller,
        SystemClipboard,
        SystemOpener,
        context.layout.clone(),
    );
    orchestrator.start();

    let mut event_source = ui::CrosstermEventSource::new(events_rx);
    ui::shell::start(context, &mut event_source, &mut orchestrator)
}

fn run_instance_command(context: &AppContext, action: InstanceCommand) -> Result<()> {
    let client = session_client(context)?;

    match action {
        InstanceCommand::Create {
            name,
            integration,
            token,
            number,
        } => {
            let created = instances::create_instance(
                &client,
                CreateInstanceRequest {
                    name,
                    integration: integration.into(),
                    token,
                    number,
                },
            )?;
            println!("Created {}", instance_line(&created));
        }
        InstanceCommand::Delete { name } => {
            instances::delete_instance(&client, &name)?;
            println!("Deleted instance {name}.");
        }
        InstanceCommand::Connect { name } => {
            let qr_path = context.layout.qr_code_file(&name);
            match instances::connect_instance(&client, &name, &qr_path)? {
                ConnectOutcome::AlreadyConnected => {
                    println!("Instance {name} is already connected.");
                }
                ConnectOutcome::AwaitingScan {
                    qr_file,
                    pairing_code,
                } => {
                    if let Some(code) = pairing_code {
                        println!("Pairing code: {code}");
                    }
                    if let Some(path) = qr_file {
                        let target = path.to_string_lossy();
                        println!("QR code saved to {target}");
                        if let Err(error) = SystemOpener.open(&target) {
                            tracing::warn!(error = %error, "failed to open QR code image");
                        }
                    }
                }
            }
        }
        InstanceCommand::State { name } => {
            let status = instances::connection_state(&client, &name)?;
            println!("{name}: {}", status.label());
        }
        InstanceCommand::Restart { name } => {
            instances::restart_instance(&client, &name)?;
            println!("Restarted instance {name}.");
        }
        InstanceCommand::Logout { name } => {
            instances::logout_instance(&client, &name)?;
            println!("Instance {name} logged out of WhatsApp.");
        }
    }

    Ok(())
}

fn run_logout(config_path: Option<&Path>) -> Result<()> {
    let (context, _log_guard) = match bootstrap::bootstrap(config_path) {
        Ok((context, guard)) => (context, Some(guard)),
        Err(error) => {
            tracing::warn!(
                error = ?error,
                "logout fallback: bootstrap failed, continuing with local cleanup"
            );
            (fallback_context()?, None)
        }
    };

    report_logout(&context)
}

fn report_logout(context: &AppContext) -> Result<()> {
    let outcome = logout(&context.session_store, &context.layout)?;
    tracing::info!(
        session_removed = outcome.session_removed,
        qr_codes_removed = outcome.qr_codes_removed,
        "logout completed"
    );

    if outcome.session_removed {
        println!("Logged out. Run evoman login to connect to a server again.");
    } else {
        println!("No saved session. Nothing to log out from.");
    }
    Ok(())
}

fn fallback_context() -> Result<AppContext, AppError> {
    let layout = StorageLayout::resolve()?;
    Ok(AppContext::new(AppConfig::default(), layout))
}

fn session_client(context: &AppContext) -> Result<EvolutionClient> {
    let session = context.session_store.load()?.ok_or(AppError::NotLoggedIn)?;
    build_client(&context.config, &session)
}

fn build_client(config: &AppConfig, session: &Session) -> Result<EvolutionClient> {
    EvolutionClient::new(ServerContext::from_session(session), request_timeout(config))
        .context("failed to build HTTP client")
}

fn request_timeout(config: &AppConfig) -> Duration {
    Duration::from_millis(config.server.request_timeout_ms)
}

/// Business instances read messages through a different endpoint, so the
/// integration is looked up first; unknown instances use the native one.
fn integration_of(client: &EvolutionClient, instance: &str) -> IntegrationType {
    match instances::list_instances(client) {
        Ok(list) => list
            .into_iter()
            .find(|candidate| candidate.name == instance)
            .map(|candidate| candidate.integration)
            .unwrap_or_default(),
        Err(error) => {
            tracing::warn!(instance, error = %error, "instance lookup failed");
            IntegrationType::default()
        }
    }
}

fn instance_line(instance: &Instance) -> String {
    let mut line = format!(
        "{}\t{}\t{}",
        instance.name,
        instance.status.label(),
        instance.integration
    );
    if let Some(number) = instance.owner_number() {
        line.push_str(&format!("\t+{number}"));
    }
    if let Some(token) = instance.token.as_deref() {
        line.push_str(&format!("\ttoken {}", mask_secret(token)));
    }
    line
}

fn transcript_lines(entries: &[TranscriptEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let message = &entry.message;
            let time = message
                .timestamp
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "----------------".to_owned());
            let sender = if message.from_me {
                "You".to_owned()
            } else {
                message
                    .push_name
                    .clone()
                    .unwrap_or_else(|| message.sender_id())
            };

            let mut line = format!("[{time}] {sender}: {}", message.display_content());
            if let Some(reactions) = message.reactions.as_deref().filter(|r| !r.is_empty()) {
                let emojis: Vec<&str> = reactions.iter().map(|r| r.emoji.as_str()).collect();
                line.push_str(&format!("  {}", emojis.join(" ")));
            }
            line
        })
        .collect()
}

fn print_sent(message_id: Option<String>) {
    match message_id {
        Some(id) => println!("Sent (id {id})."),
        None => println!("Sent."),
    }
}

fn report_post_login_tui_failure(error: &anyhow::Error) {
    tracing::error!(
        code = LOGIN_TUI_BOOTSTRAP_FAILED,
        error = ?error,
        "TUI failed to start after a successful login"
    );

    for line in post_login_tui_fallback_lines(LOGIN_TUI_BOOTSTRAP_FAILED) {
        eprintln!("{line}");
    }
}

fn post_login_tui_fallback_lines(error_code: &str) -> [String; 3] {
    [
        "Login successful. Session is saved.".to_owned(),
        format!("{error_code}: TUI failed to start in this run."),
        "Please restart evoman to enter the TUI using the saved session.".to_owned(),
    ]
}
