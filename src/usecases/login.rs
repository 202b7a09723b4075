//! Guided login: asks for the server URL and global API key, checks them
//! against the server and persists the session.

use std::io;

use crate::infra::{
    error::AppError,
    secrets::redact_text,
    session_store::{Session, SessionStore},
};

use super::contracts::SourceError;

const DEFAULT_ATTEMPTS: usize = 3;

/// What the server reports about itself once the credentials are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerHandshake {
    pub version: Option<String>,
    pub client_name: Option<String>,
}

pub trait CredentialsVerifier {
    fn verify(&mut self, base_url: &str, api_key: &str) -> Result<ServerHandshake, SourceError>;
}

pub trait AuthTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()>;
    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
    fn prompt_secret(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

pub struct StdTerminal;

impl AuthTerminal for StdTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()> {
        println!("{line}");
        Ok(())
    }

    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        use std::io::Write;

        print!("{prompt}");
        io::stdout().flush()?;

        let mut line = String::new();
        let bytes = io::stdin().read_line(&mut line)?;
        if bytes == 0 {
            return Ok(None);
        }

        Ok(Some(line.trim().to_owned()))
    }

    fn prompt_secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match rpassword::prompt_password(prompt) {
            Ok(secret) => Ok(Some(secret.trim().to_owned())),
            Err(source) if source.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(source) => Err(source),
        }
    }
}

/// Values supplied on the command line; missing ones are prompted for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginPreset {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Offered as the default URL when prompting.
    pub suggested_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(Session),
    ExitWithGuidance,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("terminal interaction failed: {0}")]
    Terminal(#[from] io::Error),
    #[error(transparent)]
    Store(#[from] AppError),
}

pub fn run_login(
    terminal: &mut dyn AuthTerminal,
    verifier: &mut dyn CredentialsVerifier,
    store: &SessionStore,
    preset: LoginPreset,
) -> Result<LoginOutcome, LoginError> {
    let LoginPreset {
        mut base_url,
        mut api_key,
        suggested_url,
    } = preset;

    for attempt in 1..=DEFAULT_ATTEMPTS {
        let attempts_left = DEFAULT_ATTEMPTS - attempt;

        let url = match base_url.take() {
            Some(url) => url,
            None => match collect_url(terminal, suggested_url.as_deref())? {
                Some(url) => url,
                None => return Ok(LoginOutcome::ExitWithGuidance),
            },
        };
        if !is_valid_url(&url) {
            terminal.print_line(&format!(
                "LOGIN_INVALID_URL: use http:// or https:// followed by a host. Attempts left: {attempts_left}"
            ))?;
            continue;
        }

        let key = match api_key.take() {
            Some(key) => key,
            None => match terminal.prompt_secret("Global API key: ")? {
                Some(key) => key,
                None => {
                    terminal.print_line("Input cancelled (EOF). Run evoman login to retry.")?;
                    return Ok(LoginOutcome::ExitWithGuidance);
                }
            },
        };
        if key.trim().is_empty() {
            terminal.print_line(&format!(
                "LOGIN_EMPTY_KEY: the API key cannot be empty. Attempts left: {attempts_left}"
            ))?;
            continue;
        }

        match verifier.verify(&url, &key) {
            Ok(server) => {
                let session = Session {
                    base_url: url.trim().trim_end_matches('/').to_owned(),
                    api_key: key.trim().to_owned(),
                    version: server.version,
                    client_name: server.client_name,
                };
                store.save(&session)?;

                terminal.print_line(&format!(
                    "Logged in to {} (version {}). Session saved.",
                    session.base_url,
                    session.version.as_deref().unwrap_or("unknown")
                ))?;
                return Ok(LoginOutcome::Authenticated(session));
            }
            Err(error) => report_verify_error(terminal, error, attempts_left)?,
        }
    }

    terminal.print_line("Login failed too many times. Check the server and run evoman login again.")?;
    Ok(LoginOutcome::ExitWithGuidance)
}

fn collect_url(
    terminal: &mut dyn AuthTerminal,
    suggested: Option<&str>,
) -> io::Result<Option<String>> {
    let prompt = match suggested {
        Some(url) => format!("Server URL [{url}]: "),
        None => "Server URL: ".to_owned(),
    };

    let Some(line) = terminal.prompt_line(&prompt)? else {
        terminal.print_line("Input cancelled (EOF). Run evoman login to retry.")?;
        return Ok(None);
    };

    if line.is_empty() {
        return Ok(Some(suggested.unwrap_or_default().to_owned()));
    }

    Ok(Some(line))
}

fn report_verify_error(
    terminal: &mut dyn AuthTerminal,
    error: SourceError,
    attempts_left: usize,
) -> io::Result<()> {
    let line = match error {
        SourceError::Unauthorized => format!(
            "LOGIN_INVALID_KEY: the server rejected the API key. Attempts left: {attempts_left}"
        ),
        SourceError::NotFound | SourceError::InvalidData => format!(
            "LOGIN_NOT_EVOLUTION: the URL does not answer like an Evolution server. Attempts left: {attempts_left}"
        ),
        SourceError::Unavailable => format!(
            "LOGIN_UNREACHABLE: the server did not answer. Check the URL and network. Attempts left: {attempts_left}"
        ),
        SourceError::Rejected(message) => format!(
            "LOGIN_REJECTED: {}. Attempts left: {attempts_left}",
            redact_text(&message)
        ),
    };

    terminal.print_line(&line)
}

fn is_valid_url(url: &str) -> bool {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));

    rest.and_then(|rest| rest.split('/').next())
        .is_some_and(|host| !host.is_empty() && !host.contains(char::is_whitespace))
}
