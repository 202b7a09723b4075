use std::panic;

const REDACTED: &str = "[REDACTED]";

const SENSITIVE_MARKERS: [&str; 5] = ["apikey", "api_key", "token", "secret", "password"];

pub fn redact_text(input: &str) -> String {
    input
        .split_whitespace()
        .map(redact_chunk)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Shows only the edges of a credential, e.g. `B6D7…2F1A`.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}\u{2026}{tail}")
}

/// Replaces the panic report with a redacted one. `before_report` runs
/// first so the terminal can leave raw mode before anything is printed.
pub fn install_panic_redaction_hook(before_report: fn()) {
    panic::set_hook(Box::new(move |panic_info| {
        before_report();

        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic payload omitted".to_owned());

        let scrubbed = redact_text(&payload);

        match panic_info.location() {
            Some(location) => eprintln!(
                "evoman panic: {} at {}:{}",
                scrubbed,
                location.file(),
                location.line()
            ),
            None => eprintln!("evoman panic: {scrubbed}"),
        }
    }));
}

fn redact_chunk(chunk: &str) -> String {
    let lowered = chunk.to_ascii_lowercase();
    if SENSITIVE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
        || looks_like_credential(chunk)
    {
        REDACTED.to_owned()
    } else {
        chunk.to_owned()
    }
}

/// Evolution API keys and instance tokens are long hex/alphanumeric runs.
fn looks_like_credential(value: &str) -> bool {
    let cleaned = value.trim_matches(|ch: char| !ch.is_ascii_alphanumeric() && ch != '-');

    let has_letters = cleaned.chars().any(|ch| ch.is_ascii_alphabetic());
    let has_digits = cleaned.chars().any(|ch| ch.is_ascii_digit());
    let charset_ok = cleaned
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-');

    cleaned.len() >= 20 && has_letters && has_digits && charset_ok
}
