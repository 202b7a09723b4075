//! Domain layer: console entities and the transcript reconciliation pipeline.

pub mod autoscroll;
pub mod chat;
pub mod composer_state;
pub mod events;
pub mod instance;
pub mod list_state;
pub mod message;
pub mod ordering;
pub mod quote;
pub mod reactions;
pub mod shell_state;
pub mod toast;
pub mod transcript_state;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}
