//! Use case layer: application workflows and orchestration.

pub mod bootstrap;
pub mod context;
pub mod contracts;
pub mod instances;
pub mod list_chats;
pub mod load_transcript;
pub mod login;
pub mod logout;
pub mod send_message;
pub mod shell;
pub mod startup;

/// Returns the usecases module name for smoke checks.
pub fn module_name() -> &'static str {
    "usecases"
}
