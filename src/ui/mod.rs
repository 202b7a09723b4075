//! UI layer: terminal shell, event source and rendering.

mod composer;
mod event_source;
pub mod shell;
mod styles;
mod terminal;
mod transcript_rendering;
mod view;

pub(crate) use event_source::CrosstermEventSource;
pub(crate) use terminal::restore_terminal;

/// Returns the UI module name for smoke checks.
pub fn module_name() -> &'static str {
    "ui"
}
