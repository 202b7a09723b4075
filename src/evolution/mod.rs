//! Evolution API integration: REST client, payload normalization and the
//! background poller.

pub mod client;
pub mod normalize;
pub mod poller;
pub mod wire;

/// Returns the evolution module name for smoke checks.
pub fn module_name() -> &'static str {
    "evolution"
}
