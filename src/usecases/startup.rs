use crate::infra::{
    error::AppError,
    session_store::{Session, SessionLock, SessionStore},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupFlowState {
    LaunchTui(Session),
    GuidedLogin,
}

pub struct StartupPlan {
    /// Held for the whole TUI run so two consoles never share a session.
    pub lock_guard: SessionLock,
    pub state: StartupFlowState,
}

pub fn plan_startup(store: &SessionStore) -> Result<StartupPlan, AppError> {
    let lock_guard = store.lock()?;

    let state = match store.load()? {
        Some(session) => StartupFlowState::LaunchTui(session),
        None => StartupFlowState::GuidedLogin,
    };

    Ok(StartupPlan { lock_guard, state })
}
