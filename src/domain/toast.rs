use std::time::{Duration, Instant};

const TOAST_DURATION: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Error,
}

/// Transient notification shown in the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub text: String,
    until: Instant,
}

impl Toast {
    pub fn info(text: impl Into<String>, now: Instant) -> Self {
        Self::new(ToastKind::Info, text, now)
    }

    pub fn error(text: impl Into<String>, now: Instant) -> Self {
        Self::new(ToastKind::Error, text, now)
    }

    fn new(kind: ToastKind, text: impl Into<String>, now: Instant) -> Self {
        Self {
            kind,
            text: text.into(),
            until: now + TOAST_DURATION,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.until
    }
}
