use anyhow::{Context, Result};

use crate::infra::contracts::{ClipboardAdapter, ExternalOpener};

#[cfg(test)]
use crate::infra::{config::AppConfig, contracts::ConfigAdapter};

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct StubConfigAdapter;

#[cfg(test)]
impl ConfigAdapter for StubConfigAdapter {
    fn load(&self) -> Result<AppConfig> {
        Ok(AppConfig::default())
    }
}

/// Opens files and URLs with the desktop's default handler.
#[derive(Debug, Clone, Default)]
pub struct SystemOpener;

impl ExternalOpener for SystemOpener {
    fn open(&self, target: &str) -> Result<()> {
        open::that_detached(target).with_context(|| format!("failed to open {target}"))
    }
}

#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug, Clone, Default)]
pub struct NoopOpener;

impl ExternalOpener for NoopOpener {
    fn open(&self, _target: &str) -> Result<()> {
        Ok(())
    }
}

/// System clipboard; the handle is created per copy so a missing display
/// server only fails the copy itself.
#[derive(Debug, Clone, Default)]
pub struct SystemClipboard;

impl ClipboardAdapter for SystemClipboard {
    fn copy(&mut self, text: &str) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new().context("clipboard unavailable")?;
        clipboard
            .set_text(text.to_owned())
            .context("failed to write clipboard")
    }
}

#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug, Clone, Default)]
pub struct RecordingClipboard {
    pub copied: Option<String>,
}

impl ClipboardAdapter for RecordingClipboard {
    fn copy(&mut self, text: &str) -> Result<()> {
        self.copied = Some(text.to_owned());
        Ok(())
    }
}
