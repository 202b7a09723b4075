use anyhow::Result;

use crate::infra::config::AppConfig;

pub trait ConfigAdapter {
    fn load(&self) -> Result<AppConfig>;
}

pub trait ExternalOpener {
    fn open(&self, target: &str) -> Result<()>;
}

pub trait ClipboardAdapter {
    fn copy(&mut self, text: &str) -> Result<()>;
}
