use std::{env, fs, path::PathBuf};

use crate::infra::error::AppError;

const APP_DIR_NAME: &str = "evoman";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub config_dir: PathBuf,
    pub log_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl StorageLayout {
    /// `XDG_CONFIG_HOME` wins over the platform default so tests and
    /// sandboxed runs can relocate everything.
    pub fn resolve() -> Result<Self, AppError> {
        let config_base = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(dirs::config_dir)
            .ok_or_else(|| AppError::StoragePathResolution {
                details: "unable to resolve config base directory (XDG_CONFIG_HOME/HOME)".into(),
            })?;

        Ok(Self::under(config_base.join(APP_DIR_NAME)))
    }

    pub fn under(config_dir: PathBuf) -> Self {
        Self {
            log_dir: config_dir.join("logs"),
            cache_dir: config_dir.join("cache"),
            config_dir,
        }
    }

    pub fn ensure_dirs(&self) -> Result<(), AppError> {
        for dir in [&self.config_dir, &self.log_dir, &self.cache_dir] {
            fs::create_dir_all(dir).map_err(|source| AppError::StorageDirCreate {
                path: dir.clone(),
                source,
            })?;
        }

        Ok(())
    }

    pub fn session_file(&self) -> PathBuf {
        self.config_dir.join("session.toml")
    }

    pub fn session_lock_file(&self) -> PathBuf {
        self.config_dir.join("session.lock")
    }

    /// Where the QR code for `instance` is written after a connect request.
    pub fn qr_code_file(&self, instance: &str) -> PathBuf {
        let safe: String = instance
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
            .collect();
        self.cache_dir.join(format!("qr-{safe}.png"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_logs_and_cache_live_under_config_dir() {
        let layout = StorageLayout::under(PathBuf::from("/tmp/evoman-layout"));

        assert!(layout.session_file().starts_with(&layout.config_dir));
        assert!(layout.log_dir.starts_with(&layout.config_dir));
        assert!(layout.cache_dir.starts_with(&layout.config_dir));
    }

    #[test]
    fn qr_file_name_is_sanitized() {
        let layout = StorageLayout::under(PathBuf::from("/tmp/evoman-layout"));

        assert_eq!(
            layout.qr_code_file("../sales team"),
            PathBuf::from("/tmp/evoman-layout/cache/qr-___sales_team.png")
        );
    }
}
