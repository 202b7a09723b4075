//! Persisted console session: which server to talk to and with which key.

use std::{
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::infra::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub base_url: String,
    pub api_key: String,
    pub version: Option<String>,
    pub client_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
    lock_path: PathBuf,
}

/// Exclusive hold on the session store, released on drop.
#[derive(Debug)]
pub struct SessionLock {
    file: File,
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl SessionStore {
    pub fn new(path: PathBuf, lock_path: PathBuf) -> Self {
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>, AppError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(AppError::SessionIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        toml::from_str(&raw)
            .map(Some)
            .map_err(|source| AppError::SessionParse {
                path: self.path.clone(),
                source,
            })
    }

    pub fn save(&self, session: &Session) -> Result<(), AppError> {
        let encoded = toml::to_string(session).map_err(AppError::SessionEncode)?;
        let io_error = |source| AppError::SessionIo {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let mut file = owner_only_options()
            .open(&self.path)
            .map_err(io_error)?;
        file.write_all(encoded.as_bytes()).map_err(io_error)?;

        tracing::info!(path = %self.path.display(), "session saved");
        Ok(())
    }

    /// Removes the session. Returns whether a session existed.
    pub fn clear(&self) -> Result<bool, AppError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(AppError::SessionIo {
                path: self.path.clone(),
                source,
            }),
        }
    }

    pub fn lock(&self) -> Result<SessionLock, AppError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|source| AppError::SessionIo {
                path: self.lock_path.clone(),
                source,
            })?;

        file.try_lock_exclusive()
            .map_err(|_| AppError::SessionStoreBusy {
                path: self.lock_path.clone(),
            })?;

        Ok(SessionLock { file })
    }
}

#[cfg(unix)]
fn owner_only_options() -> OpenOptions {
    use std::os::unix::fs::OpenOptionsExt;

    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true).mode(0o600);
    options
}

#[cfg(not(unix))]
fn owner_only_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> SessionStore {
        SessionStore::new(dir.join("session.toml"), dir.join("session.lock"))
    }

    fn session() -> Session {
        Session {
            base_url: "https://evo.example.com".to_owned(),
            api_key: "429683C4C977415CAAFCCE10F7D57E11".to_owned(),
            version: Some("2.2.3".to_owned()),
            client_name: Some("evolution_exchange".to_owned()),
        }
    }

    #[test]
    fn load_returns_none_without_session_file() {
        let dir = tempfile::tempdir().expect("temp dir");

        assert_eq!(store(dir.path()).load().expect("load"), None);
    }

    #[test]
    fn saved_session_loads_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = store(dir.path());

        store.save(&session()).expect("save");

        assert_eq!(store.load().expect("load"), Some(session()));
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("temp dir");
        let store = store(dir.path());
        store.save(&session()).expect("save");

        let mode = fs::metadata(store.path()).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn clear_reports_whether_session_existed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = store(dir.path());
        store.save(&session()).expect("save");

        assert!(store.clear().expect("clear"));
        assert!(!store.clear().expect("second clear"));
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn corrupted_session_is_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = store(dir.path());
        fs::write(store.path(), "base_url = 3").expect("write");

        assert!(matches!(store.load(), Err(AppError::SessionParse { .. })));
    }

    #[test]
    fn second_lock_is_rejected_while_first_is_held() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = store(dir.path());

        let _first = store.lock().expect("first lock");
        // Lock files are per open file description, so a second handle conflicts.
        assert!(matches!(
            store.lock(),
            Err(AppError::SessionStoreBusy { .. })
        ));
    }
}
