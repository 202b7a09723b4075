use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to initialize logging: {0}")]
    LoggingInit(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("failed to resolve storage paths: {details}")]
    StoragePathResolution { details: String },
    #[error("failed to create storage directory at {path}: {source}")]
    StorageDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to access session file at {path}: {source}")]
    SessionIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session file at {path} is corrupted: {source}")]
    SessionParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to encode session: {0}")]
    SessionEncode(#[source] toml::ser::Error),
    #[error("session store at {path} is used by another evoman process")]
    SessionStoreBusy { path: PathBuf },
    #[error("no saved session; run `evoman login` first")]
    NotLoggedIn,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
