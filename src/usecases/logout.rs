use std::{fs, io::ErrorKind};

use crate::infra::{error::AppError, session_store::SessionStore, storage_layout::StorageLayout};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub session_removed: bool,
    pub qr_codes_removed: usize,
}

/// Forgets the saved server session and the QR images cached for it.
pub fn logout(store: &SessionStore, layout: &StorageLayout) -> Result<LogoutOutcome, AppError> {
    let session_removed = store.clear()?;
    let qr_codes_removed = remove_cached_qr_codes(layout)?;

    tracing::info!(session_removed, qr_codes_removed, "logged out");

    Ok(LogoutOutcome {
        session_removed,
        qr_codes_removed,
    })
}

fn remove_cached_qr_codes(layout: &StorageLayout) -> Result<usize, AppError> {
    let io_error = |source| AppError::SessionIo {
        path: layout.cache_dir.clone(),
        source,
    };

    let entries = match fs::read_dir(&layout.cache_dir) {
        Ok(entries) => entries,
        Err(source) if source.kind() == ErrorKind::NotFound => return Ok(0),
        Err(source) => return Err(io_error(source)),
    };

    let mut removed = 0;
    for entry in entries {
        let path = entry.map_err(io_error)?.path();
        let is_qr_code = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("qr-") && name.ends_with(".png"));

        if is_qr_code {
            fs::remove_file(&path).map_err(io_error)?;
            removed += 1;
        }
    }

    Ok(removed)
}
