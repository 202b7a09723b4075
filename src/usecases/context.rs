use crate::infra::{config::AppConfig, session_store::SessionStore, storage_layout::StorageLayout};

#[derive(Debug)]
pub struct AppContext {
    pub config: AppConfig,
    pub layout: StorageLayout,
    pub session_store: SessionStore,
}

impl AppContext {
    pub fn new(config: AppConfig, layout: StorageLayout) -> Self {
        let session_store = SessionStore::new(layout.session_file(), layout.session_lock_file());

        Self {
            config,
            layout,
            session_store,
        }
    }
}
