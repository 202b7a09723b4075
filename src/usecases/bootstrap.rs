use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    infra::{
        self, config::FileConfigAdapter, contracts::ConfigAdapter, error::AppError,
        storage_layout::StorageLayout,
    },
    usecases::context::AppContext,
};

/// Loads config, prepares the storage directories and starts file logging.
/// The returned guard must outlive every log call.
pub fn bootstrap(config_path: Option<&Path>) -> Result<(AppContext, WorkerGuard), AppError> {
    let layout = StorageLayout::resolve()?;
    layout.ensure_dirs()?;

    let adapter = FileConfigAdapter::new(config_path, &layout.config_dir);
    let context = build_context(&adapter, layout)?;
    let guard = infra::logging::init(&context.config.logging, &context.layout.log_dir)?;

    Ok((context, guard))
}

fn build_context(
    config_adapter: &dyn ConfigAdapter,
    layout: StorageLayout,
) -> Result<AppContext, AppError> {
    let config = config_adapter.load().map_err(AppError::Other)?;

    Ok(AppContext::new(config, layout))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::infra::{config::AppConfig, stubs::StubConfigAdapter};

    #[test]
    fn builds_context_with_default_config_when_file_is_missing() {
        let layout = StorageLayout::under(PathBuf::from("/tmp/evoman-bootstrap"));
        let adapter = FileConfigAdapter::new(
            Some(Path::new("./missing-config.toml")),
            &layout.config_dir,
        );

        let context = build_context(&adapter, layout).expect("context should build from defaults");

        assert_eq!(context.config, AppConfig::default());
    }

    #[test]
    fn session_store_points_into_layout() {
        let layout = StorageLayout::under(PathBuf::from("/tmp/evoman-bootstrap"));

        let context =
            build_context(&StubConfigAdapter, layout.clone()).expect("context should build");

        assert_eq!(context.session_store.path(), layout.session_file());
    }
}
