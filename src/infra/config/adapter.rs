use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::Result;

use crate::infra::{
    config::{load, AppConfig},
    contracts::ConfigAdapter,
};

const CONFIG_ENV_VAR: &str = "EVOMAN_CONFIG";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Reads `config.toml` from the first location that applies: the `--config`
/// flag, `$EVOMAN_CONFIG`, the working directory, then the user config dir.
#[derive(Debug, Clone)]
pub struct FileConfigAdapter {
    path: PathBuf,
}

impl FileConfigAdapter {
    pub fn new(explicit: Option<&Path>, config_dir: &Path) -> Self {
        let env_override = env::var_os(CONFIG_ENV_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        Self {
            path: resolve_config_path(explicit, env_override, config_dir),
        }
    }
}

impl ConfigAdapter for FileConfigAdapter {
    fn load(&self) -> Result<AppConfig> {
        tracing::debug!(path = %self.path.display(), "loading config");
        Ok(load(Some(&self.path))?)
    }
}

fn resolve_config_path(
    explicit: Option<&Path>,
    env_override: Option<PathBuf>,
    config_dir: &Path,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(path) = env_override {
        return path;
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }

    config_dir.join(CONFIG_FILE_NAME)
}
