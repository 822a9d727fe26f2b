use std::path::{Path, PathBuf};

use anyhow::Context;
use marksheet_ledger::SyncMode;
use marksheet_server::ServerConfig;
use marksheet_store::StoreConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LEDGER_PATH: &str = "marksheet.ledger";

/// Contents of the `--config` file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub path: Option<PathBuf>,
    pub sync: SyncMode,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.store.validate()?;
        Ok(config)
    }

    /// `--config` if given, otherwise defaults.
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// `--data` wins over the config file, which wins over the default.
    pub fn ledger_path(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.ledger.path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_PATH))
    }
}
