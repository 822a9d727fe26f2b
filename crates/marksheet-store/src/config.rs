use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::keys::{KeyScheme, ScanWindow, DEFAULT_CAPACITY, DEFAULT_PREFIX};
use crate::service::LookupStrategy;
use crate::store::WriteMode;

/// Settings for a [`Marksheet`](crate::Marksheet) service.
///
/// Every field is optional in TOML; omitted fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub key_prefix: String,
    pub key_capacity: usize,
    pub lookup: LookupStrategy,
    pub write_mode: WriteMode,
    /// Explicit enumeration window. When unset the window is derived from
    /// the key scheme.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<ScanWindow>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_PREFIX.to_string(),
            key_capacity: DEFAULT_CAPACITY,
            lookup: LookupStrategy::default(),
            write_mode: WriteMode::default(),
            window: None,
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| StoreError::Config(format!("invalid store config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn key_scheme(&self) -> StoreResult<KeyScheme> {
        KeyScheme::new(self.key_prefix.clone(), self.key_capacity)
    }

    /// The configured window, or the key scheme's own window.
    pub fn scan_window(&self) -> StoreResult<ScanWindow> {
        match &self.window {
            Some(window) => {
                window.validate()?;
                Ok(window.clone())
            }
            None => Ok(self.key_scheme()?.scan_window()),
        }
    }

    pub fn validate(&self) -> StoreResult<()> {
        self.key_scheme()?;
        self.scan_window()?;
        Ok(())
    }
}
