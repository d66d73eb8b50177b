use std::{
  path::{
    Path,
    PathBuf,
  },
  time::Duration,
};

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

use crate::request::DEFAULT_CHANNEL_CAPACITY;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Io {
    path:   PathBuf,
    source: std::io::Error,
  },
  #[error("invalid cache config: {0}")]
  Parse(#[from] toml::de::Error),
}

/// Tuning for [`crate::VisibilityCache`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct CacheConfig {
  /// Collect status requests for this long before starting lookups. Zero
  /// starts every lookup as soon as it is requested.
  pub request_debounce_ms:      u64,
  /// Requests that do not fit are dropped and asked for again on the next
  /// read of the node.
  pub request_channel_capacity: usize,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      request_debounce_ms:      0,
      request_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
    }
  }
}

impl CacheConfig {
  pub fn request_debounce(&self) -> Duration {
    Duration::from_millis(self.request_debounce_ms)
  }

  pub fn from_toml_str(source: &str) -> Result<Self> {
    Ok(toml::from_str(source)?)
  }

  pub fn load(path: &Path) -> Result<Self> {
    let source = std::fs::read_to_string(path).map_err(|source| {
      ConfigError::Io {
        path: path.to_path_buf(),
        source,
      }
    })?;
    Self::from_toml_str(&source)
  }
}
