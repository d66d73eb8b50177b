use std::path::Path;

use anyhow::{
  Context,
  Result,
};
use serde::Deserialize;
use vistree_lib::{
  CacheConfig,
  model::ModelConfig,
};

/// Contents of the file passed with `--config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
  pub cache: CacheConfig,
  pub model: ModelConfig,
}

impl AppConfig {
  pub fn load(path: &Path) -> Result<Self> {
    let source = std::fs::read_to_string(path)
      .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&source).with_context(|| format!("invalid config {}", path.display()))
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  #[test]
  fn reads_both_tables() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
      file,
      "[cache]\nrequest-debounce-ms = 5\n\n[model]\nlatency-ms = 10\nhidden = [\"wall-1\"]"
    )
    .unwrap();

    let config = AppConfig::load(file.path()).unwrap();
    assert_eq!(config.cache.request_debounce_ms, 5);
    assert_eq!(config.model.latency_ms, 10);
    assert_eq!(config.model.hidden, vec!["wall-1".to_string()]);
  }

  #[test]
  fn missing_tables_default() {
    let config: AppConfig = toml::from_str("").unwrap();
    assert_eq!(config, AppConfig::default());
  }

  #[test]
  fn unknown_table_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[theme]\nname = \"dark\"").unwrap();
    assert!(AppConfig::load(file.path()).is_err());
  }
}
