//! Layered configuration: `qcost.toml`, then `QCOST_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use qcost_core::EngineConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// SQLite database file. A leading `~/` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  /// Allowed distance of the allocation sum from 100 %.
  #[serde(default)]
  pub allocation_tolerance: Option<f64>,
}

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/qcost/qcost.db") }

impl AppConfig {
  /// Read `path` if it exists, then apply environment overrides.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("QCOST"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")
  }

  pub fn engine(&self) -> EngineConfig {
    match self.allocation_tolerance {
      Some(allocation_tolerance) => EngineConfig { allocation_tolerance },
      None => EngineConfig::default(),
    }
  }

  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn from_toml(s: &str) -> AppConfig {
    config::Config::builder()
      .add_source(config::File::from_str(s, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn defaults_apply_to_empty_file() {
    let cfg = from_toml("");
    assert_eq!(cfg.store_path, default_store_path());
    assert_eq!(cfg.engine(), EngineConfig::default());
  }

  #[test]
  fn tolerance_overrides_engine_default() {
    let cfg = from_toml("store_path = \"/tmp/q.db\"\nallocation_tolerance = 0.5\n");
    assert_eq!(cfg.resolved_store_path(), PathBuf::from("/tmp/q.db"));
    assert_eq!(cfg.engine().allocation_tolerance, 0.5);
  }

  #[test]
  fn only_leading_tilde_is_expanded() {
    assert_eq!(expand_tilde(Path::new("/a/~/b")), PathBuf::from("/a/~/b"));
    assert_eq!(expand_tilde(Path::new("rel")), PathBuf::from("rel"));
  }
}
