//! Runtime configuration, layered from an optional TOML file and `AZDO_*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use azdo_core::atomic::RetryPolicy;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CliConfig {
  /// SQLite file holding the key-value table. A leading `~/` is expanded.
  pub store_path:           PathBuf,
  pub retry_attempts:       u32,
  pub retry_backoff_ms:     u64,
  pub oauth_state_ttl_secs: u64,
}

impl Default for CliConfig {
  fn default() -> Self {
    Self {
      store_path:           PathBuf::from("azdo-store.sqlite3"),
      retry_attempts:       RetryPolicy::DEFAULT_ATTEMPTS,
      retry_backoff_ms:     RetryPolicy::DEFAULT_BACKOFF.as_millis() as u64,
      oauth_state_ttl_secs: 300,
    }
  }
}

impl CliConfig {
  /// Read `path` if it exists, then apply environment overrides such as
  /// `AZDO_STORE_PATH`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("AZDO").try_parsing(true))
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    settings
      .try_deserialize()
      .context("failed to deserialise CliConfig")
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy {
      max_attempts: self.retry_attempts,
      backoff:      Duration::from_millis(self.retry_backoff_ms),
    }
  }

  pub fn oauth_state_ttl(&self) -> Duration { Duration::from_secs(self.oauth_state_ttl_secs) }

  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
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

  fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("azdo-cli-{}-{name}.toml", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
  }

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = CliConfig::load(Path::new("/definitely/not/here.toml")).unwrap();
    assert_eq!(cfg.retry_policy(), RetryPolicy::default());
    assert_eq!(cfg.oauth_state_ttl(), Duration::from_secs(300));
  }

  #[test]
  fn file_values_override_defaults() {
    let path = scratch_file(
      "override",
      "store_path = \"/var/lib/azdo/store.db\"\nretry_attempts = 7\nretry_backoff_ms = 10\n",
    );
    let cfg = CliConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/azdo/store.db"));
    assert_eq!(cfg.retry_policy(), RetryPolicy {
      max_attempts: 7,
      backoff:      Duration::from_millis(10),
    });
    assert_eq!(cfg.oauth_state_ttl_secs, 300);
  }

  #[test]
  fn tilde_is_expanded_against_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }
}
