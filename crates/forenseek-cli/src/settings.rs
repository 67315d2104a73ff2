//! Layered client configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the TOML config file,
//! `FORENSEEK_*` environment variables. Command-line flags are applied on top
//! by `main`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://backend-forenseek.onrender.com/api";

/// Runtime configuration, deserialised from the config file and environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// API root, including the `/api` prefix.
  pub base_url:     String,
  /// SQLite file holding the session and the evidence outbox.
  pub store_path:   PathBuf,
  pub timeout_secs: u64,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      base_url:     DEFAULT_BASE_URL.to_string(),
      store_path:   PathBuf::from("~/.local/share/forenseek/forenseek.db"),
      timeout_secs: 30,
    }
  }
}

impl Settings {
  /// Load settings from `path` (or the default config location) and the
  /// environment. A missing file is not an error.
  pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
    let path = path
      .map(Path::to_path_buf)
      .unwrap_or_else(|| expand_tilde(Path::new("~/.config/forenseek/config.toml")));

    let settings: Settings = config::Config::builder()
      .add_source(config::File::from(path.clone()).required(false))
      .add_source(config::Environment::with_prefix("FORENSEEK").try_parsing(true))
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?
      .try_deserialize()
      .context("failed to deserialise settings")?;

    Ok(settings.expanded())
  }

  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

  fn expanded(mut self) -> Self {
    self.store_path = expand_tilde(&self.store_path);
    self
  }
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
