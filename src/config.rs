use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::media::{SubscriberPolicy, DEFAULT_MAX_CONCURRENT};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// Feed file to show when none is given on the command line
  pub feed: Option<PathBuf>,
  #[serde(default)]
  pub media: MediaConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
  /// Fetches allowed on the wire at once
  #[serde(default = "default_max_concurrent")]
  pub max_concurrent_fetches: usize,
  #[serde(default = "default_timeout_secs")]
  pub request_timeout_secs: u64,
  /// Cap on cached payloads (LRU). Unbounded when absent.
  pub cache_max_entries: Option<NonZeroUsize>,
  /// Who is notified when several rows wait on the same fetch
  #[serde(default)]
  pub subscriber_policy: SubscriberPolicy,
}

impl Default for MediaConfig {
  fn default() -> Self {
    Self {
      max_concurrent_fetches: default_max_concurrent(),
      request_timeout_secs: default_timeout_secs(),
      cache_max_entries: None,
      subscriber_policy: SubscriberPolicy::default(),
    }
  }
}

impl MediaConfig {
  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }
}

fn default_max_concurrent() -> usize {
  DEFAULT_MAX_CONCURRENT
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Filter directive, overridden by RUST_LOG
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Where log files go (default: $XDG_DATA_HOME/mediafeed)
  pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      directory: None,
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./mediafeed.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/mediafeed/config.yaml
  ///
  /// Falls back to defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("mediafeed.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("mediafeed").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    if config.media.max_concurrent_fetches == 0 {
      return Err(eyre!(
        "Invalid config file {}: media.max_concurrent_fetches must be at least 1",
        path.display()
      ));
    }

    Ok(config)
  }

  /// Directory for log files.
  pub fn log_directory(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.log.directory {
      return Ok(dir.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("mediafeed"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
  }

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.media.max_concurrent_fetches, 4);
    assert_eq!(config.media.request_timeout(), Duration::from_secs(30));
    assert_eq!(config.media.cache_max_entries, None);
    assert_eq!(config.media.subscriber_policy, SubscriberPolicy::All);
    assert_eq!(config.log.level, "info");
  }

  #[test]
  fn test_load_full_file() {
    let file = write_config(
      r#"
feed: ./feed.yaml
media:
  max_concurrent_fetches: 2
  request_timeout_secs: 5
  cache_max_entries: 64
  subscriber_policy: latest_only
log:
  level: debug
  directory: /tmp/mediafeed-logs
"#,
    );

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.feed, Some(PathBuf::from("./feed.yaml")));
    assert_eq!(config.media.max_concurrent_fetches, 2);
    assert_eq!(config.media.request_timeout(), Duration::from_secs(5));
    assert_eq!(config.media.cache_max_entries, NonZeroUsize::new(64));
    assert_eq!(config.media.subscriber_policy, SubscriberPolicy::LatestOnly);
    assert_eq!(config.log.level, "debug");
    assert_eq!(
      config.log_directory().unwrap(),
      PathBuf::from("/tmp/mediafeed-logs")
    );
  }

  #[test]
  fn test_partial_file_uses_defaults() {
    let file = write_config("media:\n  cache_max_entries: 10\n");
    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.media.max_concurrent_fetches, 4);
    assert_eq!(config.media.cache_max_entries, NonZeroUsize::new(10));
    assert!(config.feed.is_none());
  }

  #[test]
  fn test_zero_cache_bound_rejected() {
    let file = write_config("media:\n  cache_max_entries: 0\n");
    assert!(Config::load(Some(file.path())).is_err());
  }

  #[test]
  fn test_zero_workers_rejected() {
    let file = write_config("media:\n  max_concurrent_fetches: 0\n");
    assert!(Config::load(Some(file.path())).is_err());
  }

  #[test]
  fn test_missing_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(Some(&dir.path().join("nope.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
