use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ApiError;

/// Client configuration.
///
/// All knobs have defaults matching the production backend's expectations, so
/// `ApiConfig::default()` with an overridden `base_url` is the common case.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Origin the API is served from (e.g. "https://campus.example.com").
  pub base_url: String,
  /// Path prefix every endpoint is rooted under, always starting at `/`.
  pub base_path: String,
  /// Per-attempt timeout in seconds.
  pub timeout_secs: u64,
  /// Extra attempts after the first, for server errors and network failures.
  pub retries: u32,
  /// Base backoff delay in milliseconds; attempt n waits `2^n * base`.
  pub backoff_base_ms: u64,
  /// Default TTL for opt-in GET caching, in seconds.
  pub cache_ttl_secs: u64,
  /// Timeout for the advisory health check, in seconds.
  pub health_timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:8080".to_string(),
      base_path: "/api".to_string(),
      timeout_secs: 30,
      retries: 3,
      backoff_base_ms: 1000,
      cache_ttl_secs: 60,
      health_timeout_secs: 5,
    }
  }
}

impl ApiConfig {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./campus.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/campus/config.yaml
  /// 4. ~/.config/campus/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self, ApiError> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(ApiError::Config(format!(
          "Config file not found: {}",
          p.display()
        )));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(ApiError::Config(
        "No configuration file found. Create one at ~/.config/campus/config.yaml".to_string(),
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("campus.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("campus").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self, ApiError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
      ApiError::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let config: ApiConfig = serde_yaml::from_str(&contents).map_err(|e| {
      ApiError::Config(format!(
        "Failed to parse config file {}: {}",
        path.display(),
        e
      ))
    })?;

    Ok(config)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  pub fn backoff_base(&self) -> Duration {
    Duration::from_millis(self.backoff_base_ms)
  }

  pub fn cache_ttl(&self) -> Duration {
    Duration::from_secs(self.cache_ttl_secs)
  }

  pub fn health_timeout(&self) -> Duration {
    Duration::from_secs(self.health_timeout_secs)
  }
}
