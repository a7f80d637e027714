use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Directory CSV exports and job descriptions are written to
  pub export_dir: Option<PathBuf>,
  /// Log file location (defaults to the platform data directory)
  pub log_file: Option<PathBuf>,
  /// Custom title for header
  pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Request timeout in seconds; unset means the transport default
  pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_secs: None,
    }
  }
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./jobdesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/jobdesk/config.yaml
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
    let local = PathBuf::from("jobdesk.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("jobdesk").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file deserializes to null
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Directory exports are written to.
  ///
  /// Uses `export_dir` when set, else the user's download directory, else cwd.
  pub fn export_dir(&self) -> PathBuf {
    match &self.export_dir {
      Some(dir) => expand_home(dir),
      None => dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
    }
  }

  /// Path of the log file.
  pub fn log_path(&self) -> Result<PathBuf> {
    if let Some(path) = &self.log_file {
      return Ok(expand_home(path));
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("jobdesk").join("jobdesk.log"))
  }

  /// Header title, defaulting to the application name.
  pub fn title(&self) -> &str {
    self.title.as_deref().unwrap_or("jobdesk")
  }

  /// Get the optional API bearer token from `JOBDESK_API_TOKEN`.
  pub fn get_api_token() -> Option<String> {
    std::env::var("JOBDESK_API_TOKEN")
      .ok()
      .filter(|t| !t.is_empty())
  }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
  match path.strip_prefix("~") {
    Ok(rest) => dirs::home_dir()
      .map(|home| home.join(rest))
      .unwrap_or_else(|| path.to_path_buf()),
    Err(_) => path.to_path_buf(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_full_config() {
    let config = Config::parse(
      r#"
api:
  base_url: http://jobs.internal:8080
  timeout_secs: 15
export_dir: /tmp/exports
title: Admin
"#,
    )
    .unwrap();

    assert_eq!(config.api.base_url, "http://jobs.internal:8080");
    assert_eq!(config.api.timeout_secs, Some(15));
    assert_eq!(config.export_dir(), PathBuf::from("/tmp/exports"));
    assert_eq!(config.title(), "Admin");
  }

  #[test]
  fn test_parse_empty_uses_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.api.timeout_secs, None);
    assert_eq!(config.title(), "jobdesk");
  }

  #[test]
  fn test_partial_api_section_keeps_default_url() {
    let config = Config::parse("api:\n  timeout_secs: 5\n").unwrap();
    assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.api.timeout_secs, Some(5));
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let result = Config::load(Some(Path::new("/definitely/not/here.yaml")));
    assert!(result.is_err());
  }

  #[test]
  fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobdesk.yaml");
    std::fs::write(&path, "api:\n  base_url: http://example.test\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.api.base_url, "http://example.test");
  }

  #[test]
  fn test_expand_home() {
    if let Some(home) = dirs::home_dir() {
      assert_eq!(expand_home(Path::new("~/exports")), home.join("exports"));
    }
    assert_eq!(expand_home(Path::new("/abs/path")), PathBuf::from("/abs/path"));
  }
}
