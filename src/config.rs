use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Initiative whose activities are shown on startup
  pub default_initiative: Option<i64>,
  /// Custom title for header (defaults to API domain if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub permissions: PermissionsConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub url: String,
  /// Request timeout for every API call
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: String::new(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionsConfig {
  /// Entity class the activity list is scoped to
  #[serde(default = "default_parent_class")]
  pub parent_class: String,
  /// Field that must be granted on the parent to create or edit activities
  #[serde(default = "default_gate_field")]
  pub gate_field: String,
}

impl Default for PermissionsConfig {
  fn default() -> Self {
    Self {
      parent_class: default_parent_class(),
      gate_field: default_gate_field(),
    }
  }
}

fn default_parent_class() -> String {
  "Initiative".to_string()
}

fn default_gate_field() -> String {
  "activities".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Filter directive used when RUST_LOG is unset (e.g. "info", "fundsctl=debug")
  pub level: Option<String>,
  /// Log directory (defaults to $XDG_DATA_HOME/fundsctl/logs)
  pub directory: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./fundsctl.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/fundsctl/config.yaml
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
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/fundsctl/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("fundsctl.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("fundsctl").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    if config.api.url.trim().is_empty() {
      return Err(eyre!("api.url must not be empty"));
    }
    Ok(config)
  }
}
