use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::activity::PassOrdering;

/// Config file looked up in the current directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = ".gh-activity-report.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No GitHub username configured: pass one on the command line or set GAR_USERNAME")]
    MissingUsername,

    #[error("No GitHub token configured: set GAR_GITHUB_TOKEN (or GITHUB_TOKEN)")]
    MissingToken,
}

/// Top-level configuration loaded from .gh-activity-report.toml.
/// All fields are optional; the file itself is optional too.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// User whose activity is reported. Falls back to GAR_USERNAME.
    pub username: Option<String>,
    /// API token. Falls back to GAR_GITHUB_TOKEN, then GITHUB_TOKEN.
    pub token: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            username: None,
            token: None,
            api_base_url: default_api_base_url(),
            per_page: default_per_page(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_per_page() -> u32 {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Where the raw event snapshot is stored between runs
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("output/initial_events.json")
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub ordering: PassOrdering,
}

impl Config {
    /// Load configuration from `path`, or from .gh-activity-report.toml in the
    /// current directory when no path is given (a missing default file yields
    /// the default config). Unset credentials are then taken from the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.fill_from_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Fill username and token from environment variables when the config
    /// file leaves them unset. File values take precedence.
    pub fn fill_from_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.github.username.is_none() {
            self.github.username = lookup("GAR_USERNAME");
        }
        if self.github.token.is_none() {
            self.github.token = lookup("GAR_GITHUB_TOKEN").or_else(|| lookup("GITHUB_TOKEN"));
        }
    }

    pub fn username(&self) -> Result<&str, ConfigError> {
        self.github
            .username
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or(ConfigError::MissingUsername)
    }

    pub fn token(&self) -> Result<&str, ConfigError> {
        self.github
            .token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingToken)
    }
}
