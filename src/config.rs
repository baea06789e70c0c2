use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::chat::DEFAULT_TIMEOUT;
use crate::data::Period;
use crate::reply::DEFAULT_ENDPOINT;
use crate::tab::Tab;

pub const ENDPOINT_ENV: &str = "ECOTRACK_CHAT_ENDPOINT";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub chat_endpoint: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub default_tab: Option<String>,
    pub default_period: Option<String>,
    pub log_file: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            default_tab: Some(Tab::Admin.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// A missing file is not an error; it yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("config.json"))
    }
}

fn config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?;

    Ok(config_dir.join("ecotrack"))
}

fn default_log_file() -> PathBuf {
    config_dir()
        .map(|dir| dir.join("ecotrack.log"))
        .unwrap_or_else(|_| PathBuf::from("ecotrack.log"))
}

/// Values given on the command line or in the environment. Each one wins over
/// the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub env_endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub tab: Option<String>,
    pub period: Option<String>,
    pub log_file: Option<PathBuf>,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub endpoint: String,
    pub timeout: Duration,
    pub tab: Tab,
    pub period: Period,
    pub log_file: PathBuf,
}

impl Settings {
    /// Precedence: command line, then environment, then config file, then
    /// built-in defaults. Unparseable tab or period names fall through to the
    /// next source.
    pub fn resolve(config: &Config, overrides: Overrides) -> Self {
        let endpoint = overrides
            .endpoint
            .or(overrides.env_endpoint)
            .or_else(|| config.chat_endpoint.clone())
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let timeout = overrides
            .timeout_secs
            .or(config.request_timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        let tab = overrides
            .tab
            .as_deref()
            .and_then(Tab::from_str)
            .or_else(|| config.default_tab.as_deref().and_then(Tab::from_str))
            .unwrap_or_default();

        let period = overrides
            .period
            .as_deref()
            .and_then(Period::from_str)
            .or_else(|| config.default_period.as_deref().and_then(Period::from_str))
            .unwrap_or_default();

        let log_file = overrides
            .log_file
            .or_else(|| config.log_file.as_ref().map(PathBuf::from))
            .unwrap_or_else(default_log_file);

        Self {
            endpoint,
            timeout,
            tab,
            period,
            log_file,
        }
    }
}
