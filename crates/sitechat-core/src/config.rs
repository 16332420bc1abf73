use crate::client::DEFAULT_ASK_URL;
use crate::typewriter::DEFAULT_CADENCE;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_URL: &str = "SITECHAT_API_URL";
pub const ENV_AJAX_URL: &str = "SITECHAT_AJAX_URL";
pub const ENV_NONCE: &str = "SITECHAT_NONCE";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Ask endpoint the chat widget POSTs queries to
    pub api_url: String,
    /// Host AJAX bridge used by the admin reindex trigger
    pub ajax_url: Option<String>,
    pub nonce: Option<String>,
    pub typing_interval_ms: u64,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_url: DEFAULT_ASK_URL.to_string(),
            ajax_url: None,
            nonce: None,
            typing_interval_ms: DEFAULT_CADENCE.as_millis() as u64,
            request_timeout_secs: None,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Apply environment overrides. Environment values win over the file.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(url) = lookup(ENV_AJAX_URL) {
            self.ajax_url = Some(url);
        }
        if let Some(nonce) = lookup(ENV_NONCE) {
            self.nonce = Some(nonce);
        }
        self
    }

    /// Delay between revealed characters
    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.typing_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("sitechat").join("config.json"))
    }
}
