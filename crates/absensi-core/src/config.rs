//! Application configuration management.
//!
//! Holds the document store project, an optional base URL override for a
//! local emulator, and the last signed-in user and class so the CLI can
//! default to them.
//!
//! Configuration is stored at `~/.config/absensi/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "absensi";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Seconds between user-list polls when none is configured.
pub const DEFAULT_USER_POLL_SECS: u64 = 15;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub project_id: Option<String>,
    pub base_url: Option<String>,
    pub last_uid: Option<String>,
    pub last_class: Option<String>,
    pub user_poll_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Local cache directory, one per project.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;

        let mut path = cache_dir.join(APP_NAME);
        if let Some(ref project) = self.project_id {
            path = path.join(project);
        }
        Ok(path)
    }

    pub fn user_poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.user_poll_secs.unwrap_or(DEFAULT_USER_POLL_SECS).max(1))
    }
}
