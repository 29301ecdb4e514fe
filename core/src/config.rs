//! Registry configuration and its JSON store.
//!
//! The configuration lives at `~/.portclaim/config.json` by default:
//!
//! ```json
//! {
//!   "heartbeatMs": 500,
//!   "include": [{ "from": 4200, "to": 4205 }],
//!   "exclude": [{ "from": 4203 }],
//!   "defaultRange": { "from": 8000, "to": 9000 }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::{PortRange, DEFAULT_RANGE};
use crate::error::{Error, Result};

/// Settings a registry is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Heartbeat period in milliseconds; `0` disables watchdogs.
    #[serde(default)]
    pub heartbeat_ms: i64,

    /// Ranges included at construction, in order.
    #[serde(default)]
    pub include: Vec<PortRange>,

    /// Ranges excluded at construction, in order.
    #[serde(default)]
    pub exclude: Vec<PortRange>,

    /// Range used for omitted bounds and when nothing is included.
    #[serde(default = "default_range")]
    pub default_range: PortRange,
}

fn default_range() -> PortRange {
    DEFAULT_RANGE
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            heartbeat_ms: 0,
            include: Vec::new(),
            exclude: Vec::new(),
            default_range: default_range(),
        }
    }
}

impl RegistryConfig {
    /// Create a config with defaults (no heartbeat, nothing included).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the heartbeat period in milliseconds.
    pub fn with_heartbeat_ms(mut self, heartbeat_ms: i64) -> Self {
        self.heartbeat_ms = heartbeat_ms;
        self
    }

    /// Append an included range.
    pub fn with_include(mut self, range: PortRange) -> Self {
        self.include.push(range);
        self
    }

    /// Append an excluded range.
    pub fn with_exclude(mut self, range: PortRange) -> Self {
        self.exclude.push(range);
        self
    }

    /// Set the default range.
    pub fn with_default_range(mut self, range: PortRange) -> Self {
        self.default_range = range;
        self
    }

    /// Validated heartbeat period; `None` when watchdogs are disabled.
    pub fn heartbeat(&self) -> Result<Option<Duration>> {
        match self.heartbeat_ms {
            ms if ms < 0 => Err(Error::InvalidHeartbeat(ms)),
            0 => Ok(None),
            ms => Ok(Some(Duration::from_millis(ms as u64))),
        }
    }
}

/// Configuration store reading and writing `RegistryConfig` as JSON.
pub struct ConfigStore {
    /// Path to the configuration file.
    config_path: PathBuf,
}

impl ConfigStore {
    /// Create a new config store with the default path.
    ///
    /// Default path: `~/.portclaim/config.json`
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

        let config_path = home.join(".portclaim").join("config.json");

        Ok(Self { config_path })
    }

    /// Create a config store with a custom path.
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Path of the configuration file.
    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk.
    ///
    /// Returns default config if the file doesn't exist.
    pub async fn load(&self) -> Result<RegistryConfig> {
        if !fs::try_exists(&self.config_path).await.unwrap_or(false) {
            return Ok(RegistryConfig::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        let config: RegistryConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;

        // Surface a bad heartbeat at load time rather than at registry construction.
        config.heartbeat()?;
        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub async fn save(&self, config: &RegistryConfig) -> Result<()> {
        if let Some(config_dir) = self.config_path.parent() {
            fs::create_dir_all(config_dir)
                .await
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(config)?;

        // Write atomically by writing to temp file then renaming
        let temp_path = self.config_path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to create temp config file: {}", e)))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        file.sync_all()
            .await
            .map_err(|e| Error::Config(format!("Failed to sync config: {}", e)))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to rename config file: {}", e)))?;

        Ok(())
    }
}
