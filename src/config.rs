use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_respawn_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Cadence of the shared memory poller inside the worker.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Delay before retrying a failed worker spawn/handshake.
    #[serde(default = "default_respawn_delay_ms")]
    pub respawn_delay_ms: u64,
    /// Override for the worker executable; defaults to `hwinfo-worker`
    /// next to the host binary.
    #[serde(default)]
    pub worker_path: Option<String>,
    /// Read the region from a raw dump file instead of live shared memory
    /// (testing/offline debugging).
    #[serde(default)]
    pub region_file: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            poll_interval_ms: default_poll_interval_ms(),
            respawn_delay_ms: default_respawn_delay_ms(),
            worker_path: None,
            region_file: None,
        }
    }
}

impl BridgeConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &PathBuf) -> Result<Self> {
        if !config_path.exists() {
            return Ok(BridgeConfig::default());
        }

        let data = fs::read(config_path)
            .with_context(|| format!("Failed to read config file: {config_path:?}"))?;

        // An empty or corrupted file falls back to defaults (this can happen
        // when the config format changes between versions).
        if data.is_empty() {
            return Ok(BridgeConfig::default());
        }
        Ok(serde_json::from_slice(&data).unwrap_or_default())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {parent:?}"))?;
        }
        let data = serde_json::to_vec_pretty(self).context("Failed to serialize config")?;
        fs::write(config_path, data)
            .with_context(|| format!("Failed to write config file: {config_path:?}"))?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("Could not determine config directory")?;
        Ok(base.join("hwinfo-bridge").join("config.json"))
    }
}
