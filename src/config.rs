//! Engine configuration and config file resolution.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::playhead::EndPolicy;

/// Default config file name
pub const CONFIG_FILE: &str = "cuecast.json";

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Clock interval between ticks
    pub tick_interval_ms: u64,
    /// Cue duration for assets that don't set their own
    pub default_cue_duration_ms: u64,
    /// Behavior when a playhead passes its last cue
    pub end_policy: EndPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 10,
            default_cue_duration_ms: 100,
            end_policy: EndPolicy::Loop,
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn default_cue_duration(&self) -> Duration {
        Duration::from_millis(self.default_cue_duration_ms.max(1))
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load the resolved config file if it exists, otherwise defaults
    pub fn load_or_default(paths: &PathConfig) -> Result<Self> {
        let path = config_file(CONFIG_FILE, paths);
        if path.exists() {
            log::info!("Loading config: {}", path.display());
            Self::from_json_file(&path)
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

/// Configuration for overriding default config locations
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Priority: CLI args → ENV var (CUECAST_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| {
            std::env::var("CUECAST_CONFIG_DIR")
                .ok()
                .map(PathBuf::from)
        });

        Self { config_dir }
    }
}

/// Get path to a configuration file
///
/// Priority:
/// 1. CLI --config-dir argument / CUECAST_CONFIG_DIR
/// 2. Current directory IF it contains cuecast.json
/// 3. Platform config directory from dirs-next (e.g. ~/.config/cuecast)
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    get_config_dir(config).join(name)
}

fn get_config_dir(config: &PathConfig) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }

    if let Ok(current_dir) = std::env::current_dir() {
        if current_dir.join(CONFIG_FILE).exists() {
            return current_dir;
        }
    }

    if let Some(dir) = dirs_next::config_dir() {
        return dir.join("cuecast");
    }

    PathBuf::from(".")
}
