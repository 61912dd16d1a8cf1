use crate::domain::{NewDayPolicy, ParentToggle};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default tick interval in milliseconds
pub const DEFAULT_TICK_MS: u64 = 1000;

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

fn default_true() -> bool {
    true
}

/// Session settings stored in config.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub new_day_policy: NewDayPolicy,
    #[serde(default)]
    pub parent_toggle: ParentToggle,
    /// How often the watch loop refreshes timers
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Desktop notification when a timer runs out
    #[serde(default = "default_true")]
    pub notifications: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            new_day_policy: NewDayPolicy::default(),
            parent_toggle: ParentToggle::default(),
            tick_ms: DEFAULT_TICK_MS,
            notifications: true,
        }
    }
}

/// Load config from config.json, defaults when the file is absent
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: AppConfig = serde_json::from_str(&content)
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    Ok(config)
}

/// Save config to config.json
pub fn save_config<P: AsRef<Path>>(path: P, config: &AppConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    crate::persistence::atomic_write(path, &json)?;
    Ok(())
}
