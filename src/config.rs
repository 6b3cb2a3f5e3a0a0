use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

pub const CONFIG_FILE_NAME: &str = "config.json";
const TICK_OVERRIDE_ENV: &str = "KILN_REST_TICK_MS";

/// Tunables for the rest countdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RestTimerConfig {
    /// How often a running countdown republishes its remaining time
    pub tick_interval_ms: u64,

    /// Rest used when a completed set has no resolvable catalog entry
    pub fallback_rest_seconds: u32,
}

impl Default for RestTimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            fallback_rest_seconds: 120,
        }
    }
}

impl RestTimerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImportConfig {
    /// Sessions written per transaction
    pub batch_size: usize,

    /// Session names that get a template generated after import
    pub template_names: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            template_names: vec![
                "New Legs/full Body A".to_string(),
                "New Legs/full Body B".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub rest_timer: RestTimerConfig,
    pub import: ImportConfig,
}

impl AppConfig {
    /// Read `config.json` from `data_dir`. A missing file yields defaults; a
    /// file that does not parse is an error.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config at {}", path.display()))?
        } else {
            AppConfig::default()
        };

        config.apply_env_overrides(std::env::var(TICK_OVERRIDE_ENV).ok().as_deref());
        info!(
            "Loaded config: tick={}ms, batch_size={}",
            config.rest_timer.tick_interval_ms, config.import.batch_size
        );
        Ok(config)
    }

    fn apply_env_overrides(&mut self, tick_ms: Option<&str>) {
        let Some(raw) = tick_ms else {
            return;
        };
        match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => self.rest_timer.tick_interval_ms = value,
            _ => warn!("Ignoring invalid {TICK_OVERRIDE_ENV} value: {raw:?}"),
        }
    }
}
