//! Tracker configuration: `[tracker]` table of `~/.config/tokenmeter/config.toml`, then
//! `TOKENMETER_*` environment overrides.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::capacity::{UsageThresholds, DEFAULT_LIMITING_RATIO};
use crate::catalog::DEFAULT_MODELS_DEV_URL;

pub use env_config::LoadError as ConfigLoadError;

/// App name used for the XDG config directory.
pub const APP_NAME: &str = "tokenmeter";

pub const DEFAULT_TOKENIZER_URL: &str = "http://127.0.0.1:8000/api/v1/tokens/estimate";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Quiet window before draft text is sent to the tokenizer.
    pub debounce_ms: u64,
    pub tokenizer_url: String,
    pub catalog_url: String,
    /// Local catalog file; takes precedence over `catalog_url`.
    pub catalog_path: Option<PathBuf>,
    pub limiting_ratio: f64,
    pub warning_percent: f64,
    pub critical_percent: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        let thresholds = UsageThresholds::default();
        Self {
            debounce_ms: 600,
            tokenizer_url: DEFAULT_TOKENIZER_URL.to_string(),
            catalog_url: DEFAULT_MODELS_DEV_URL.to_string(),
            catalog_path: None,
            limiting_ratio: DEFAULT_LIMITING_RATIO,
            warning_percent: thresholds.warning_percent,
            critical_percent: thresholds.critical_percent,
        }
    }
}

impl TrackerConfig {
    /// Loads `.env` / XDG `[env]` into the environment, reads the `[tracker]` table, then
    /// applies environment overrides.
    pub fn load(app_name: &str) -> Result<Self, ConfigLoadError> {
        env_config::load_and_apply(app_name, None)?;
        let mut config: Self = env_config::load_section(app_name, "tracker")?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overrides from `TOKENMETER_*` variables. Unparseable numbers are ignored.
    pub fn apply_env_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get("TOKENMETER_DEBOUNCE_MS") {
            match v.trim().parse() {
                Ok(ms) => self.debounce_ms = ms,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid TOKENMETER_DEBOUNCE_MS"),
            }
        }
        if let Some(v) = get("TOKENMETER_TOKENIZER_URL") {
            self.tokenizer_url = v;
        }
        if let Some(v) = get("TOKENMETER_CATALOG_URL") {
            self.catalog_url = v;
        }
        if let Some(v) = get("TOKENMETER_CATALOG_PATH") {
            self.catalog_path = (!v.is_empty()).then(|| PathBuf::from(v));
        }
        if let Some(v) = get("TOKENMETER_LIMITING_RATIO") {
            match v.trim().parse() {
                Ok(r) => self.limiting_ratio = r,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid TOKENMETER_LIMITING_RATIO"),
            }
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn thresholds(&self) -> UsageThresholds {
        UsageThresholds {
            warning_percent: self.warning_percent,
            critical_percent: self.critical_percent,
        }
    }
}
