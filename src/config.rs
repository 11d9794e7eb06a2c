use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime settings. Every field has a default, so an empty or partial JSON
/// file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub base_url: String,
    pub outbox_path: PathBuf,
    /// Read the schema from this file instead of the server.
    pub schema_path: Option<PathBuf>,
    pub request_timeout_ms: u64,
    pub sync_interval_ms: u64,
    pub startup_flush_delay_ms: u64,
    pub score_tick_ms: u64,
    pub probe_interval_ms: u64,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            outbox_path: PathBuf::from("scouting_offline_queue.jsonl"),
            schema_path: None,
            request_timeout_ms: 10_000,
            sync_interval_ms: 30_000,
            startup_flush_delay_ms: 2_000,
            score_tick_ms: 250,
            probe_interval_ms: 5_000,
        }
    }
}

impl ScoutConfig {
    /// Defaults, then the JSON file at `path` if given, then `SCOUT_*`
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SCOUT_BASE_URL") {
            self.base_url = url;
        }
        if let Some(path) = lookup("SCOUT_OUTBOX_PATH") {
            self.outbox_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("SCOUT_SCHEMA_PATH") {
            self.schema_path = Some(PathBuf::from(path));
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms.max(1))
    }

    pub fn startup_flush_delay(&self) -> Duration {
        Duration::from_millis(self.startup_flush_delay_ms)
    }

    pub fn score_tick(&self) -> Duration {
        Duration::from_millis(self.score_tick_ms.max(1))
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms.max(1))
    }
}
