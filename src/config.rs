use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const SERVER_URL_ENV: &str = "STEPWATCH_SERVER_URL";
pub const DEBUG_ENV: &str = "STEPWATCH_DEBUG";

/// Tunables for the monitoring engine and its HTTP collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet window for coalescing content-change bursts.
    pub debounce_ms: u64,

    /// Consecutive identical wrong-app / frozen-screen sightings before one is reported.
    pub error_threshold: u32,

    /// Time after a click before an unchanged screen counts as frozen.
    pub frozen_after_ms: u64,

    pub error_auto_hide_ms: u64,

    /// Base URL of the curriculum and telemetry server.
    pub server_url: String,
    pub http_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 150,
            error_threshold: 5,
            frozen_after_ms: 3000,
            error_auto_hide_ms: 3000,
            server_url: "http://10.0.2.2:5001".into(),
            http_timeout_ms: 5000,
        }
    }
}

impl EngineConfig {
    /// Reads a JSON config file. A missing file yields the defaults; missing fields fall back
    /// individually. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config from {}", path.display()))?;
                serde_json::from_str(&contents)
                    .with_context(|| format!("Invalid config in {}", path.display()))?
            }
            _ => Self::default(),
        };

        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.trim().is_empty() {
                config.server_url = url.trim().to_string();
            }
        }

        Ok(config)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn frozen_after(&self) -> Duration {
        Duration::from_millis(self.frozen_after_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// A configured threshold of zero behaves like one.
    pub fn effective_error_threshold(&self) -> u32 {
        self.error_threshold.max(1)
    }

    pub fn server_base(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }
}

pub fn debug_mode() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config.debounce_ms, 150);
        assert_eq!(config.error_threshold, 5);
        assert_eq!(config.frozen_after(), Duration::from_secs(3));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"debounce_ms": 300, "server_url": "http://host:1/"}"#).unwrap();

        let config = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.error_threshold, 5);
        assert_eq!(config.server_base(), "http://host:1");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(EngineConfig::load(Some(&path)).is_err());
    }
}
