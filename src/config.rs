use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::api::FILE_ENDPOINT;
use crate::sse::EVENTS_ENDPOINT;
use crate::sync::agent::DEFAULT_INPUT_DEBOUNCE;

/// Client configuration, loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_file_endpoint")]
    pub file_endpoint: String,
    #[serde(default = "default_events_endpoint")]
    pub events_endpoint: String,
    /// The push channel only exists while the backend runs in development mode
    #[serde(default = "default_development_mode")]
    pub development_mode: bool,
    #[serde(default = "default_input_debounce")]
    pub input_debounce_ms: u64,
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

fn default_server() -> String {
    "http://localhost:3030".to_string()
}

fn default_file_endpoint() -> String {
    FILE_ENDPOINT.to_string()
}

fn default_events_endpoint() -> String {
    EVENTS_ENDPOINT.to_string()
}

fn default_development_mode() -> bool {
    true
}

fn default_input_debounce() -> u64 {
    DEFAULT_INPUT_DEBOUNCE.as_millis() as u64
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            file_endpoint: default_file_endpoint(),
            events_endpoint: default_events_endpoint(),
            development_mode: default_development_mode(),
            input_debounce_ms: default_input_debounce(),
            request_timeout_ms: None,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconnectPolicy {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_backoff")]
    pub backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            backoff_ms: 500,
            max_backoff_ms: 10000,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    10000
}

impl ReconnectPolicy {
    /// Never reconnect; the channel ends at the first disconnect.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Delay before reconnect attempt `attempt` (0-based): doubles each time,
    /// capped at `max_backoff_ms`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
        let ms = self
            .backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

impl SyncConfig {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn file_url(&self) -> String {
        join_url(&self.server, &self.file_endpoint)
    }

    pub fn events_url(&self) -> String {
        join_url(&self.server, &self.events_endpoint)
    }

    pub fn input_debounce(&self) -> Duration {
        Duration::from_millis(self.input_debounce_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

fn join_url(server: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        server.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
