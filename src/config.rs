//! Configuration file parser for ~/.config/portal/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde and reported with a warning.
use crate::api::{ClientSettings, RetryPolicy, DEFAULT_BASE_URL};
use crate::feed::{ControllerSettings, EnrichPolicy};
use crate::util::validate_api_url;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// Parsed fine but a value is out of range.
    #[error("Invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level application configuration.
///
/// Every field has a default, so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream API root, e.g. `https://rickandmortyapi.com/api`.
    pub api_base_url: String,

    /// Theme variant name ("dark" or "light").
    pub theme: String,

    /// Per-request timeout on the HTTP client.
    pub request_timeout_secs: u64,

    /// Retries for 429 and 5xx responses.
    pub max_retries: u32,

    /// First backoff delay; doubles on each retry.
    pub retry_base_delay_ms: u64,

    /// Which characters an enrichment pass resolves.
    pub enrich_policy: EnrichPolicy,

    /// Max concurrent episode lookups per pass.
    pub enrich_concurrency: usize,

    /// Episode name cache capacity (0 = no cache).
    pub episode_cache_size: usize,

    /// How close to the end of the grid (as a fraction of the visible rows)
    /// the selection must come before the next page loads.
    pub prefetch_threshold: f64,

    /// Custom keybinding overrides. Keys are action names, values are key strings.
    pub keybindings: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            theme: "dark".to_string(),
            request_timeout_secs: 30,
            max_retries: 2,
            retry_base_delay_ms: 1000,
            enrich_policy: EnrichPolicy::All,
            enrich_concurrency: 20,
            episode_cache_size: 0,
            prefetch_threshold: 0.5,
            keybindings: HashMap::new(),
        }
    }
}

const KNOWN_KEYS: [&str; 10] = [
    "api_base_url",
    "theme",
    "request_timeout_secs",
    "max_retries",
    "retry_base_delay_ms",
    "enrich_policy",
    "enrich_concurrency",
    "episode_cache_size",
    "prefetch_threshold",
    "keybindings",
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML or wrong types → `Err(ConfigError::Parse)`
    /// - Out-of-range values → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let config = Self::from_toml_str(&content)?;
        tracing::info!(
            path = %path.display(),
            base_url = %config.api_base_url,
            policy = ?config.enrich_policy,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = validate_api_url(&self.api_base_url) {
            return Err(ConfigError::Invalid {
                key: "api_base_url",
                reason: e.to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.enrich_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "enrich_concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.prefetch_threshold) {
            return Err(ConfigError::Invalid {
                key: "prefetch_threshold",
                reason: format!("{} is outside 0.0..=1.0", self.prefetch_threshold),
            });
        }
        Ok(())
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.api_base_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            retry: RetryPolicy {
                max_retries: self.max_retries,
                base_delay: Duration::from_millis(self.retry_base_delay_ms),
            },
        }
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            policy: self.enrich_policy,
            concurrency: self.enrich_concurrency,
            episode_cache_size: self.episode_cache_size,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
