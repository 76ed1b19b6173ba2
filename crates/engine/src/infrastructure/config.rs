//! Engine configuration loaded from the environment.
//!
//! A `.env` file in the working directory is loaded first when present.
//! Unset variables fall back to defaults; set-but-unparseable variables are
//! an error.

use std::str::FromStr;
use std::time::Duration;

use super::retry::RetryPolicy;

/// Default Ollama base URL.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Default model for Ollama.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "powertale_engine=info";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Bounded timeout for each narrative collaborator call
    pub narrative_timeout: Duration,
    pub retry: RetryPolicy,
    /// Age after which an in-flight turn is considered stuck
    pub stale_turn_timeout: Duration,
    /// N in `floor(action_count / N) + 1`
    pub level_up_frequency: u64,
    /// Completed turns passed to the collaborator as the recent event log
    pub recent_event_limit: usize,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            narrative_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            stale_turn_timeout: Duration::from_secs(30),
            level_up_frequency: 3,
            recent_event_limit: 5,
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from `.env` (if any) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "Failed to load .env file");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let retry_defaults = &defaults.retry;

        let retry = RetryPolicy {
            max_attempts: parse_or(&lookup, "NARRATIVE_MAX_ATTEMPTS", retry_defaults.max_attempts)?
                .max(1),
            base_delay: Duration::from_millis(parse_or(
                &lookup,
                "NARRATIVE_RETRY_BASE_DELAY_MS",
                retry_defaults.base_delay.as_millis() as u64,
            )?),
            multiplier: parse_or(&lookup, "NARRATIVE_RETRY_MULTIPLIER", retry_defaults.multiplier)?,
            max_delay: Duration::from_millis(parse_or(
                &lookup,
                "NARRATIVE_RETRY_MAX_DELAY_MS",
                retry_defaults.max_delay.as_millis() as u64,
            )?),
            jitter_factor: parse_or(&lookup, "NARRATIVE_RETRY_JITTER", retry_defaults.jitter_factor)?,
        };

        Ok(Self {
            narrative_timeout: Duration::from_secs(parse_or(
                &lookup,
                "NARRATIVE_TIMEOUT_SECS",
                defaults.narrative_timeout.as_secs(),
            )?),
            retry,
            stale_turn_timeout: Duration::from_secs(parse_or(
                &lookup,
                "STALE_TURN_TIMEOUT_SECS",
                defaults.stale_turn_timeout.as_secs(),
            )?),
            level_up_frequency: parse_or(&lookup, "LEVEL_UP_FREQUENCY", defaults.level_up_frequency)?
                .max(1),
            recent_event_limit: parse_or(&lookup, "RECENT_EVENT_LIMIT", defaults.recent_event_limit)?,
            ollama_base_url: lookup("OLLAMA_BASE_URL").unwrap_or(defaults.ollama_base_url),
            ollama_model: lookup("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            log_filter: lookup("POWERTALE_LOG").unwrap_or(defaults.log_filter),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
