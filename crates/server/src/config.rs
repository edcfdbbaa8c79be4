//! Application configuration from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use pipeline::PollPolicy;
use pipeline::polling::{DEFAULT_INTERVAL, DEFAULT_MAX_ATTEMPTS};
use providers::inference::{DEFAULT_REMOVE_BG_VERSION, DEFAULT_REPLICATE_BASE_URL};
use providers::model::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use providers::weather::DEFAULT_OPENWEATHER_BASE_URL;
use providers::{GeminiConfig, OpenWeatherConfig, ReplicateConfig, StorageConfig};
use thiserror::Error;

use crate::checkout::CheckoutLinks;

/// Default directory for guest data
pub const DEFAULT_DATA_DIR: &str = ".closet";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{variable} has invalid value {value:?}: {reason}")]
    Invalid {
        variable: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything needed to wire a [`ClosetService`](crate::ClosetService).
///
/// Credentials are optional: a missing one only disables the workflow that
/// needs it, and each workflow reports that in its own way.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub replicate: ReplicateConfig,
    pub storage: StorageConfig,
    pub weather: OpenWeatherConfig,
    pub checkout: CheckoutLinks,
    pub poll: PollPolicy,
    pub data_dir: PathBuf,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `GEMINI_API_KEY`          | unset                   |
    /// | `GEMINI_MODEL`            | `gemini-1.5-flash`      |
    /// | `GEMINI_BASE_URL`         | Google endpoint         |
    /// | `REPLICATE_API_TOKEN`     | unset                   |
    /// | `REPLICATE_BASE_URL`      | Replicate endpoint      |
    /// | `REPLICATE_MODEL_VERSION` | remove-bg model version |
    /// | `STORAGE_UPLOAD_URL`      | unset                   |
    /// | `STORAGE_PUBLIC_URL`      | upload URL              |
    /// | `STORAGE_TOKEN`           | unset                   |
    /// | `OPENWEATHER_API_KEY`     | unset                   |
    /// | `OPENWEATHER_BASE_URL`    | OpenWeatherMap endpoint |
    /// | `CHECKOUT_MONTHLY_URL`    | unset                   |
    /// | `CHECKOUT_YEARLY_URL`     | unset                   |
    /// | `CLOSET_DATA_DIR`         | `.closet`               |
    /// | `POLL_INTERVAL_MS`        | `1500`                  |
    /// | `POLL_MAX_ATTEMPTS`       | `20`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let gemini = GeminiConfig {
            api_key: get("GEMINI_API_KEY"),
            model: or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            base_url: or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
        };

        let replicate = ReplicateConfig {
            api_token: get("REPLICATE_API_TOKEN"),
            base_url: or("REPLICATE_BASE_URL", DEFAULT_REPLICATE_BASE_URL),
            model_version: or("REPLICATE_MODEL_VERSION", DEFAULT_REMOVE_BG_VERSION),
        };

        let storage = StorageConfig {
            upload_url: get("STORAGE_UPLOAD_URL"),
            public_url: get("STORAGE_PUBLIC_URL"),
            token: get("STORAGE_TOKEN"),
        };

        let weather = OpenWeatherConfig {
            api_key: get("OPENWEATHER_API_KEY"),
            base_url: or("OPENWEATHER_BASE_URL", DEFAULT_OPENWEATHER_BASE_URL),
        };

        let checkout = CheckoutLinks {
            monthly: get("CHECKOUT_MONTHLY_URL"),
            yearly: get("CHECKOUT_YEARLY_URL"),
        };

        let interval_ms = match get("POLL_INTERVAL_MS") {
            Some(raw) => parse_positive("POLL_INTERVAL_MS", &raw)?,
            None => DEFAULT_INTERVAL.as_millis() as u64,
        };
        let max_attempts = match get("POLL_MAX_ATTEMPTS") {
            Some(raw) => parse_positive::<u32>("POLL_MAX_ATTEMPTS", &raw)?,
            None => DEFAULT_MAX_ATTEMPTS,
        };

        Ok(Self {
            gemini,
            replicate,
            storage,
            weather,
            checkout,
            poll: PollPolicy::new(max_attempts, Duration::from_millis(interval_ms)),
            data_dir: PathBuf::from(or("CLOSET_DATA_DIR", DEFAULT_DATA_DIR)),
        })
    }

    /// Override the guest data directory (CLI flag).
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}

fn parse_positive<T>(variable: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let invalid = |reason: String| ConfigError::Invalid {
        variable,
        value: raw.to_string(),
        reason,
    };
    let value: T = raw.parse().map_err(|e: T::Err| invalid(e.to_string()))?;
    if value <= T::default() {
        return Err(invalid("must be greater than zero".to_string()));
    }
    Ok(value)
}
