//! Layered settings.
//!
//! Sources, lowest priority first:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config`, or `soundwatch.toml` in the working directory
//!    if it exists)
//! 3. environment variables prefixed with `SOUNDWATCH_`, e.g.
//!    `SOUNDWATCH_BASE_URL`
//! 4. command-line overrides
//!
//! ```toml
//! base_url = "http://sensors.local:8081"
//! refresh_ms = 5000
//! timeout_ms = 10000
//! log_limit = 50
//! ```

use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::debug;

pub const ENV_PREFIX: &str = "SOUNDWATCH";
pub const DEFAULT_CONFIG_FILE: &str = "soundwatch";

const DEFAULT_BASE_URL: &str = "http://localhost:8081";
const DEFAULT_REFRESH_MS: i64 = 5000;
const DEFAULT_TIMEOUT_MS: i64 = 10_000;
const DEFAULT_LOG_LIMIT: i64 = 50;

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Base URL of the telemetry service.
    pub base_url: String,
    /// Readings refresh interval in milliseconds.
    pub refresh_ms: u64,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Number of log lines fetched by `logs`.
    pub log_limit: u32,
}

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub refresh_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub log_limit: Option<u32>,
}

impl Settings {
    /// Load settings from every layer and validate them.
    pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::load_with_env(config_path, overrides, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(
        config_path: Option<&Path>,
        overrides: &Overrides,
        env: Environment,
    ) -> Result<Self> {
        let file = match config_path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("refresh_ms", DEFAULT_REFRESH_MS)?
            .set_default("timeout_ms", DEFAULT_TIMEOUT_MS)?
            .set_default("log_limit", DEFAULT_LOG_LIMIT)?
            .add_source(file)
            .add_source(env.try_parsing(true))
            .set_override_option("base_url", overrides.base_url.clone())?
            .set_override_option("refresh_ms", overrides.refresh_ms)?
            .set_override_option("timeout_ms", overrides.timeout_ms)?
            .set_override_option("log_limit", overrides.log_limit.map(u64::from))?
            .build()
            .context("Failed to load configuration")?;

        let settings: Settings = config
            .try_deserialize()
            .context("Invalid configuration")?;
        settings.validate()?;

        debug!(?settings, "configuration loaded");
        Ok(settings)
    }

    /// Check values that parse but make no sense.
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if url.is_empty() {
            bail!("base_url must not be empty");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("base_url must start with http:// or https://, got {:?}", url);
        }
        if self.refresh_ms == 0 {
            bail!("refresh_ms must be greater than zero");
        }
        if self.timeout_ms == 0 {
            bail!("timeout_ms must be greater than zero");
        }
        if self.log_limit == 0 {
            bail!("log_limit must be greater than zero");
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Configured log limit. Falls back to 1 if validation was skipped.
    pub fn log_limit(&self) -> NonZeroU32 {
        NonZeroU32::new(self.log_limit).unwrap_or(NonZeroU32::MIN)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            refresh_ms: DEFAULT_REFRESH_MS as u64,
            timeout_ms: DEFAULT_TIMEOUT_MS as u64,
            log_limit: DEFAULT_LOG_LIMIT as u32,
        }
    }
}
