//! Session configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vkpoll_stream::Backoff;

use crate::error::ConfigError;
use crate::poll::LONG_POLL_WAIT_SECS;

/// Default first retry delay.
pub const DEFAULT_RETRY_FLOOR_MS: u64 = 1_000;

/// Default longest retry delay.
pub const DEFAULT_RETRY_CEILING_MS: u64 = 16_000;

/// Default poll request timeout. Must exceed the server-side wait.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 35_000;

/// Configuration for [`crate::LongPollSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongPollConfig {
    /// First retry delay after a failure (milliseconds).
    pub retry_floor_ms: u64,
    /// Upper bound for the doubling retry delay (milliseconds).
    pub retry_ceiling_ms: u64,
    /// Timeout of a single poll request (milliseconds).
    pub poll_timeout_ms: u64,
    /// Drop batches without updates instead of delivering them.
    pub skip_empty_batches: bool,
}

impl Default for LongPollConfig {
    fn default() -> Self {
        Self {
            retry_floor_ms: DEFAULT_RETRY_FLOOR_MS,
            retry_ceiling_ms: DEFAULT_RETRY_CEILING_MS,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            skip_empty_batches: false,
        }
    }
}

impl LongPollConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise
    /// the same errors as [`LongPollConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Builder: set the first retry delay.
    #[must_use]
    pub const fn with_retry_floor_ms(mut self, ms: u64) -> Self {
        self.retry_floor_ms = ms;
        self
    }

    /// Builder: set the longest retry delay.
    #[must_use]
    pub const fn with_retry_ceiling_ms(mut self, ms: u64) -> Self {
        self.retry_ceiling_ms = ms;
        self
    }

    /// Builder: set the poll request timeout.
    #[must_use]
    pub const fn with_poll_timeout_ms(mut self, ms: u64) -> Self {
        self.poll_timeout_ms = ms;
        self
    }

    /// Builder: deliver or drop empty batches.
    #[must_use]
    pub const fn with_skip_empty_batches(mut self, skip: bool) -> Self {
        self.skip_empty_batches = skip;
        self
    }

    /// Fresh backoff state for one repeater.
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        Backoff::from_millis(self.retry_floor_ms, self.retry_ceiling_ms)
    }

    /// Get the poll timeout as a Duration.
    #[must_use]
    pub const fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// Validate configuration, returning errors for invalid values.
    ///
    /// # Errors
    ///
    /// Returns error strings for any invalid configuration values.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.retry_floor_ms == 0 {
            errors.push("retry_floor_ms must be > 0".to_string());
        }
        if self.retry_ceiling_ms < self.retry_floor_ms {
            errors.push("retry_ceiling_ms must be >= retry_floor_ms".to_string());
        }
        if self.poll_timeout_ms <= LONG_POLL_WAIT_SECS * 1_000 {
            errors.push(format!(
                "poll_timeout_ms must exceed the {LONG_POLL_WAIT_SECS}s server wait"
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
