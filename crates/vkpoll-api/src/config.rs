//! API client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default API origin.
pub const DEFAULT_API_URL: &str = "https://api.vk.com";

/// API version sent with every call.
pub const DEFAULT_VERSION: &str = "5.45";

/// Default per-request timeout (milliseconds).
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Configuration for [`crate::ApiClient`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API origin, without the `/method` path.
    pub api_url: String,
    /// API version (`v` parameter).
    pub version: String,
    /// Request timeout (milliseconds).
    pub timeout_ms: u64,
    /// Access token (`access_token` parameter). Omitted when unset.
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            version: DEFAULT_VERSION.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            token: None,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_url", &self.api_url)
            .field("version", &self.version)
            .field("timeout_ms", &self.timeout_ms)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ApiConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the API origin.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Builder: set the API version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Builder: set the request timeout.
    #[must_use]
    pub const fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Builder: set the access token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate configuration, returning errors for invalid values.
    ///
    /// # Errors
    ///
    /// Returns error strings for any invalid configuration values.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.api_url.trim().is_empty() {
            errors.push("api_url must not be empty".to_string());
        }
        if self.version.trim().is_empty() {
            errors.push("version must not be empty".to_string());
        }
        if self.timeout_ms == 0 {
            errors.push("timeout_ms must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_public_api() {
        let config = ApiConfig::default();
        assert_eq!(config.api_url, "https://api.vk.com");
        assert_eq!(config.version, "5.45");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(config.token.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn debug_redacts_token() {
        let config = ApiConfig::new().with_token("very-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn validate_collects_all_errors() {
        let config = ApiConfig::new()
            .with_api_url(" ")
            .with_version("")
            .with_timeout_ms(0);
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn deserializes_partial_config() {
        let config: ApiConfig =
            serde_json::from_str(r#"{"api_url": "http://localhost:9000", "token": "t"}"#).unwrap();
        assert_eq!(config.api_url, "http://localhost:9000");
        assert_eq!(config.version, DEFAULT_VERSION);
        assert_eq!(config.token.as_deref(), Some("t"));
    }
}
