//! Raw HTTP GET sender.

use std::time::Duration;

use tracing::debug;

use crate::error::TransportError;

/// Sends plain GET requests and returns the body text.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpSender {
    client: reqwest::Client,
}

impl HttpSender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// GET `url` with a per-request `timeout` and return the body.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the request fails, times out or the
    /// server answers with a non-success status.
    pub async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, TransportError> {
        debug!(timeout_ms = timeout.as_millis(), "GET long-poll request");
        let response = self.client.get(url).timeout(timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}
