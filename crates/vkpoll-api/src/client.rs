//! API method client.

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;

use crate::chain::Chain;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult, TransportError};
use crate::params::Params;

/// Invokes API methods via `POST {api_url}/method/{method}`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, config })
    }

    /// Create a client on top of an existing HTTP client.
    #[must_use]
    pub const fn with_http_client(http: reqwest::Client, config: ApiConfig) -> Self {
        Self { http, config }
    }

    #[must_use]
    pub const fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Replace the access token used by subsequent calls.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.config.token = Some(token.into());
    }

    /// Call `method` and return the `response` field of the answer.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Domain`] when the API reports an error, and a
    /// transport or decode error when no valid answer was received.
    pub async fn call(&self, method: &str, params: Params) -> ApiResult<Value> {
        let mut envelope = self.call_raw(method, params).await?;
        envelope
            .get_mut("response")
            .map(Value::take)
            .ok_or_else(|| ApiError::Decode(format!("{method}: answer has no response field")))
    }

    /// Call `method` and return the whole answer envelope.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::call`].
    pub async fn call_raw(&self, method: &str, params: Params) -> ApiResult<Value> {
        let url = format!(
            "{}/method/{method}",
            self.config.api_url.trim_end_matches('/')
        );
        let body = params.to_query(self.config.token.as_deref(), &self.config.version);
        debug!(method, "API call");

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .timeout(self.config.timeout())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::status(status.as_u16()).into());
        }

        let text = response.text().await?;
        let envelope: Value = serde_json::from_str(&text)?;
        if let Some(error) = envelope.get("error") {
            let err = ApiError::from_payload(error);
            debug!(method, error = %err, "API call rejected");
            return Err(err);
        }
        Ok(envelope)
    }

    /// Run `execute` with the given code and return the whole envelope,
    /// including `execute_errors`.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::call`].
    pub async fn execute(&self, code: &str) -> ApiResult<Value> {
        self.call_raw("execute", Params::new().with("code", code))
            .await
    }

    /// Start a batch of calls sent as one `execute` request.
    #[must_use]
    pub const fn chain(&self) -> Chain<'_> {
        Chain::new(self)
    }
}
