//! Capabilities the session consumes.
//!
//! The pipeline never talks HTTP itself: credentials come through
//! [`RemoteMethod`] and polls go through [`RawSend`]. `vkpoll-api` provides
//! the production implementations; tests plug in scripted fakes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use vkpoll_api::{ApiClient, ApiError, HttpSender, Params, TransportError};

/// Invoke a remote API method.
///
/// Dropping the returned future must abandon the call.
#[async_trait]
pub trait RemoteMethod: Send + Sync {
    async fn invoke(&self, method: &str, params: Params) -> Result<Value, ApiError>;
}

/// A raw GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    pub url: String,
    pub timeout: Duration,
}

/// Send a raw request and return the response body.
///
/// Dropping the returned future must abandon the request.
#[async_trait]
pub trait RawSend: Send + Sync {
    async fn send(&self, request: RawRequest) -> Result<String, TransportError>;
}

#[async_trait]
impl RemoteMethod for ApiClient {
    async fn invoke(&self, method: &str, params: Params) -> Result<Value, ApiError> {
        self.call(method, params).await
    }
}

#[async_trait]
impl RawSend for HttpSender {
    async fn send(&self, request: RawRequest) -> Result<String, TransportError> {
        self.get_text(&request.url, request.timeout).await
    }
}

#[async_trait]
impl<T: RemoteMethod + ?Sized> RemoteMethod for Arc<T> {
    async fn invoke(&self, method: &str, params: Params) -> Result<Value, ApiError> {
        (**self).invoke(method, params).await
    }
}

#[async_trait]
impl<T: RawSend + ?Sized> RawSend for Arc<T> {
    async fn send(&self, request: RawRequest) -> Result<String, TransportError> {
        (**self).send(request).await
    }
}
