//! Scripted capabilities shared by the session tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;
use tokio::time::Instant;
use vkpoll::{CredentialRequest, LongPollConfig, RawRequest, RawSend, RemoteMethod, SessionContext};
use vkpoll_api::{ApiError, Params, TransportError};

pub const FIRST_URL: &str = "test?act=a_check&key=test2&ts=10&wait=25";

pub fn credentials() -> Value {
    json!({"server": "test", "key": "test2", "ts": 10})
}

pub fn response() -> String {
    json!({"ts": 10, "updates": [[80, 10]]}).to_string()
}

pub fn batch() -> Vec<Value> {
    vec![json!([80, 10])]
}

pub fn fast_config() -> LongPollConfig {
    LongPollConfig::new()
        .with_retry_floor_ms(20)
        .with_retry_ceiling_ms(20)
}

pub fn context(api: Arc<dyn RemoteMethod>) -> SessionContext {
    SessionContext::new(api, CredentialRequest::for_group(1))
}

type ApiScript = Box<dyn Fn(usize) -> Result<Value, ApiError> + Send + Sync>;

/// Answers each method call from a script indexed by call number.
pub struct FakeApi {
    script: ApiScript,
    calls: Mutex<Vec<(String, Params)>>,
}

impl FakeApi {
    pub fn new(script: impl Fn(usize) -> Result<Value, ApiError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::default(),
        })
    }

    /// Always answers with the standard credentials.
    pub fn ok() -> Arc<Self> {
        Self::new(|_| Ok(credentials()))
    }

    pub fn calls(&self) -> Vec<(String, Params)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteMethod for FakeApi {
    async fn invoke(&self, method: &str, params: Params) -> Result<Value, ApiError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((method.to_string(), params));
            calls.len() - 1
        };
        (self.script)(n)
    }
}

type SendScript = Box<dyn Fn(usize) -> Result<String, TransportError> + Send + Sync>;

/// Answers each poll from a script indexed by request number.
pub struct FakeSender {
    script: SendScript,
    requests: Mutex<Vec<(Instant, RawRequest)>>,
}

impl FakeSender {
    pub fn new(script: impl Fn(usize) -> Result<String, TransportError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            requests: Mutex::default(),
        })
    }

    /// Always answers with the standard update batch.
    pub fn ok() -> Arc<Self> {
        Self::new(|_| Ok(response()))
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, request)| request.url.clone())
            .collect()
    }

    pub fn sent_at(&self) -> Vec<Instant> {
        self.requests.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl RawSend for FakeSender {
    async fn send(&self, request: RawRequest) -> Result<String, TransportError> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((Instant::now(), request));
            requests.len() - 1
        };
        (self.script)(n)
    }
}

/// Sets its flag when dropped.
pub struct ReleaseGuard(pub Arc<AtomicBool>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// A call that never completes. Reports when it started and when it was
/// released.
#[derive(Default)]
pub struct Hang {
    pub started: Notify,
    pub released: Arc<AtomicBool>,
}

impl Hang {
    pub fn new() -> Arc<Self> {
        Arc::default()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    async fn forever<T>(&self) -> T {
        let _guard = ReleaseGuard(self.released.clone());
        self.started.notify_one();
        std::future::pending::<T>().await
    }
}

#[async_trait]
impl RemoteMethod for Hang {
    async fn invoke(&self, _method: &str, _params: Params) -> Result<Value, ApiError> {
        self.forever().await
    }
}

#[async_trait]
impl RawSend for Hang {
    async fn send(&self, _request: RawRequest) -> Result<String, TransportError> {
        self.forever().await
    }
}
