//! Session credentials and the stage that fetches them.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};
use vkpoll_api::Params;
use vkpoll_stream::AsyncMap;

use crate::cursor::Cursor;
use crate::error::{FailureCause, LongPollError};
use crate::transport::RemoteMethod;

/// Method that issues community long-poll credentials.
pub const LONG_POLL_SERVER_METHOD: &str = "groups.getLongPollServer";

/// Long-poll server address, session key and starting cursor.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct SessionCredentials {
    pub server: String,
    pub key: String,
    pub ts: Cursor,
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("server", &self.server)
            .field("key", &"[REDACTED]")
            .field("ts", &self.ts)
            .finish()
    }
}

/// The method call that yields [`SessionCredentials`].
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialRequest {
    pub method: String,
    pub params: Params,
}

impl CredentialRequest {
    pub fn new(method: impl Into<String>, params: Params) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// `groups.getLongPollServer` for a community.
    #[must_use]
    pub fn for_group(group_id: u64) -> Self {
        Self::new(
            LONG_POLL_SERVER_METHOD,
            Params::new().with("group_id", group_id),
        )
    }
}

/// Everything needed to (re)fetch credentials. Cloned into every fetch.
#[derive(Clone)]
pub struct SessionContext {
    invoker: Arc<dyn RemoteMethod>,
    request: CredentialRequest,
}

impl SessionContext {
    pub fn new(invoker: Arc<dyn RemoteMethod>, request: CredentialRequest) -> Self {
        Self { invoker, request }
    }

    #[must_use]
    pub const fn request(&self) -> &CredentialRequest {
        &self.request
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// Turns a [`SessionContext`] into fresh [`SessionCredentials`].
///
/// Every failure is reported as [`LongPollError::Unknown`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialStage;

#[async_trait]
impl AsyncMap<SessionContext> for CredentialStage {
    type Output = SessionCredentials;
    type Error = LongPollError;

    async fn map(&mut self, context: SessionContext) -> Result<SessionCredentials, LongPollError> {
        let request = &context.request;
        let answer = context
            .invoker
            .invoke(&request.method, request.params.clone())
            .await
            .map_err(|err| {
                warn!(
                    method = %request.method,
                    error = %err,
                    retryable = err.is_retryable(),
                    "credential request failed"
                );
                LongPollError::from(FailureCause::Api(err))
            })?;

        let credentials: SessionCredentials = serde_json::from_value(answer).map_err(|err| {
            warn!(method = %request.method, error = %err, "credential answer not understood");
            LongPollError::decode(err)
        })?;

        info!(server = %credentials.server, ts = %credentials.ts, "obtained long-poll credentials");
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use vkpoll_api::ApiError;

    struct Answer(Result<Value, ApiError>);

    #[async_trait]
    impl RemoteMethod for Answer {
        async fn invoke(&self, method: &str, params: Params) -> Result<Value, ApiError> {
            assert_eq!(method, LONG_POLL_SERVER_METHOD);
            assert_eq!(params.get("group_id"), Some(&json!(1)));
            self.0.clone()
        }
    }

    fn context(answer: Result<Value, ApiError>) -> SessionContext {
        SessionContext::new(Arc::new(Answer(answer)), CredentialRequest::for_group(1))
    }

    #[tokio::test]
    async fn decodes_credentials() {
        let creds = CredentialStage
            .map(context(Ok(json!({"server": "test", "key": "test2", "ts": 10}))))
            .await
            .unwrap();
        assert_eq!(creds.server, "test");
        assert_eq!(creds.key, "test2");
        assert_eq!(creds.ts, Cursor::from("10"));
    }

    #[tokio::test]
    async fn api_failure_is_unknown() {
        let err = CredentialStage
            .map(context(Err(ApiError::Decode("boom".into()))))
            .await
            .unwrap_err();
        assert!(matches!(err, LongPollError::Unknown(FailureCause::Api(_))));
    }

    #[tokio::test]
    async fn incomplete_answer_is_unknown() {
        let err = CredentialStage
            .map(context(Ok(json!({"server": "test"}))))
            .await
            .unwrap_err();
        assert!(matches!(err, LongPollError::Unknown(FailureCause::Decode(_))));
    }

    #[test]
    fn debug_hides_key() {
        let creds = SessionCredentials {
            server: "test".into(),
            key: "secret-key".into(),
            ts: Cursor::from("1"),
        };
        assert!(!format!("{creds:?}").contains("secret-key"));
    }
}
