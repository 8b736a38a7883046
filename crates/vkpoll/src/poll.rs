//! Long-poll requests and answer decoding.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use vkpoll_stream::AsyncMap;

use crate::credentials::SessionCredentials;
use crate::cursor::Cursor;
use crate::error::{FailureCause, LongPollError};
use crate::transport::{RawRequest, RawSend};

/// Seconds the server holds a poll open before answering without updates.
pub const LONG_POLL_WAIT_SECS: u64 = 25;

/// Opaque update records from one poll.
pub type UpdateBatch = Vec<Value>;

/// `failed` codes of a long-poll answer.
mod failed {
    pub const CURSOR_EXPIRED: i64 = 1;
    pub const KEY_EXPIRED: i64 = 2;
    pub const SESSION_LOST: i64 = 3;
}

/// Decoded long-poll answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Updates and the cursor to poll from next.
    Updates(UpdateBatch, Cursor),
    /// History before the returned cursor is gone; continue from it.
    CursorExpired(Cursor),
    /// The key (or the whole session) must be re-issued.
    SessionInvalid,
}

#[derive(Deserialize)]
struct Answer {
    failed: Option<i64>,
    ts: Option<Cursor>,
    updates: Option<UpdateBatch>,
}

impl PollOutcome {
    /// Decode a long-poll response body.
    ///
    /// # Errors
    ///
    /// Returns [`LongPollError::Unknown`] when the body is not a long-poll
    /// answer, lacks a required cursor, or carries an unknown `failed` code.
    pub fn decode(body: &str) -> Result<Self, LongPollError> {
        let answer: Answer = serde_json::from_str(body).map_err(LongPollError::decode)?;

        match answer.failed {
            None | Some(0) => {
                let ts = answer
                    .ts
                    .ok_or_else(|| LongPollError::malformed("answer without ts"))?;
                Ok(Self::Updates(answer.updates.unwrap_or_default(), ts))
            }
            Some(failed::CURSOR_EXPIRED) => answer
                .ts
                .map(Self::CursorExpired)
                .ok_or_else(|| LongPollError::malformed("expired cursor answer without ts")),
            Some(failed::KEY_EXPIRED | failed::SESSION_LOST) => Ok(Self::SessionInvalid),
            Some(code) => Err(LongPollError::malformed(format!("unknown failed code {code}"))),
        }
    }
}

/// Build the poll URL for `server`, `key` and `cursor`.
#[must_use]
pub fn long_poll_url(server: &str, key: &str, cursor: &Cursor) -> String {
    format!("{server}?act=a_check&key={key}&ts={cursor}&wait={LONG_POLL_WAIT_SECS}")
}

/// Cursor learned from poll answers, tied to the credentials it was learned
/// with. Credentials with a different server or key start from their own `ts`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CursorOverride {
    server: String,
    key: String,
    ts: Cursor,
}

impl CursorOverride {
    fn applies_to(&self, credentials: &SessionCredentials) -> bool {
        self.server == credentials.server && self.key == credentials.key
    }
}

/// Polls with the given credentials and yields the update batch.
///
/// Keeps the cursor moving between polls. An expired cursor is replaced
/// before the error is reported, so the retry resumes from the new one.
pub struct PollStage {
    sender: Arc<dyn RawSend>,
    timeout: Duration,
    cursor: Option<CursorOverride>,
}

impl PollStage {
    /// Poll through `sender`, giving up on a request after `timeout`.
    pub fn new(sender: Arc<dyn RawSend>, timeout: Duration) -> Self {
        Self {
            sender,
            timeout,
            cursor: None,
        }
    }

    /// Cursor the next poll with `credentials` would use.
    #[must_use]
    pub fn cursor_for<'a>(&'a self, credentials: &'a SessionCredentials) -> &'a Cursor {
        self.cursor
            .as_ref()
            .filter(|o| o.applies_to(credentials))
            .map_or(&credentials.ts, |o| &o.ts)
    }

    fn remember(&mut self, credentials: &SessionCredentials, ts: Cursor) {
        self.cursor = Some(CursorOverride {
            server: credentials.server.clone(),
            key: credentials.key.clone(),
            ts,
        });
    }
}

#[async_trait]
impl AsyncMap<SessionCredentials> for PollStage {
    type Output = UpdateBatch;
    type Error = LongPollError;

    async fn map(&mut self, credentials: SessionCredentials) -> Result<UpdateBatch, LongPollError> {
        let cursor = self.cursor_for(&credentials).clone();
        let request = RawRequest {
            url: long_poll_url(&credentials.server, &credentials.key, &cursor),
            timeout: self.timeout,
        };

        debug!(server = %credentials.server, ts = %cursor, "polling");
        let body = self.sender.send(request).await.map_err(|err| {
            warn!(server = %credentials.server, error = %err, "poll request failed");
            LongPollError::from(FailureCause::Transport(err))
        })?;

        match PollOutcome::decode(&body) {
            Ok(PollOutcome::Updates(batch, ts)) => {
                debug!(updates = batch.len(), ts = %ts, "poll answered");
                self.remember(&credentials, ts);
                Ok(batch)
            }
            Ok(PollOutcome::CursorExpired(ts)) => {
                debug!(expired = %cursor, ts = %ts, "cursor expired");
                self.remember(&credentials, ts.clone());
                Err(LongPollError::CursorExpired { cursor: ts })
            }
            Ok(PollOutcome::SessionInvalid) => {
                debug!(server = %credentials.server, "session invalidated");
                Err(LongPollError::SessionInvalid)
            }
            Err(err) => {
                warn!(error = %err, "poll answer not understood");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn creds(key: &str, ts: &str) -> SessionCredentials {
        SessionCredentials {
            server: "test".into(),
            key: key.into(),
            ts: Cursor::from(ts),
        }
    }

    #[test]
    fn url_is_exact() {
        assert_eq!(
            long_poll_url("test", "test2", &Cursor::from("10")),
            "test?act=a_check&key=test2&ts=10&wait=25"
        );
    }

    #[test]
    fn decodes_updates() {
        let outcome = PollOutcome::decode(r#"{"ts": 10, "updates": [[80, 10]]}"#).unwrap();
        assert_eq!(
            outcome,
            PollOutcome::Updates(vec![json!([80, 10])], Cursor::from("10"))
        );
    }

    #[test]
    fn missing_updates_is_empty_batch() {
        let outcome = PollOutcome::decode(r#"{"ts": "12"}"#).unwrap();
        assert_eq!(outcome, PollOutcome::Updates(Vec::new(), Cursor::from("12")));
    }

    #[test]
    fn decodes_failures() {
        assert_eq!(
            PollOutcome::decode(r#"{"failed": 1, "ts": 11}"#).unwrap(),
            PollOutcome::CursorExpired(Cursor::from("11"))
        );
        assert_eq!(
            PollOutcome::decode(r#"{"failed": 2}"#).unwrap(),
            PollOutcome::SessionInvalid
        );
        assert_eq!(
            PollOutcome::decode(r#"{"failed": 3}"#).unwrap(),
            PollOutcome::SessionInvalid
        );
    }

    #[test]
    fn rejects_broken_answers() {
        for body in [
            "not json",
            r#"{"updates": []}"#,
            r#"{"failed": 1}"#,
            r#"{"failed": 4, "ts": 1}"#,
        ] {
            let err = PollOutcome::decode(body).unwrap_err();
            assert!(matches!(err, LongPollError::Unknown(_)), "{body}: {err:?}");
        }
    }

    struct NoSend;

    #[async_trait]
    impl RawSend for NoSend {
        async fn send(&self, _: RawRequest) -> Result<String, vkpoll_api::TransportError> {
            Err(vkpoll_api::TransportError::new("unused"))
        }
    }

    #[test]
    fn override_only_applies_to_matching_credentials() {
        let mut stage = PollStage::new(Arc::new(NoSend), Duration::from_secs(1));
        let first = creds("test2", "10");
        assert_eq!(stage.cursor_for(&first), &Cursor::from("10"));

        stage.remember(&first, Cursor::from("11"));
        assert_eq!(stage.cursor_for(&first), &Cursor::from("11"));

        let refreshed = creds("test3", "20");
        assert_eq!(stage.cursor_for(&refreshed), &Cursor::from("20"));
    }
}
