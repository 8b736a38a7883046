//! Long-poll error types.

use std::path::PathBuf;

use thiserror::Error;
use vkpoll_api::{ApiError, TransportError};

use crate::cursor::Cursor;

/// Why a credential fetch or poll failed transiently.
#[derive(Error, Debug, Clone)]
pub enum FailureCause {
    /// The credential call failed.
    #[error("API call failed: {0}")]
    Api(#[from] ApiError),

    /// The poll request failed.
    #[error("request failed: {0}")]
    Transport(#[from] TransportError),

    /// An answer was not valid JSON of the expected shape.
    #[error("invalid answer: {0}")]
    Decode(String),

    /// An answer was JSON but violated the protocol.
    #[error("unexpected answer: {0}")]
    Malformed(String),
}

/// Errors travelling back up the pipeline.
///
/// Each variant is recovered by a different stage: `Unknown` is retried where
/// it happened, `CursorExpired` is retried with the replacement cursor, and
/// `SessionInvalid` forces a credential refresh.
#[derive(Error, Debug, Clone)]
pub enum LongPollError {
    /// Transient failure, retried after a backoff.
    #[error("transient failure: {0}")]
    Unknown(#[from] FailureCause),

    /// The server discarded history up to `cursor`; polling resumes from it.
    #[error("cursor expired, resuming from {cursor}")]
    CursorExpired { cursor: Cursor },

    /// The session key is no longer accepted.
    #[error("long-poll session invalidated")]
    SessionInvalid,
}

impl LongPollError {
    #[must_use]
    pub const fn is_session_invalid(&self) -> bool {
        matches!(self, Self::SessionInvalid)
    }

    #[must_use]
    pub const fn is_cursor_expired(&self) -> bool {
        matches!(self, Self::CursorExpired { .. })
    }

    /// Shorthand for a decode failure.
    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Unknown(FailureCause::Decode(err.to_string()))
    }

    /// Shorthand for a protocol violation.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Unknown(FailureCause::Malformed(message.into()))
    }
}

/// Errors loading a [`crate::LongPollConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_cause() {
        let err = LongPollError::from(FailureCause::Transport(TransportError::new("reset")));
        assert_eq!(err.to_string(), "transient failure: request failed: reset");

        let err = LongPollError::CursorExpired {
            cursor: Cursor::from("11"),
        };
        assert_eq!(err.to_string(), "cursor expired, resuming from 11");
        assert!(err.is_cursor_expired());
        assert!(!err.is_session_invalid());
    }

    #[test]
    fn config_error_lists_problems() {
        let err = ConfigError::Invalid(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "invalid config: a; b");
    }
}
