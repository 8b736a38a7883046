//! API error types.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Result alias for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error codes reported in the `error_code` field of domain errors.
pub mod error_code {
    pub const UNKNOWN_ERROR: i64 = 1;
    pub const APP_SWITCHED_OFF: i64 = 2;
    pub const UNKNOWN_METHOD: i64 = 3;
    pub const WRONG_SIGNATURE: i64 = 4;
    pub const AUTH_FAILURE: i64 = 5;
    pub const TOO_MANY_REQUESTS: i64 = 6;
    pub const SCOPE_NEEDED: i64 = 7;
    pub const INCORRECT_REQUEST: i64 = 8;
    pub const TOO_MANY_SIMILAR_ACTIONS: i64 = 9;
    pub const INTERNAL_ERROR: i64 = 10;
    pub const TEST_MODE: i64 = 11;
    pub const CAPTCHA_REQUIRED: i64 = 14;
    pub const ACCESS_DENIED: i64 = 15;
    pub const HTTPS_ONLY: i64 = 16;
    pub const USER_VALIDATION_REQUIRED: i64 = 17;
    pub const STANDALONE_ONLY: i64 = 20;
    pub const STANDALONE_AND_OPEN_API_ONLY: i64 = 21;
    pub const METHOD_DISABLED: i64 = 23;
    pub const WRONG_PARAMETER: i64 = 100;
    pub const INCORRECT_API_ID: i64 = 101;
    pub const INCORRECT_USER_ID: i64 = 113;
    pub const INCORRECT_TIME: i64 = 150;
    pub const ALBUM_ACCESS_DENIED: i64 = 200;
    pub const AUDIO_ACCESS_DENIED: i64 = 201;
    pub const GROUP_ACCESS_DENIED: i64 = 203;
    pub const ALBUM_OVERFLOW: i64 = 300;
    pub const PAYMENTS_DISABLED: i64 = 500;
    pub const COMMERCIAL_ACCESS_DENIED: i64 = 600;
    pub const COMMERCIAL_ERROR: i64 = 603;
}

/// A request that never produced a usable HTTP response.
///
/// Stores the rendered cause rather than the `reqwest::Error` so the error
/// stays `Clone` and can be handed to every caller of a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    status: Option<u16>,
    timed_out: bool,
}

impl TransportError {
    /// Create a transport error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            timed_out: false,
        }
    }

    /// A non-success HTTP status.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self {
            message: format!("HTTP status {status}"),
            status: Some(status),
            timed_out: false,
        }
    }

    /// HTTP status, if the server answered.
    #[must_use]
    pub const fn http_status(&self) -> Option<u16> {
        self.status
    }

    /// Whether the request timed out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        self.timed_out
    }

    /// Error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
            timed_out: err.is_timeout(),
        }
    }
}

/// Errors returned by API calls.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// The request failed before an API answer was received.
    #[error("Failure: {0}")]
    Transport(#[from] TransportError),

    /// The answer was not the expected JSON envelope.
    #[error("Failure: malformed response: {0}")]
    Decode(String),

    /// The API reported an error.
    #[error("Domain error: {message}")]
    Domain {
        code: i64,
        message: String,
        method: Option<String>,
    },
}

#[derive(Deserialize)]
struct DomainPayload {
    #[serde(default = "unknown_code")]
    error_code: i64,
    #[serde(default)]
    error_msg: String,
    #[serde(default)]
    method: Option<String>,
}

const fn unknown_code() -> i64 {
    error_code::UNKNOWN_ERROR
}

impl ApiError {
    /// Build a domain error from an `error` / `execute_errors` payload.
    ///
    /// Payloads that do not look like an error object become
    /// [`error_code::UNKNOWN_ERROR`] with the payload rendered as the message.
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        match DomainPayload::deserialize(payload) {
            Ok(p) => Self::Domain {
                code: p.error_code,
                message: p.error_msg,
                method: p.method,
            },
            Err(_) => Self::Domain {
                code: error_code::UNKNOWN_ERROR,
                message: payload.to_string(),
                method: None,
            },
        }
    }

    /// Domain error code, if this is a domain error.
    #[must_use]
    pub const fn code(&self) -> Option<i64> {
        match self {
            Self::Domain { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the error comes from the API rather than the transport.
    #[must_use]
    pub const fn is_domain(&self) -> bool {
        matches!(self, Self::Domain { .. })
    }

    /// Check if repeating the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Decode(_) => false,
            Self::Domain { code, .. } => matches!(
                *code,
                error_code::UNKNOWN_ERROR
                    | error_code::TOO_MANY_REQUESTS
                    | error_code::TOO_MANY_SIMILAR_ACTIONS
                    | error_code::INTERNAL_ERROR
            ),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.into())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
