//! Self-healing long-poll session.
//!
//! A [`LongPollSession`] keeps a long-poll feed running across transient
//! failures: credentials are fetched once and reused, an expired cursor is
//! replaced without re-authenticating, an invalidated session triggers a full
//! credential refresh, and every other failure is retried with exponential
//! backoff. The session only ends when it is aborted.
//!
//! ```ignore
//! use std::sync::Arc;
//! use vkpoll::{CredentialRequest, LongPollConfig, LongPollSession, SessionContext};
//! use vkpoll_api::{ApiClient, ApiConfig, HttpSender};
//!
//! let client = ApiClient::new(ApiConfig::new().with_token(token))?;
//! let context = SessionContext::new(Arc::new(client), CredentialRequest::for_group(42));
//! let mut session = LongPollSession::start(context, Arc::new(HttpSender::new()), LongPollConfig::default());
//! while let Some(batch) = session.next().await {
//!     println!("{batch:?}");
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod credentials;
pub mod cursor;
pub mod error;
pub mod pipeline;
pub mod poll;
pub mod session;
pub mod transport;

pub use config::LongPollConfig;
pub use credentials::{CredentialRequest, CredentialStage, SessionContext, SessionCredentials};
pub use cursor::Cursor;
pub use error::{ConfigError, FailureCause, LongPollError};
pub use pipeline::{UpdateStream, build_pipeline};
pub use poll::{PollOutcome, PollStage, UpdateBatch, long_poll_url};
pub use session::{AbortHandle, LongPollSession};
pub use transport::{RawRequest, RawSend, RemoteMethod};
