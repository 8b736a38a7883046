//! Assembles the self-healing long-poll pipeline.
//!
//! ```text
//! infinite(context)
//!   -> repeater (lets End through, retries the rest)
//!   -> credential stage
//!   -> cache-first (reuses credentials until a signal comes back)
//!   -> repeater (lets SessionInvalid and End through, retries the rest)
//!   -> poll stage
//! ```
//!
//! Failures travel upstream until a repeater suppresses them. A poll failure
//! is retried by the inner repeater with the cached credentials (and the
//! replacement cursor, if any). `SessionInvalid` passes the inner repeater,
//! clears the cache and is retried by the outer repeater, which fetches new
//! credentials. Only `End` unwinds everything.
//!
//! Every delivered batch sends both repeaters back to their retry floor.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vkpoll_stream::{BackoffReset, BoxSource, Signal, SourceExt, infinite};

use crate::config::LongPollConfig;
use crate::credentials::{CredentialStage, SessionContext};
use crate::error::LongPollError;
use crate::poll::{PollStage, UpdateBatch};
use crate::transport::RawSend;

/// The assembled pipeline: a pull source of update batches.
pub type UpdateStream = BoxSource<UpdateBatch, LongPollError>;

/// Outer repeater: only termination is passed on.
#[must_use]
pub const fn is_end(signal: &Signal<LongPollError>) -> bool {
    signal.is_end()
}

/// Inner repeater: a dead session must reach the credential stage.
#[must_use]
pub const fn is_session_invalid_or_end(signal: &Signal<LongPollError>) -> bool {
    matches!(signal, Signal::End | Signal::Error(LongPollError::SessionInvalid))
}

/// Build the pipeline. Every stage observes `cancel`.
pub fn build_pipeline(
    context: SessionContext,
    sender: Arc<dyn RawSend>,
    config: &LongPollConfig,
    cancel: CancellationToken,
) -> UpdateStream {
    let reset = BackoffReset::new();
    infinite::<_, LongPollError, _>(move || context.clone())
        .repeat_on(is_end, config.backoff(), cancel.clone())
        .with_label("credentials")
        .with_reset(reset.clone())
        .probe("creds")
        .map_recover(CredentialStage, cancel.clone())
        .cache_first()
        .probe("lp")
        .repeat_on(is_session_invalid_or_end, config.backoff(), cancel.clone())
        .with_label("long-poll")
        .with_reset(reset.clone())
        .map_recover(PollStage::new(sender, config.poll_timeout()), cancel)
        .resets_backoff(reset)
        .probe("data")
        .boxed()
}
