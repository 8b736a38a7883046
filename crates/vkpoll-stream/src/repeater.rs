//! Stage that converts selected signals into delayed retries.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backoff::{Backoff, BackoffReset};
use crate::signal::{Pulled, Signal};
use crate::source::Source;

/// Suppresses signals and retries with exponential backoff.
///
/// For every signal arriving from downstream, `propagate` decides its fate:
///
/// - `true`: the signal is forwarded upstream unmodified and the backoff resets.
/// - `false`: the signal is dropped, the stage waits [`Backoff::next_delay`],
///   then issues a plain pull upstream.
///
/// A plain pull resets the backoff to its floor, and so does a trigger of the
/// [`BackoffReset`] given to [`BackoffRepeater::with_reset`]. Cancelling the
/// token while a retry is pending forwards [`Signal::End`] upstream instead of
/// retrying.
pub struct BackoffRepeater<S, P> {
    upstream: S,
    propagate: P,
    backoff: Backoff,
    cancel: CancellationToken,
    label: &'static str,
    reset: Option<(BackoffReset, u64)>,
}

impl<S, P> BackoffRepeater<S, P> {
    /// Wrap `upstream`.
    pub const fn new(upstream: S, propagate: P, backoff: Backoff, cancel: CancellationToken) -> Self {
        Self {
            upstream,
            propagate,
            backoff,
            cancel,
            label: "repeater",
            reset: None,
        }
    }

    /// Builder: set the label used in log events.
    #[must_use]
    pub const fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Builder: return to the floor whenever `reset` is triggered.
    #[must_use]
    pub fn with_reset(mut self, reset: BackoffReset) -> Self {
        let seen = reset.generation();
        self.reset = Some((reset, seen));
        self
    }

    /// Current backoff state.
    pub const fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    fn apply_external_reset(&mut self) {
        if let Some((reset, seen)) = &mut self.reset {
            let generation = reset.generation();
            if generation != *seen {
                *seen = generation;
                self.backoff.reset();
            }
        }
    }
}

#[async_trait]
impl<S, P> Source for BackoffRepeater<S, P>
where
    S: Source,
    P: Fn(&Signal<S::Error>) -> bool + Send,
{
    type Item = S::Item;
    type Error = S::Error;

    async fn pull(&mut self, signal: Option<Signal<S::Error>>) -> Pulled<S::Item, S::Error> {
        let Some(signal) = signal else {
            self.backoff.reset();
            return self.upstream.pull(None).await;
        };

        if (self.propagate)(&signal) {
            debug!(stage = self.label, end = signal.is_end(), "propagating signal");
            self.backoff.reset();
            return self.upstream.pull(Some(signal)).await;
        }

        self.apply_external_reset();
        let delay = self.backoff.next_delay();
        debug!(
            stage = self.label,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "suppressing signal, retrying after backoff"
        );

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!(stage = self.label, "retry cancelled");
                return self.upstream.pull(Some(Signal::End)).await;
            }
            () = tokio::time::sleep(delay) => {}
        }

        self.upstream.pull(None).await
    }
}

/// Triggers a [`BackoffReset`] for every value that passes through.
pub struct ResetOnValue<S> {
    upstream: S,
    reset: BackoffReset,
}

impl<S> ResetOnValue<S> {
    pub const fn new(upstream: S, reset: BackoffReset) -> Self {
        Self { upstream, reset }
    }
}

#[async_trait]
impl<S: Source> Source for ResetOnValue<S> {
    type Item = S::Item;
    type Error = S::Error;

    async fn pull(&mut self, signal: Option<Signal<S::Error>>) -> Pulled<S::Item, S::Error> {
        let pulled = self.upstream.pull(signal).await;
        if pulled.is_ok() {
            self.reset.trigger();
        }
        pulled
    }
}
