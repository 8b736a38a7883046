//! The [`Source`] trait, combinators, and basic producers.

use std::collections::VecDeque;
use std::marker::PhantomData;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::async_map::{AsyncMap, AsyncMapRecover};
use crate::backoff::{Backoff, BackoffReset};
use crate::cache::CacheFirst;
use crate::probe::Probe;
use crate::repeater::{BackoffRepeater, ResetOnValue};
use crate::signal::{Pulled, Signal};

/// A producer that yields one value per pull.
///
/// Passing `None` asks for the next value. Passing `Some(signal)` sends the
/// signal toward the producer; stages decide whether to retry, forward, or
/// answer it. A source is never pulled again while a previous pull is still
/// pending: `&mut self` keeps demand single-outstanding.
#[async_trait]
pub trait Source: Send {
    /// Value produced by this source.
    type Item: Send + 'static;
    /// Error carried by signals on this source.
    type Error: Send + 'static;

    /// Pull the next value, optionally carrying a signal upstream.
    async fn pull(&mut self, signal: Option<Signal<Self::Error>>) -> Pulled<Self::Item, Self::Error>;
}

/// Boxed, type-erased source.
pub type BoxSource<T, E> = Box<dyn Source<Item = T, Error = E>>;

#[async_trait]
impl<S> Source for Box<S>
where
    S: Source + ?Sized,
{
    type Item = S::Item;
    type Error = S::Error;

    async fn pull(&mut self, signal: Option<Signal<Self::Error>>) -> Pulled<Self::Item, Self::Error> {
        (**self).pull(signal).await
    }
}

/// Stage combinators available on every [`Source`].
pub trait SourceExt: Source + Sized {
    /// Replay the last produced value on plain pulls.
    fn cache_first(self) -> CacheFirst<Self>
    where
        Self::Item: Clone,
    {
        CacheFirst::new(self)
    }

    /// Retry suppressed signals after an exponential backoff.
    ///
    /// Signals for which `propagate` returns `true` are forwarded upstream.
    fn repeat_on<P>(
        self,
        propagate: P,
        backoff: Backoff,
        cancel: CancellationToken,
    ) -> BackoffRepeater<Self, P>
    where
        P: Fn(&Signal<Self::Error>) -> bool + Send,
    {
        BackoffRepeater::new(self, propagate, backoff, cancel)
    }

    /// Map values asynchronously, sending mapper failures back upstream.
    fn map_recover<M>(self, mapper: M, cancel: CancellationToken) -> AsyncMapRecover<Self, M>
    where
        M: AsyncMap<Self::Item, Error = Self::Error>,
    {
        AsyncMapRecover::new(self, mapper, cancel)
    }

    /// Trigger `reset` whenever a value comes out of this source.
    fn resets_backoff(self, reset: BackoffReset) -> ResetOnValue<Self> {
        ResetOnValue::new(self, reset)
    }

    /// Trace every pull and answer under `name`.
    fn probe(self, name: &'static str) -> Probe<Self> {
        Probe::new(self, name)
    }

    /// Erase the concrete stage type.
    fn boxed(self) -> BoxSource<Self::Item, Self::Error>
    where
        Self: 'static,
    {
        Box::new(self)
    }
}

impl<S: Source> SourceExt for S {}

/// Source that produces a fresh value from `generate` on every plain pull.
pub struct Infinite<F, E> {
    generate: F,
    _error: PhantomData<fn() -> E>,
}

/// Create a source that never ends on its own.
///
/// A signal arriving at the source is answered with that same signal.
pub const fn infinite<T, E, F>(generate: F) -> Infinite<F, E>
where
    F: FnMut() -> T,
{
    Infinite {
        generate,
        _error: PhantomData,
    }
}

#[async_trait]
impl<T, E, F> Source for Infinite<F, E>
where
    T: Send + 'static,
    E: Send + 'static,
    F: FnMut() -> T + Send,
{
    type Item = T;
    type Error = E;

    async fn pull(&mut self, signal: Option<Signal<E>>) -> Pulled<T, E> {
        match signal {
            Some(signal) => Err(signal),
            None => Ok((self.generate)()),
        }
    }
}

/// Source over a finite list of values, answering `End` once drained.
pub struct Values<T, E> {
    items: VecDeque<T>,
    _error: PhantomData<fn() -> E>,
}

/// Create a finite source from `items`.
pub fn values<T, E>(items: impl IntoIterator<Item = T>) -> Values<T, E> {
    Values {
        items: items.into_iter().collect(),
        _error: PhantomData,
    }
}

#[async_trait]
impl<T, E> Source for Values<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Item = T;
    type Error = E;

    async fn pull(&mut self, signal: Option<Signal<E>>) -> Pulled<T, E> {
        if let Some(signal) = signal {
            return Err(signal);
        }
        self.items.pop_front().ok_or(Signal::End)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn infinite_keeps_generating() {
        let mut counter = 0;
        let mut source = infinite::<_, (), _>(move || {
            counter += 1;
            counter
        });

        assert_eq!(source.pull(None).await, Ok(1));
        assert_eq!(source.pull(None).await, Ok(2));
        assert_eq!(source.pull(None).await, Ok(3));
    }

    #[tokio::test]
    async fn infinite_answers_signals_with_themselves() {
        let mut source = infinite::<_, &str, _>(|| 1);
        assert_eq!(source.pull(Some(Signal::End)).await, Err(Signal::End));
        assert_eq!(
            source.pull(Some(Signal::Error("bad"))).await,
            Err(Signal::Error("bad"))
        );
    }

    #[tokio::test]
    async fn values_end_after_last_item() {
        let mut source = values::<_, ()>([1, 2]);
        assert_eq!(source.pull(None).await, Ok(1));
        assert_eq!(source.pull(None).await, Ok(2));
        assert_eq!(source.pull(None).await, Err(Signal::End));
    }

    #[tokio::test]
    async fn boxed_source_delegates() {
        let mut source = values::<_, ()>(["a"]).boxed();
        assert_eq!(source.pull(None).await, Ok("a"));
        assert_eq!(source.pull(None).await, Err(Signal::End));
    }
}
