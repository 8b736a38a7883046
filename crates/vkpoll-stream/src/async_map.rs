//! Stage that maps values asynchronously and recovers from mapper failures.

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::signal::{Pulled, Signal};
use crate::source::Source;

/// Asynchronous mapping from `T` to [`AsyncMap::Output`].
///
/// Mappers own whatever state they need between calls; the stage guarantees
/// `map` is never re-entered while a previous call is in flight.
#[async_trait]
pub trait AsyncMap<T: Send + 'static>: Send {
    /// Mapped value.
    type Output: Send + 'static;
    /// Failure, sent back upstream as [`Signal::Error`].
    type Error: Send + 'static;

    /// Map one input.
    async fn map(&mut self, input: T) -> Result<Self::Output, Self::Error>;
}

/// [`AsyncMap`] adapter for closures returning futures.
pub struct MapFn<F>(F);

/// Wrap a closure as an [`AsyncMap`].
pub const fn map_fn<F>(f: F) -> MapFn<F> {
    MapFn(f)
}

#[async_trait]
impl<T, U, E, F, Fut> AsyncMap<T> for MapFn<F>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
    F: FnMut(T) -> Fut + Send,
    Fut: Future<Output = Result<U, E>> + Send + 'static,
{
    type Output = U;
    type Error = E;

    async fn map(&mut self, input: T) -> Result<U, E> {
        (self.0)(input).await
    }
}

/// Maps each upstream value through an [`AsyncMap`].
///
/// - An error or end answered by upstream is returned unchanged.
/// - A mapper failure is not returned: it is sent upstream as
///   [`Signal::Error`] with the next pull, so an upstream repeater can classify
///   and retry it. Whatever upstream answers is then mapped as usual.
/// - The in-flight mapper future races the cancellation token. On
///   cancellation it is dropped, [`Signal::End`] is forwarded upstream, and
///   `End` is returned; the cancelled work yields neither a value nor an error.
pub struct AsyncMapRecover<S, M> {
    upstream: S,
    mapper: M,
    cancel: CancellationToken,
}

impl<S, M> AsyncMapRecover<S, M> {
    /// Wrap `upstream`.
    pub const fn new(upstream: S, mapper: M, cancel: CancellationToken) -> Self {
        Self {
            upstream,
            mapper,
            cancel,
        }
    }
}

impl<S, M> AsyncMapRecover<S, M>
where
    S: Source,
{
    async fn unwind(&mut self) -> Signal<S::Error> {
        // Upstream is idle here; let it release its own state before we stop.
        let _ = self.upstream.pull(Some(Signal::End)).await;
        Signal::End
    }
}

#[async_trait]
impl<S, M> Source for AsyncMapRecover<S, M>
where
    S: Source,
    M: AsyncMap<S::Item, Error = S::Error>,
{
    type Item = M::Output;
    type Error = S::Error;

    async fn pull(&mut self, signal: Option<Signal<S::Error>>) -> Pulled<M::Output, S::Error> {
        let mut signal = signal;
        loop {
            let input = self.upstream.pull(signal.take()).await?;

            if self.cancel.is_cancelled() {
                debug!("cancelled before dispatch");
                return Err(self.unwind().await);
            }

            let mapped = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                mapped = self.mapper.map(input) => Some(mapped),
            };

            match mapped {
                Some(Ok(output)) => return Ok(output),
                Some(Err(err)) => {
                    debug!("mapper failed, handing failure upstream");
                    signal = Some(Signal::Error(err));
                }
                None => {
                    debug!("in-flight mapping cancelled");
                    return Err(self.unwind().await);
                }
            }
        }
    }
}
