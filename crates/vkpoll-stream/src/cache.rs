//! Stage that replays the last produced value.

use async_trait::async_trait;
use tracing::trace;

use crate::signal::{Pulled, Signal};
use crate::source::Source;

/// Replays the remembered value on plain pulls.
///
/// Signals always go upstream, and whatever upstream answers replaces the
/// remembered value: a new value is cached, an error or end clears the cache.
pub struct CacheFirst<S: Source> {
    upstream: S,
    cached: Option<S::Item>,
}

impl<S: Source> CacheFirst<S> {
    /// Wrap `upstream` with an empty cache.
    pub const fn new(upstream: S) -> Self {
        Self {
            upstream,
            cached: None,
        }
    }
}

#[async_trait]
impl<S> Source for CacheFirst<S>
where
    S: Source,
    S::Item: Clone,
{
    type Item = S::Item;
    type Error = S::Error;

    async fn pull(&mut self, signal: Option<Signal<S::Error>>) -> Pulled<S::Item, S::Error> {
        if signal.is_none() {
            if let Some(value) = &self.cached {
                trace!("replaying cached value");
                return Ok(value.clone());
            }
        }

        let answer = self.upstream.pull(signal).await;
        self.cached = answer.as_ref().ok().cloned();
        answer
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::source::{SourceExt, infinite, values};

    #[tokio::test]
    async fn pulls_upstream_only_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let mut source = infinite::<_, (), _>(move || counted.fetch_add(1, Ordering::SeqCst) + 1)
            .cache_first();

        for _ in 0..5 {
            assert_eq!(source.pull(None).await, Ok(1));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn signal_bypasses_cache_and_is_not_cached() {
        let mut source = values::<_, &str>([1, 2]).cache_first();

        assert_eq!(source.pull(None).await, Ok(1));

        assert_eq!(
            source.pull(Some(Signal::Error("boom"))).await,
            Err(Signal::Error("boom"))
        );

        assert_eq!(source.pull(None).await, Ok(2));
        assert_eq!(source.pull(None).await, Ok(2));
    }
}
