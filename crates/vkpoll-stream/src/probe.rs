//! Tracing pass-through stage.

use std::fmt::Debug;

use async_trait::async_trait;
use tracing::trace;

use crate::signal::{Pulled, Signal};
use crate::source::Source;

/// Logs every pull and answer at `trace` level without altering them.
pub struct Probe<S> {
    upstream: S,
    name: &'static str,
}

impl<S> Probe<S> {
    /// Wrap `upstream` under `name`.
    pub const fn new(upstream: S, name: &'static str) -> Self {
        Self { upstream, name }
    }
}

#[async_trait]
impl<S> Source for Probe<S>
where
    S: Source,
    S::Item: Debug,
    S::Error: Debug,
{
    type Item = S::Item;
    type Error = S::Error;

    async fn pull(&mut self, signal: Option<Signal<S::Error>>) -> Pulled<S::Item, S::Error> {
        trace!(probe = self.name, ?signal, "pull");
        let answer = self.upstream.pull(signal).await;
        match &answer {
            Ok(value) => trace!(probe = self.name, ?value, "value"),
            Err(signal) => trace!(probe = self.name, ?signal, "signal"),
        }
        answer
    }
}
