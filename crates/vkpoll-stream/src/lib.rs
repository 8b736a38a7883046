//! Pull-based stream stages.
//!
//! A [`Source`] yields one value per [`Source::pull`]. Each pull may carry a
//! [`Signal`] travelling toward the producer (an error to recover from, or an
//! explicit end), and each answer is either a value or a signal travelling back
//! toward the consumer. Stages wrap an upstream source and intercept traffic in
//! both directions:
//!
//! - [`CacheFirst`]: remembers the last value and replays it on plain pulls
//! - [`BackoffRepeater`]: turns selected signals into delayed retries
//! - [`ResetOnValue`]: returns subscribed repeaters to their floor on success
//! - [`AsyncMapRecover`]: maps values asynchronously, hands mapper failures back
//!   upstream, and drops in-flight work on cancellation
//! - [`Probe`]: traces pulls and answers
//!
//! # Example
//!
//! ```ignore
//! use vkpoll_stream::{Backoff, SourceExt, infinite, map_fn};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let mut pipeline = infinite::<_, String, _>(|| 21)
//!     .repeat_on(|signal| signal.is_end(), Backoff::from_millis(100, 1_000), cancel.clone())
//!     .map_recover(map_fn(|n: i32| async move { Ok(n * 2) }), cancel);
//!
//! assert_eq!(pipeline.pull(None).await, Ok(42));
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod async_map;
mod backoff;
mod cache;
mod probe;
mod repeater;
mod signal;
mod source;

pub use async_map::{AsyncMap, AsyncMapRecover, MapFn, map_fn};
pub use backoff::{Backoff, BackoffReset};
pub use cache::CacheFirst;
pub use probe::Probe;
pub use repeater::{BackoffRepeater, ResetOnValue};
pub use signal::{Pulled, Signal};
pub use source::{BoxSource, Infinite, Source, SourceExt, Values, infinite, values};
