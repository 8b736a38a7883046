//! Exponential backoff state owned by a single repeater.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Doubling delay between a floor and a ceiling.
///
/// The `n`-th consecutive call to [`Backoff::next_delay`] returns
/// `min(floor * 2^(n-1), ceiling)`. [`Backoff::reset`] starts over at the floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl Backoff {
    /// Create backoff state starting at `floor`.
    ///
    /// A ceiling below the floor is raised to the floor.
    #[must_use]
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        let ceiling = ceiling.max(floor);
        Self {
            floor,
            ceiling,
            current: floor,
        }
    }

    /// Create backoff state from millisecond values.
    #[must_use]
    pub fn from_millis(floor_ms: u64, ceiling_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(floor_ms),
            Duration::from_millis(ceiling_ms),
        )
    }

    /// Delay the next suppressed failure will wait.
    #[must_use]
    pub const fn current(&self) -> Duration {
        self.current
    }

    /// Lower bound.
    #[must_use]
    pub const fn floor(&self) -> Duration {
        self.floor
    }

    /// Upper bound.
    #[must_use]
    pub const fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Take the current delay and double it for the next failure.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.ceiling);
        delay
    }

    /// Return to the floor.
    pub const fn reset(&mut self) {
        self.current = self.floor;
    }
}

/// Shared trigger that sends every subscribed repeater back to its floor.
///
/// Each repeater keeps its own [`Backoff`]; the trigger only bumps a
/// generation counter that subscribers compare against before their next
/// delay.
#[derive(Debug, Clone, Default)]
pub struct BackoffReset {
    generation: Arc<AtomicU64>,
}

impl BackoffReset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a reset from all subscribers.
    pub fn trigger(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Number of resets requested so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_ceiling() {
        let mut backoff = Backoff::from_millis(50, 300);
        let delays: Vec<u128> = (0..6).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![50, 100, 200, 300, 300, 300]);
    }

    #[test]
    fn equal_floor_and_ceiling_never_grows() {
        let mut backoff = Backoff::from_millis(20, 20);
        for _ in 0..10 {
            assert_eq!(backoff.next_delay(), Duration::from_millis(20));
        }
    }

    #[test]
    fn reset_returns_to_floor() {
        let mut backoff = Backoff::from_millis(10, 1_000);
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.current(), Duration::from_millis(40));

        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_millis(10));
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
    }

    #[test]
    fn ceiling_below_floor_is_raised() {
        let backoff = Backoff::from_millis(500, 100);
        assert_eq!(backoff.floor(), Duration::from_millis(500));
        assert_eq!(backoff.ceiling(), Duration::from_millis(500));
    }

    #[test]
    fn reset_trigger_is_shared_between_clones() {
        let reset = BackoffReset::new();
        let subscriber = reset.clone();
        assert_eq!(subscriber.generation(), 0);

        reset.trigger();
        reset.trigger();
        assert_eq!(subscriber.generation(), 2);
    }

    #[test]
    fn huge_delays_saturate() {
        let mut backoff = Backoff::new(Duration::MAX / 2 + Duration::from_secs(1), Duration::MAX);
        backoff.next_delay();
        assert_eq!(backoff.current(), Duration::MAX);
    }
}
