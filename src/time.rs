//! Time abstraction for testability.
//!
//! The consumer measures how long a delivery took and then sleeps for the
//! rest of its wait. Both operations go through the traits in this module
//! so tests can inject a controlled clock and a sleeper that records instead
//! of blocking.

use std::future::Future;
use std::time::{Duration, Instant};

/// Abstraction over a monotonic clock.
///
/// # Example
///
/// ```
/// use calendar_queue::time::{Clock, MonotonicClock};
///
/// let clock = MonotonicClock;
/// let start = clock.now();
/// assert!(clock.now() >= start);
/// ```
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Production clock backed by [`Instant::now()`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Abstraction over "block this task for a while".
pub trait Sleeper: Send + Sync {
    /// Sleeps for the given duration.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Production sleeper using [`tokio::time::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
