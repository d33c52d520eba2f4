//! The consumer: replays queued messages against the calendar API.
//!
//! For each delivery the consumer:
//! 1. classifies what happened ([`Outcome`])
//! 2. turns the outcome into a [`Plan`]: a [`Disposition`] plus a [`Wait`]
//! 3. settles the delivery, forwards it to the error queue if the plan says
//!    so, then holds for the remainder of the wait
//!
//! Deliveries are handled strictly one at a time. The next one is only
//! requested after the previous wait has elapsed, which is what throttles
//! consumption. [`ConsumerState`] is owned by the single [`Consumer`] and
//! needs no locking for that reason.
//!
//! [`Disposition`]: crate::broker::Disposition

mod handler;
mod outcome;
mod pacing;


pub use handler::{Consumer, Handled};
pub use outcome::{Outcome, Plan, RATE_LIMIT_MARKER, Wait};
pub use pacing::{BackoffPolicy, Pacing, PacingPolicy};

/// Counters that drive pacing and backoff.
///
/// Starts at zero when the process starts and is never persisted. Both
/// counters only grow: they are bumped on every rate-limited call and are
/// not reset by later successes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerState {
    consecutive_failures: u32,
    backoff_counter: u32,
}

impl ConsumerState {
    /// Creates a state with both counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            consecutive_failures: 0,
            backoff_counter: 0,
        }
    }

    /// Number of rate-limited calls seen, input to the pacing delay.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Input to the backoff delay.
    #[must_use]
    pub const fn backoff_counter(&self) -> u32 {
        self.backoff_counter
    }

    /// Records a rate-limited call.
    pub const fn record_rate_limit(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.backoff_counter = self.backoff_counter.saturating_add(1);
    }
}
