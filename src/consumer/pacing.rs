//! Pacing and backoff calculators.
//!
//! Two independent exponential waits, each clamped to its own ceiling:
//!
//! - **Pacing** spaces out every processed message:
//!   `base + 100ms × exponent_base ^ consecutive_failures`
//! - **Backoff** applies after a rate-limited call:
//!   `base + 30min × exponent_base ^ backoff_counter` (just `base` at zero)

use std::time::Duration;

use super::{ConsumerState, Outcome, Plan, Wait};
use crate::broker::Disposition;

/// Spacing applied between processed messages.
///
/// # Example
///
/// ```
/// use calendar_queue::consumer::PacingPolicy;
/// use std::time::Duration;
///
/// let policy = PacingPolicy::new()
///     .with_base_delay(Duration::ZERO)
///     .with_exponent_base(2.0);
///
/// assert_eq!(policy.delay(3), Duration::from_millis(800));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PacingPolicy {
    /// When false, every message is spaced by exactly `base_delay`.
    pub adaptive: bool,

    /// Delay applied before any failure has been counted.
    pub base_delay: Duration,

    /// Ceiling for the computed delay.
    pub max_delay: Duration,

    /// Growth factor per consecutive failure. Always greater than 1.
    pub exponent_base: f64,
}

impl PacingPolicy {
    /// Unit multiplied by the exponential factor.
    pub const UNIT: Duration = Duration::from_millis(100);

    /// Default base delay (500 milliseconds).
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

    /// Default ceiling (10 seconds).
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

    /// Default exponent base (2.0).
    pub const DEFAULT_EXPONENT_BASE: f64 = 2.0;

    /// Creates an adaptive pacing policy with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            adaptive: true,
            base_delay: Self::DEFAULT_BASE_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
            exponent_base: Self::DEFAULT_EXPONENT_BASE,
        }
    }

    /// Enables or disables adaptive pacing.
    #[must_use]
    pub const fn with_adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the ceiling.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the exponent base.
    ///
    /// # Panics
    ///
    /// Panics if `exponent_base` is not greater than 1.
    #[must_use]
    pub fn with_exponent_base(mut self, exponent_base: f64) -> Self {
        assert!(exponent_base > 1.0, "exponent_base must be greater than 1");
        self.exponent_base = exponent_base;
        self
    }

    /// Computes the pacing delay after `consecutive_failures` failures.
    #[must_use]
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        if !self.adaptive {
            return self.base_delay;
        }
        exponential_delay(
            self.base_delay,
            Self::UNIT,
            self.exponent_base,
            consecutive_failures,
            self.max_delay,
        )
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Escalating wait applied after a rate-limited call.
///
/// [`Pacing::plan`] counts the current rate limit before asking for a
/// delay, so the counter is at least 1 and every wait includes at least one
/// 30 minute unit. With the defaults even the first rate limit waits the
/// full one hour ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Offset added to every computed delay; returned alone for a zero counter.
    pub base_delay: Duration,

    /// Ceiling for the computed delay.
    pub max_delay: Duration,

    /// Growth factor per rate-limited call. Always greater than 1.
    pub exponent_base: f64,
}

impl BackoffPolicy {
    /// Unit multiplied by the exponential factor.
    pub const UNIT: Duration = Duration::from_secs(30 * 60);

    /// Default base delay (2 minutes).
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(120);

    /// Default ceiling (1 hour).
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(3600);

    /// Default exponent base (2.0).
    pub const DEFAULT_EXPONENT_BASE: f64 = 2.0;

    /// Creates a backoff policy with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base_delay: Self::DEFAULT_BASE_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
            exponent_base: Self::DEFAULT_EXPONENT_BASE,
        }
    }

    /// Sets the base delay.
    #[must_use]
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the ceiling.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the exponent base.
    ///
    /// # Panics
    ///
    /// Panics if `exponent_base` is not greater than 1.
    #[must_use]
    pub fn with_exponent_base(mut self, exponent_base: f64) -> Self {
        assert!(exponent_base > 1.0, "exponent_base must be greater than 1");
        self.exponent_base = exponent_base;
        self
    }

    /// Computes the backoff delay for the given counter value.
    #[must_use]
    pub fn delay(&self, backoff_counter: u32) -> Duration {
        if backoff_counter == 0 {
            return self.base_delay;
        }
        exponential_delay(
            self.base_delay,
            Self::UNIT,
            self.exponent_base,
            backoff_counter,
            self.max_delay,
        )
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the consumer needs to decide how long to wait.
#[derive(Debug, Clone, PartialEq)]
pub struct Pacing {
    /// Spacing between processed messages.
    pub pacing: PacingPolicy,
    /// Wait after a rate-limited call.
    pub backoff: BackoffPolicy,
    /// Fixed pause after the calendar API could not be reached.
    pub unreachable_cooldown: Duration,
}

impl Pacing {
    /// Default cooldown after the calendar API could not be reached (60 seconds).
    pub const DEFAULT_UNREACHABLE_COOLDOWN: Duration = Duration::from_secs(60);

    /// Combines the two policies with the default cooldown.
    #[must_use]
    pub const fn new(pacing: PacingPolicy, backoff: BackoffPolicy) -> Self {
        Self {
            pacing,
            backoff,
            unreachable_cooldown: Self::DEFAULT_UNREACHABLE_COOLDOWN,
        }
    }

    /// Sets the cooldown used after the calendar API could not be reached.
    #[must_use]
    pub const fn with_unreachable_cooldown(mut self, cooldown: Duration) -> Self {
        self.unreachable_cooldown = cooldown;
        self
    }

    /// Decides disposition and wait for `outcome`.
    ///
    /// A rate-limited outcome bumps both counters in `state` before the
    /// backoff delay is computed. No other outcome touches `state`.
    #[must_use]
    pub fn plan(&self, outcome: &Outcome, state: &mut ConsumerState) -> Plan {
        match outcome {
            Outcome::DeliveryFailed(_) => Plan::new(Disposition::Release, Wait::Immediate),
            Outcome::Undecodable(_) | Outcome::InvalidRequest(_) => {
                Plan::new(Disposition::Reject, Wait::Immediate)
            }
            Outcome::Unreachable(_) => Plan::new(
                Disposition::Release,
                Wait::Cooldown(self.unreachable_cooldown),
            ),
            Outcome::Succeeded { .. } => Plan::new(
                Disposition::Accept,
                Wait::Paced(self.pacing.delay(state.consecutive_failures())),
            ),
            Outcome::RateLimited { .. } => {
                state.record_rate_limit();
                Plan::new(
                    Disposition::Release,
                    Wait::Paced(self.backoff.delay(state.backoff_counter())),
                )
            }
            Outcome::Failed { .. } => Plan::new(
                Disposition::Accept,
                Wait::Paced(self.pacing.delay(state.consecutive_failures())),
            )
            .escalated(),
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::new(PacingPolicy::default(), BackoffPolicy::default())
    }
}

/// `base + unit × exponent_base ^ n`, clamped to `ceiling`.
///
/// Monotone in `n` because `exponent_base > 1`; overflow saturates to the ceiling.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn exponential_delay(
    base: Duration,
    unit: Duration,
    exponent_base: f64,
    n: u32,
    ceiling: Duration,
) -> Duration {
    let factor = exponent_base.powi(i32::try_from(n).unwrap_or(i32::MAX));
    let total = (unit.as_nanos() as f64).mul_add(factor, base.as_nanos() as f64);

    if total.is_nan() || total >= ceiling.as_nanos() as f64 {
        return ceiling;
    }
    Duration::from_nanos(total as u64)
}
