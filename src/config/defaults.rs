//! Default values for configuration options.
//!
//! Centralized constants to avoid magic numbers scattered across the codebase.

use std::time::Duration;

/// Default address for the ingress server.
pub const LISTEN: &str = "0.0.0.0:8080";

/// Default Redis consumer group.
pub const CONSUMER_GROUP: &str = "calendar-queue";

/// Default consumer name within the group.
pub const CONSUMER_NAME: &str = "consumer-1";

/// Default base pacing delay in milliseconds.
pub const PACING_BASE_DELAY_MS: u64 = 500;

/// Default maximum pacing delay in milliseconds.
pub const PACING_MAX_DELAY_MS: u64 = 10_000;

/// Default pacing exponent base.
pub const PACING_EXPONENT_BASE: f64 = 2.0;

/// Default base backoff delay in seconds.
pub const BACKOFF_BASE_DELAY_SECS: u64 = 120;

/// Default maximum backoff delay in seconds.
pub const BACKOFF_MAX_DELAY_SECS: u64 = 3600;

/// Default backoff exponent base.
pub const BACKOFF_EXPONENT_BASE: f64 = 2.0;

/// Timeout for a single calendar API call in seconds. Not configurable.
pub const DOWNSTREAM_TIMEOUT_SECS: u64 = 30;

/// Timeout for a single calendar API call.
#[must_use]
pub const fn downstream_timeout() -> Duration {
    Duration::from_secs(DOWNSTREAM_TIMEOUT_SECS)
}
