//! Outcome classification and the plan derived from it.

use std::time::Duration;

use crate::broker::{DeliveryError, Disposition};
use crate::downstream::HttpResponse;

/// Substring in a response body that marks the call as rate-limited.
///
/// Matched case-insensitively.
pub const RATE_LIMIT_MARKER: &str = "ratelimitexceeded";

/// What happened to one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The transport could not produce a message.
    DeliveryFailed(DeliveryError),

    /// The payload is not a valid queued message.
    Undecodable(String),

    /// The message decoded but cannot form an HTTP request.
    InvalidRequest(String),

    /// The calendar API could not be reached.
    Unreachable(String),

    /// The calendar API answered with a 2xx status.
    Succeeded {
        /// Response status
        status: http::StatusCode,
    },

    /// The calendar API throttled the call.
    RateLimited {
        /// Response status
        status: http::StatusCode,
    },

    /// The calendar API answered with a non-retriable failure.
    Failed {
        /// Response status
        status: http::StatusCode,
    },
}

impl Outcome {
    /// Classifies a response from the calendar API.
    ///
    /// A 2xx status is a success. Any other status is a rate limit when the
    /// body contains [`RATE_LIMIT_MARKER`] (ignoring case) and a plain
    /// failure otherwise.
    #[must_use]
    pub fn from_response(response: &HttpResponse) -> Self {
        let status = response.status;
        if response.is_success() {
            Self::Succeeded { status }
        } else if is_rate_limited(&response.body_text()) {
            Self::RateLimited { status }
        } else {
            Self::Failed { status }
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeliveryFailed(e) => write!(f, "delivery failed: {e}"),
            Self::Undecodable(reason) => write!(f, "undecodable message: {reason}"),
            Self::InvalidRequest(reason) => write!(f, "invalid request: {reason}"),
            Self::Unreachable(reason) => write!(f, "calendar unreachable: {reason}"),
            Self::Succeeded { status } => write!(f, "success ({status})"),
            Self::RateLimited { status } => write!(f, "rate limited ({status})"),
            Self::Failed { status } => write!(f, "failure ({status})"),
        }
    }
}

fn is_rate_limited(body: &str) -> bool {
    body.to_lowercase().contains(RATE_LIMIT_MARKER)
}

/// How long to hold the consumer after settling a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Return straight away.
    Immediate,

    /// Sleep the full duration, regardless of how long processing took.
    Cooldown(Duration),

    /// Sleep whatever is left of the duration after processing time.
    Paced(Duration),
}

/// Disposition and wait chosen for one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    /// How the delivery is settled.
    pub disposition: Disposition,
    /// How long to hold the consumer afterwards.
    pub wait: Wait,
    /// Whether the raw payload is forwarded to the error queue.
    pub escalate: bool,
}

impl Plan {
    /// Creates a plan that does not escalate.
    #[must_use]
    pub const fn new(disposition: Disposition, wait: Wait) -> Self {
        Self {
            disposition,
            wait,
            escalate: false,
        }
    }

    /// Marks the plan as forwarding the payload to the error queue.
    #[must_use]
    pub const fn escalated(mut self) -> Self {
        self.escalate = true;
        self
    }
}
