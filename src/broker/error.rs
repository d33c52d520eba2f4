//! Error types for queue transport operations.

use std::time::Duration;

use thiserror::Error;

/// Error type for broker operations (publish, subscribe, settle).
#[derive(Debug, Error)]
pub enum BrokerError {
    /// None of the configured broker addresses accepted a connection.
    #[error("No broker reachable ({attempts} tried): {last}")]
    Unavailable {
        /// Number of addresses tried
        attempts: usize,
        /// Description of the last failure
        last: String,
    },

    /// The operation did not finish within its deadline.
    #[error("Broker operation timed out after {0:?}")]
    Timeout(Duration),

    /// The broker has been closed and accepts no more work.
    #[error("Broker is closed")]
    Closed,

    /// Redis reported an error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// The transport failed to hand over a usable message.
///
/// Carried by a delivery in place of its payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Reading from the broker failed.
    #[error("Receive failed: {0}")]
    Receive(String),

    /// The broker returned an entry without a payload.
    #[error("Malformed frame {id}: {reason}")]
    MalformedFrame {
        /// Broker-assigned entry id
        id: String,
        /// What was wrong with the entry
        reason: String,
    },
}
