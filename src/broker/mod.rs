//! Queue transport seam.
//!
//! The consumer and the ingress adapter never talk to a concrete broker.
//! They see:
//! - [`Publisher`]: publish a payload to a named queue with a deadline
//! - [`Broker`]: a publisher that can also open a [`Subscription`]
//! - [`Delivery`]: one message handed to the consumer, settled exactly once
//!   with a [`Disposition`]
//!
//! Two transports are provided: [`MemoryBroker`] keeps queues inside the
//! process, [`RedisBroker`] uses a Redis Streams consumer group.
//!
//! A subscription yields the next delivery only when asked, so a consumer
//! that finishes (and sleeps) before asking again has at most one message
//! in flight.

mod error;
mod memory;
mod redis_streams;

#[cfg(test)]
mod memory_tests;

use std::future::Future;
use std::time::Duration;

pub use error::{BrokerError, DeliveryError};
pub use memory::{MemoryBroker, MemoryDelivery, MemorySubscription};
pub use redis_streams::{RedisBroker, RedisDelivery, RedisSubscription};

/// Terminal action taken on a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Processing finished; remove the message permanently.
    Accept,
    /// The message is unusable; drop it without redelivery.
    Reject,
    /// Return the message to the queue for redelivery.
    Release,
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Accept => "accepted",
            Self::Reject => "rejected",
            Self::Release => "released",
        };
        f.write_str(name)
    }
}

/// Options for a single publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    /// Deadline for the broker to confirm the publish.
    pub timeout: Duration,
    /// Durability marker attached to the message.
    pub persistent: bool,
}

impl PublishOptions {
    /// Options for a durable publish with the given deadline.
    #[must_use]
    pub const fn persistent(timeout: Duration) -> Self {
        Self {
            timeout,
            persistent: true,
        }
    }

    /// Options for a publish without a durability marker.
    #[must_use]
    pub const fn transient(timeout: Duration) -> Self {
        Self {
            timeout,
            persistent: false,
        }
    }
}

/// Publishes raw payloads onto named queues.
pub trait Publisher: Send + Sync {
    /// Makes one publish attempt. No retries are performed.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] if the broker is unreachable, rejects the
    /// message, or does not confirm within `options.timeout`.
    fn publish(
        &self,
        queue: &str,
        payload: &[u8],
        options: PublishOptions,
    ) -> impl Future<Output = Result<(), BrokerError>> + Send;
}

/// One message handed to the consumer.
pub trait Delivery: Send {
    /// Broker-assigned identifier, used for logging.
    fn id(&self) -> &str;

    /// The raw payload, or the reason the transport could not produce one.
    ///
    /// # Errors
    ///
    /// Returns the [`DeliveryError`] reported by the transport.
    fn payload(&self) -> Result<&[u8], &DeliveryError>;

    /// Settles the message. Consumes the delivery so it can only happen once.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] if the broker could not record the disposition.
    fn settle(self, disposition: Disposition)
    -> impl Future<Output = Result<(), BrokerError>> + Send;
}

/// Stream of deliveries from one queue.
pub trait Subscription: Send {
    /// Delivery type produced by this subscription.
    type Delivery: Delivery;

    /// Waits for the next delivery. Returns `None` once the subscription ends.
    fn next(&mut self) -> impl Future<Output = Option<Self::Delivery>> + Send;
}

/// A publisher that can also subscribe to queues.
pub trait Broker: Publisher + Clone + 'static {
    /// Subscription type produced by this broker.
    type Subscription: Subscription;

    /// Subscribes to `queue`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] if the subscription cannot be established.
    fn subscribe(
        &self,
        queue: &str,
    ) -> impl Future<Output = Result<Self::Subscription, BrokerError>> + Send;
}
