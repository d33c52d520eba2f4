//! In-process broker.
//!
//! Queues live in memory for the lifetime of the process. Released messages
//! go back to the head of their queue so they are redelivered next.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use super::{
    Broker, BrokerError, Delivery, DeliveryError, Disposition, PublishOptions, Publisher,
    Subscription,
};

#[derive(Debug)]
struct Entry {
    id: u64,
    payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct Shared {
    queues: Mutex<HashMap<String, VecDeque<Entry>>>,
    notify: Notify,
    next_id: AtomicU64,
    closed: AtomicBool,
}

/// Broker keeping all queues inside the process.
///
/// Cloning is cheap; clones share the same queues.
///
/// # Example
///
/// ```
/// use calendar_queue::broker::{Broker, Delivery, MemoryBroker, PublishOptions, Publisher, Subscription};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let broker = MemoryBroker::new();
/// let mut subscription = broker.subscribe("calendar").await?;
///
/// broker
///     .publish("calendar", b"{}", PublishOptions::persistent(Duration::from_secs(10)))
///     .await?;
///
/// let delivery = subscription.next().await.expect("message");
/// assert_eq!(delivery.payload().unwrap(), b"{}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    shared: Arc<Shared>,
}

impl MemoryBroker {
    /// Creates an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages waiting on `queue` (not counting in-flight deliveries).
    #[must_use]
    pub fn len(&self, queue: &str) -> usize {
        self.queues().get(queue).map_or(0, VecDeque::len)
    }

    /// Returns true if `queue` has no waiting messages.
    #[must_use]
    pub fn is_empty(&self, queue: &str) -> bool {
        self.len(queue) == 0
    }

    /// Returns copies of the payloads waiting on `queue`, head first.
    #[must_use]
    pub fn peek_all(&self, queue: &str) -> Vec<Vec<u8>> {
        self.queues()
            .get(queue)
            .map(|q| q.iter().map(|e| e.payload.clone()).collect())
            .unwrap_or_default()
    }

    /// Closes the broker. Subscriptions end once their queue is drained
    /// and further publishes fail with [`BrokerError::Closed`].
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.notify.notify_waiters();
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    fn queues(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Entry>>> {
        self.shared
            .queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn push_back(&self, queue: &str, payload: Vec<u8>) {
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        self.queues()
            .entry(queue.to_string())
            .or_default()
            .push_back(Entry { id, payload });
        self.shared.notify.notify_waiters();
    }

    fn push_front(&self, queue: &str, entry: Entry) {
        self.queues()
            .entry(queue.to_string())
            .or_default()
            .push_front(entry);
        self.shared.notify.notify_waiters();
    }

    fn pop_front(&self, queue: &str) -> Option<Entry> {
        self.queues().get_mut(queue).and_then(VecDeque::pop_front)
    }
}

impl Publisher for MemoryBroker {
    async fn publish(
        &self,
        queue: &str,
        payload: &[u8],
        _options: PublishOptions,
    ) -> Result<(), BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::Closed);
        }
        self.push_back(queue, payload.to_vec());
        Ok(())
    }
}

impl Broker for MemoryBroker {
    type Subscription = MemorySubscription;

    async fn subscribe(&self, queue: &str) -> Result<MemorySubscription, BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::Closed);
        }
        Ok(MemorySubscription {
            broker: self.clone(),
            queue: queue.to_string(),
        })
    }
}

/// Subscription to one in-memory queue.
#[derive(Debug)]
pub struct MemorySubscription {
    broker: MemoryBroker,
    queue: String,
}

impl Subscription for MemorySubscription {
    type Delivery = MemoryDelivery;

    async fn next(&mut self) -> Option<MemoryDelivery> {
        loop {
            // Register interest before checking so a publish in between is not missed.
            let notified = self.broker.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(entry) = self.broker.pop_front(&self.queue) {
                return Some(MemoryDelivery {
                    broker: self.broker.clone(),
                    queue: self.queue.clone(),
                    id: entry.id.to_string(),
                    entry,
                });
            }

            if self.broker.is_closed() {
                return None;
            }

            notified.await;
        }
    }
}

/// A message taken from an in-memory queue.
#[derive(Debug)]
pub struct MemoryDelivery {
    broker: MemoryBroker,
    queue: String,
    id: String,
    entry: Entry,
}

impl Delivery for MemoryDelivery {
    fn id(&self) -> &str {
        &self.id
    }

    fn payload(&self) -> Result<&[u8], &DeliveryError> {
        Ok(&self.entry.payload)
    }

    async fn settle(self, disposition: Disposition) -> Result<(), BrokerError> {
        match disposition {
            Disposition::Accept | Disposition::Reject => {}
            Disposition::Release => self.broker.push_front(&self.queue, self.entry),
        }
        Ok(())
    }
}
