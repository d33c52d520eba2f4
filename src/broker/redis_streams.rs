//! Redis Streams transport.
//!
//! Each queue is a stream read through a consumer group:
//! - publish: `XADD` with `payload` and `persistent` fields
//! - receive: `XREADGROUP COUNT 1`, first draining this consumer's own
//!   pending entries (left over from a previous run), then new entries
//! - accept / reject: `XACK` + `XDEL`
//! - release: re-`XADD` the payload, then `XACK` + `XDEL` the original;
//!   an entry without a payload field is only removed
//!
//! Publishing and settling share one connection between clones. Each
//! subscription reads over a connection of its own, since a blocking
//! `XREADGROUP` holds up every command queued behind it. Both are
//! re-established lazily after an I/O failure, trying the configured
//! addresses in order.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client, RedisError, RedisResult};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::{
    Broker, BrokerError, Delivery, DeliveryError, Disposition, PublishOptions, Publisher,
    Subscription,
};

/// Stream field holding the raw message.
const PAYLOAD_FIELD: &str = "payload";

/// Stream field holding the durability marker.
const PERSISTENT_FIELD: &str = "persistent";

/// Deadline for establishing a connection to one address.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a single `XREADGROUP` blocks waiting for new entries.
const BLOCK_MILLIS: usize = 5_000;

/// Pause before reading again after a failed read.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// A lazily (re)connected link to the first reachable address.
#[derive(Debug)]
struct ConnectionSlot {
    addresses: Arc<[Url]>,
    conn: Mutex<Option<MultiplexedConnection>>,
}

impl ConnectionSlot {
    fn new(addresses: Arc<[Url]>) -> Self {
        Self {
            addresses,
            conn: Mutex::new(None),
        }
    }

    /// Returns the live connection, connecting first if needed.
    async fn get(&self) -> Result<MultiplexedConnection, BrokerError> {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = connect_any(&self.addresses).await?;
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Drops the connection if `err` means it is no longer usable.
    async fn discard_if_broken(&self, err: &RedisError) {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            warn!("Dropping broken Redis connection: {err}");
            *self.conn.lock().await = None;
        }
    }

    /// Runs `op` on the connection, discarding it on I/O failure.
    async fn run<T, F, Fut>(&self, op: F) -> Result<T, BrokerError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut + Send,
        Fut: Future<Output = RedisResult<T>> + Send,
    {
        let conn = self.get().await?;
        match op(conn).await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.discard_if_broken(&e).await;
                Err(e.into())
            }
        }
    }
}

#[derive(Debug)]
struct Shared {
    group: String,
    consumer: String,
    conn: ConnectionSlot,
}

/// Broker backed by Redis Streams.
///
/// Cloning is cheap; clones share one connection for publishing and
/// settling. Subscriptions read over their own.
#[derive(Debug, Clone)]
pub struct RedisBroker {
    shared: Arc<Shared>,
}

impl RedisBroker {
    /// Connects to the first reachable address.
    ///
    /// `group` and `consumer` name the consumer group and this process's
    /// member of it.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Unavailable`] if no address accepts a connection.
    pub async fn connect(
        addresses: Vec<Url>,
        group: impl Into<String>,
        consumer: impl Into<String>,
    ) -> Result<Self, BrokerError> {
        let broker = Self {
            shared: Arc::new(Shared {
                group: group.into(),
                consumer: consumer.into(),
                conn: ConnectionSlot::new(addresses.into()),
            }),
        };
        broker.shared.conn.get().await?;
        Ok(broker)
    }

    /// Consumer group name.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.shared.group
    }

    /// Name of this consumer within the group.
    #[must_use]
    pub fn consumer(&self) -> &str {
        &self.shared.consumer
    }

    /// Runs `op` on the shared connection, discarding it on I/O failure.
    async fn with_connection<T, F, Fut>(&self, op: F) -> Result<T, BrokerError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut + Send,
        Fut: Future<Output = RedisResult<T>> + Send,
    {
        self.shared.conn.run(op).await
    }

    /// Creates the consumer group for `queue` if it does not exist yet.
    ///
    /// The group starts at the beginning of the stream so messages published
    /// before the first consumer started are not lost.
    async fn ensure_group(&self, queue: &str) -> Result<(), BrokerError> {
        let group = self.shared.group.clone();
        let result = self
            .with_connection(|mut conn| async move {
                redis::cmd("XGROUP")
                    .arg("CREATE")
                    .arg(queue)
                    .arg(&group)
                    .arg("0")
                    .arg("MKSTREAM")
                    .query_async::<()>(&mut conn)
                    .await
            })
            .await;

        match result {
            Ok(()) => {
                info!(stream = %queue, group = %self.shared.group, "Created consumer group");
                Ok(())
            }
            Err(BrokerError::Redis(e)) if e.to_string().contains("BUSYGROUP") => {
                debug!(stream = %queue, group = %self.shared.group, "Consumer group already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn remove(&self, queue: &str, id: &str) -> Result<(), BrokerError> {
        let group = self.shared.group.clone();
        self.with_connection(|mut conn| async move {
            redis::pipe()
                .atomic()
                .xack(queue, &group, &[id])
                .ignore()
                .xdel(queue, &[id])
                .ignore()
                .query_async::<()>(&mut conn)
                .await
        })
        .await
    }

    async fn requeue(&self, queue: &str, id: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let group = self.shared.group.clone();
        self.with_connection(|mut conn| async move {
            redis::pipe()
                .atomic()
                .xadd(queue, "*", &stream_fields(payload, true)[..])
                .ignore()
                .xack(queue, &group, &[id])
                .ignore()
                .xdel(queue, &[id])
                .ignore()
                .query_async::<()>(&mut conn)
                .await
        })
        .await
    }
}

impl Publisher for RedisBroker {
    async fn publish(
        &self,
        queue: &str,
        payload: &[u8],
        options: PublishOptions,
    ) -> Result<(), BrokerError> {
        let fields = stream_fields(payload, options.persistent);
        let publish = self.with_connection(|mut conn| async move {
            conn.xadd(queue, "*", &fields[..]).await
        });

        let id: String = tokio::time::timeout(options.timeout, publish)
            .await
            .map_err(|_| BrokerError::Timeout(options.timeout))??;

        debug!(stream = %queue, entry = %id, "Published message");
        Ok(())
    }
}

impl Broker for RedisBroker {
    type Subscription = RedisSubscription;

    async fn subscribe(&self, queue: &str) -> Result<RedisSubscription, BrokerError> {
        self.ensure_group(queue).await?;
        Ok(RedisSubscription::new(self.clone(), queue))
    }
}

/// Subscription to one stream through the broker's consumer group.
#[derive(Debug)]
pub struct RedisSubscription {
    broker: RedisBroker,
    /// Dedicated to blocking reads; never shared with publishers.
    reader: ConnectionSlot,
    queue: String,
    /// Position within this consumer's pending entries; `None` once drained.
    backlog_cursor: Option<String>,
    group_ready: bool,
    failed: bool,
}

impl RedisSubscription {
    fn new(broker: RedisBroker, queue: &str) -> Self {
        let reader = ConnectionSlot::new(Arc::clone(&broker.shared.conn.addresses));
        Self {
            broker,
            reader,
            queue: queue.to_string(),
            backlog_cursor: Some("0".to_string()),
            group_ready: true,
            failed: false,
        }
    }

    fn failure(&self, reason: String) -> RedisDelivery {
        RedisDelivery {
            broker: self.broker.clone(),
            queue: self.queue.clone(),
            id: String::new(),
            payload: Err(DeliveryError::Receive(reason)),
        }
    }

    async fn read_one(&mut self) -> Result<Option<StreamId>, BrokerError> {
        if !self.group_ready {
            self.broker.ensure_group(&self.queue).await?;
            self.group_ready = true;
        }

        let cursor = self.backlog_cursor.clone().unwrap_or_else(|| ">".to_string());
        let mut options = StreamReadOptions::default()
            .group(&self.broker.shared.group, &self.broker.shared.consumer)
            .count(1);
        if self.backlog_cursor.is_none() {
            options = options.block(BLOCK_MILLIS);
        }

        let queue = self.queue.clone();
        let reply: Option<StreamReadReply> = self
            .reader
            .run(|mut conn| async move {
                conn.xread_options(&[&queue], &[&cursor], &options).await
            })
            .await?;

        let entry = reply
            .and_then(|r| r.keys.into_iter().next())
            .and_then(|k| k.ids.into_iter().next());
        Ok(entry)
    }
}

impl Subscription for RedisSubscription {
    type Delivery = RedisDelivery;

    async fn next(&mut self) -> Option<RedisDelivery> {
        loop {
            if self.failed {
                tokio::time::sleep(RECONNECT_DELAY).await;
                self.failed = false;
            }

            match self.read_one().await {
                Ok(Some(entry)) => {
                    if self.backlog_cursor.is_some() {
                        self.backlog_cursor = Some(entry.id.clone());
                    }
                    return Some(RedisDelivery::from_entry(
                        self.broker.clone(),
                        &self.queue,
                        &entry,
                    ));
                }
                Ok(None) => {
                    if self.backlog_cursor.take().is_some() {
                        debug!(stream = %self.queue, "Pending entries drained, reading new entries");
                    }
                }
                Err(e) => {
                    self.failed = true;
                    self.group_ready = false;
                    return Some(self.failure(e.to_string()));
                }
            }
        }
    }
}

/// A stream entry handed to the consumer.
#[derive(Debug)]
pub struct RedisDelivery {
    broker: RedisBroker,
    queue: String,
    id: String,
    payload: Result<Vec<u8>, DeliveryError>,
}

impl RedisDelivery {
    fn from_entry(broker: RedisBroker, queue: &str, entry: &StreamId) -> Self {
        let payload = entry
            .get::<Vec<u8>>(PAYLOAD_FIELD)
            .ok_or_else(|| DeliveryError::MalformedFrame {
                id: entry.id.clone(),
                reason: format!("missing '{PAYLOAD_FIELD}' field"),
            });

        Self {
            broker,
            queue: queue.to_string(),
            id: entry.id.clone(),
            payload,
        }
    }
}

impl Delivery for RedisDelivery {
    fn id(&self) -> &str {
        &self.id
    }

    fn payload(&self) -> Result<&[u8], &DeliveryError> {
        self.payload.as_deref()
    }

    async fn settle(self, disposition: Disposition) -> Result<(), BrokerError> {
        if self.id.is_empty() {
            // Nothing was read, so there is nothing to settle.
            return Ok(());
        }

        match (disposition, &self.payload) {
            (Disposition::Accept | Disposition::Reject, _) => {
                self.broker.remove(&self.queue, &self.id).await
            }
            (Disposition::Release, Ok(payload)) => {
                self.broker.requeue(&self.queue, &self.id, payload).await
            }
            (Disposition::Release, Err(e)) => {
                warn!(stream = %self.queue, entry = %self.id, "Dropping unreadable entry: {e}");
                self.broker.remove(&self.queue, &self.id).await
            }
        }
    }
}

fn stream_fields(payload: &[u8], persistent: bool) -> [(&'static str, Vec<u8>); 2] {
    let marker: &[u8] = if persistent { b"true" } else { b"false" };
    [
        (PAYLOAD_FIELD, payload.to_vec()),
        (PERSISTENT_FIELD, marker.to_vec()),
    ]
}

async fn connect_any(addresses: &[Url]) -> Result<MultiplexedConnection, BrokerError> {
    let mut last = String::from("no broker addresses configured");

    for address in addresses {
        match connect_one(address).await {
            Ok(conn) => {
                info!("Connected to broker {address}");
                return Ok(conn);
            }
            Err(e) => {
                warn!("Broker {address} unavailable: {e}");
                last = e;
            }
        }
    }

    Err(BrokerError::Unavailable {
        attempts: addresses.len(),
        last,
    })
}

async fn connect_one(address: &Url) -> Result<MultiplexedConnection, String> {
    let client = Client::open(address.as_str()).map_err(|e| e.to_string())?;
    tokio::time::timeout(CONNECT_TIMEOUT, client.get_multiplexed_async_connection())
        .await
        .map_err(|_| format!("connect timed out after {CONNECT_TIMEOUT:?}"))?
        .map_err(|e| e.to_string())
}
