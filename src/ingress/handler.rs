//! Turning inbound requests into queued messages.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;
use url::form_urlencoded;

use crate::broker::{PublishOptions, Publisher};
use crate::message::QueuedRequest;

use super::IngressError;

/// Publishes captured requests to the work queue.
#[derive(Debug)]
pub struct Ingress<P> {
    publisher: P,
    queue: String,
    publish_timeout: Duration,
}

impl<P> Ingress<P> {
    /// Default deadline for the broker to confirm a publish (10 seconds).
    pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates an adapter publishing to `queue`.
    #[must_use]
    pub fn new(publisher: P, queue: impl Into<String>) -> Self {
        Self {
            publisher,
            queue: queue.into(),
            publish_timeout: Self::DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    /// Sets the publish deadline.
    #[must_use]
    pub const fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Publish deadline.
    #[must_use]
    pub const fn publish_timeout(&self) -> Duration {
        self.publish_timeout
    }

    /// Name of the work queue.
    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }
}

impl<P: Publisher> Ingress<P> {
    /// Captures one request and publishes it.
    ///
    /// When a query parameter repeats, the first value wins. A body that is
    /// not valid UTF-8 is carried with invalid sequences replaced.
    ///
    /// # Errors
    ///
    /// Returns [`IngressError::Encode`] if the message cannot be serialized
    /// and [`IngressError::Publish`] if the single publish attempt fails.
    pub async fn enqueue(
        &self,
        method: &str,
        path: &str,
        query: Option<&str>,
        body: &[u8],
    ) -> Result<(), IngressError> {
        let message = QueuedRequest {
            path: path.to_string(),
            method: method.to_string(),
            body: String::from_utf8_lossy(body).into_owned(),
            params: parse_query(query),
        };
        let payload = message.encode()?;

        debug!("Enqueueing {method} {path} on {}", self.queue);
        self.publisher
            .publish(
                &self.queue,
                &payload,
                PublishOptions::persistent(self.publish_timeout),
            )
            .await
            .map_err(IngressError::Publish)
    }
}

fn parse_query(query: Option<&str>) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    let Some(query) = query else {
        return params;
    };

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        params
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    params
}
