//! Canonical queued message.
//!
//! Every inbound HTTP call is captured as a [`QueuedRequest`] and travels
//! through the queue as a JSON object:
//!
//! ```json
//! {"path": "/events", "method": "POST", "body": "{\"title\":\"x\"}", "params": {"cal": "team"}}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A request waiting on the queue to be replayed against the calendar API.
///
/// Once published the message is never rewritten; the consumer only ever
/// forwards the original bytes to the error queue.
///
/// Decoding is lenient about shape: a missing or `null` field takes its
/// empty value, as producers that serialize zero values that way expect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueuedRequest {
    /// Destination path, appended to the calendar root URL.
    #[serde(deserialize_with = "null_as_empty")]
    pub path: String,
    /// HTTP verb to replay.
    #[serde(deserialize_with = "null_as_empty")]
    pub method: String,
    /// Raw request payload, opaque to the bridge.
    #[serde(deserialize_with = "null_as_empty")]
    pub body: String,
    /// Query parameters.
    #[serde(deserialize_with = "null_as_empty")]
    pub params: BTreeMap<String, String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Failure to encode or decode a [`QueuedRequest`].
#[derive(Debug, Error)]
pub enum MessageError {
    /// Payload could not be serialized.
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// Payload is not a valid message.
    #[error("Failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}

impl QueuedRequest {
    /// Creates a message with no query parameters.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            body: body.into(),
            params: BTreeMap::new(),
        }
    }

    /// Adds a query parameter, replacing any previous value for `key`.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Serializes the message to its wire format.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, MessageError> {
        serde_json::to_vec(self).map_err(MessageError::Encode)
    }

    /// Parses a message from its wire format.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Decode`] if the payload is not a JSON object
    /// or a field holds a value of the wrong type.
    pub fn decode(payload: &[u8]) -> Result<Self, MessageError> {
        serde_json::from_slice(payload).map_err(MessageError::Decode)
    }
}
