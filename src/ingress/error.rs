//! Ingress error type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::broker::BrokerError;
use crate::message::MessageError;

/// Reasons an inbound request could not be enqueued.
///
/// All variants map to `500 Internal Server Error` with the message as a
/// plain text body.
#[derive(Debug, Error)]
pub enum IngressError {
    /// The request body could not be read.
    #[error("Failed to read request body: {0}")]
    ReadBody(#[source] axum::Error),

    /// The request could not be turned into a queued message.
    #[error(transparent)]
    Encode(#[from] MessageError),

    /// The broker did not accept the message.
    #[error("Failed to publish message: {0}")]
    Publish(#[source] BrokerError),
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        tracing::error!("{self}");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
