//! HTTP ingress adapter.
//!
//! Every inbound request, whatever its method or path, becomes a
//! [`QueuedRequest`](crate::message::QueuedRequest) published to the work
//! queue. The caller gets 200 once the broker confirms the publish and 500
//! with a diagnostic text body otherwise. Nothing is retried here; retrying a
//! failed publish is up to the caller.
//!
//! [`health_router`] serves health probes on a separate listener.

mod error;
mod handler;
mod health;


use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};

pub use error::IngressError;
pub use handler::Ingress;
pub use health::{HealthResponse, health_router};

use crate::broker::Publisher;

/// Largest request body accepted (16 MiB).
pub const BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Builds a router that enqueues every request it receives.
pub fn router<P>(ingress: Arc<Ingress<P>>) -> Router
where
    P: Publisher + 'static,
{
    Router::new()
        .fallback(enqueue_request::<P>)
        .with_state(ingress)
}

async fn enqueue_request<P>(
    State(ingress): State<Arc<Ingress<P>>>,
    method: Method,
    uri: Uri,
    body: Body,
) -> Result<StatusCode, IngressError>
where
    P: Publisher + 'static,
{
    let body = axum::body::to_bytes(body, BODY_LIMIT)
        .await
        .map_err(IngressError::ReadBody)?;

    ingress
        .enqueue(method.as_str(), uri.path(), uri.query(), &body)
        .await?;

    Ok(StatusCode::OK)
}
