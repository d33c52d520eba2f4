//! Application execution logic.
//!
//! This module wires the broker, the ingress server and the consumer loop
//! together and runs them until a shutdown signal arrives.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinError;

use calendar_queue::broker::{Broker, BrokerError, MemoryBroker, RedisBroker};
use calendar_queue::config::{BrokerEndpoints, ValidatedConfig, defaults};
use calendar_queue::consumer::{Consumer, Pacing};
use calendar_queue::downstream::{CalendarApi, HttpError, ReqwestClient};
use calendar_queue::ingress::{self, Ingress};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// No broker could be reached.
    #[error("Failed to connect to broker: {0}")]
    Broker(#[source] BrokerError),

    /// Subscribing to the work queue failed.
    #[error("Failed to subscribe to '{queue}': {source}")]
    Subscribe {
        /// Work queue name
        queue: String,
        /// Underlying broker error
        #[source]
        source: BrokerError,
    },

    /// The ingress listener could not be bound.
    #[error("Failed to listen on {addr}: {source}")]
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client for the calendar API could not be built.
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[source] HttpError),

    /// The ingress server stopped with an error.
    #[error("Ingress server failed: {0}")]
    Server(#[source] std::io::Error),

    /// The ingress server task panicked or was cancelled.
    #[error("Ingress server task failed: {0}")]
    ServerTask(#[source] JoinError),

    /// The work queue subscription ended without a shutdown request.
    #[error("Queue subscription terminated unexpectedly")]
    SubscriptionEnded,
}

/// Runtime options extracted from validated config.
struct RuntimeOptions {
    queue: String,
    error_queue: String,
    pacing: Pacing,
}

/// Bound sockets the process serves HTTP on.
struct Listeners {
    ingress: TcpListener,
    health: Option<TcpListener>,
}

impl From<&ValidatedConfig> for RuntimeOptions {
    fn from(config: &ValidatedConfig) -> Self {
        Self {
            queue: config.queue.clone(),
            error_queue: config.error_queue.clone(),
            pacing: config.pacing.clone(),
        }
    }
}

/// One-shot shutdown flag shared by the server and the consumer.
#[derive(Debug)]
struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    fn new() -> Arc<Self> {
        let (tx, _rx) = watch::channel(false);
        Arc::new(Self { tx })
    }

    fn trigger(&self) {
        self.tx.send_replace(true);
    }

    fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Completes once [`trigger`](Self::trigger) has been called.
    fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            // The sender lives as long as `self`; an error means it is gone, so stop too.
            let _ = rx.wait_for(|stopped| *stopped).await;
        }
    }
}

/// Executes the application until a shutdown signal (Ctrl+C / SIGTERM).
///
/// This function:
/// 1. Builds the calendar API client
/// 2. Connects to the configured broker
/// 3. Binds the ingress listener and, if enabled, the health listener
/// 4. Runs the servers and the consumer until shutdown
///
/// # Errors
///
/// Returns an error if:
/// - No broker can be reached or the work queue cannot be subscribed to
/// - The listen address cannot be bound
/// - The ingress server fails
/// - The queue subscription ends on its own
///
/// # Coverage Note
///
/// This function is excluded from coverage because it requires a real
/// signal handler and, for Redis, a reachable server.
#[cfg(not(tarpaulin_include))]
pub async fn execute(config: ValidatedConfig) -> Result<(), RunError> {
    let options = RuntimeOptions::from(&config);
    let calendar = create_calendar(&config)?;

    let listeners = Listeners {
        ingress: bind(config.listen).await?,
        health: match config.health_listen {
            Some(addr) => Some(bind(addr).await?),
            None => None,
        },
    };

    let shutdown = Shutdown::new();
    tokio::spawn({
        let shutdown = Arc::clone(&shutdown);
        async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, stopping...");
            shutdown.trigger();
        }
    });

    match config.brokers {
        BrokerEndpoints::Memory => {
            tracing::warn!("Using in-process queues; queued requests are lost on exit");
            serve(MemoryBroker::new(), listeners, calendar, options, &shutdown).await
        }
        BrokerEndpoints::Redis(addresses) => {
            let broker =
                RedisBroker::connect(addresses, config.consumer_group, config.consumer_name)
                    .await
                    .map_err(RunError::Broker)?;
            serve(broker, listeners, calendar, options, &shutdown).await
        }
    }
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, RunError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| RunError::Bind { addr, source })
}

/// Creates the calendar API client from configuration.
fn create_calendar(config: &ValidatedConfig) -> Result<CalendarApi<ReqwestClient>, RunError> {
    let client =
        ReqwestClient::with_timeout(defaults::downstream_timeout()).map_err(RunError::HttpClient)?;
    Ok(CalendarApi::new(client, config.calendar_url.clone()))
}

/// Runs the ingress server and the consumer on `broker` until `shutdown`
/// is triggered or one of them stops on its own.
///
/// The consumer finishes the delivery it is working on (wait included)
/// before returning. The health server, when present, stops with the rest
/// but its failure alone never stops the process.
async fn serve<B: Broker>(
    broker: B,
    listeners: Listeners,
    calendar: CalendarApi<ReqwestClient>,
    options: RuntimeOptions,
    shutdown: &Arc<Shutdown>,
) -> Result<(), RunError> {
    let subscription =
        broker
            .subscribe(&options.queue)
            .await
            .map_err(|source| RunError::Subscribe {
                queue: options.queue.clone(),
                source,
            })?;

    let Listeners {
        ingress: listener,
        health,
    } = listeners;

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Accepting requests on {addr} for queue '{}'", options.queue);
    }

    let health_server = health.map(|listener| {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Serving health checks on {addr}");
        }
        let stop = shutdown.wait();
        tokio::spawn(async move {
            axum::serve(listener, ingress::health_router())
                .with_graceful_shutdown(stop)
                .await
        })
    });

    let app = ingress::router(Arc::new(Ingress::new(broker.clone(), options.queue)));
    let stop_server = shutdown.wait();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(stop_server)
            .await
    });

    let mut consumer = Consumer::new(calendar, broker, options.error_queue, options.pacing);
    let consuming = consumer.run(subscription, shutdown.wait());
    tokio::pin!(consuming);

    let (server_result, subscription_ended) = tokio::select! {
        () = &mut consuming => {
            let ended_early = !shutdown.is_triggered();
            if ended_early {
                tracing::error!("Queue subscription ended");
            }
            shutdown.trigger();
            (server.await, ended_early)
        }
        result = &mut server => {
            if !shutdown.is_triggered() {
                tracing::error!("Ingress server stopped, stopping consumer");
                shutdown.trigger();
            }
            consuming.await;
            (result, false)
        }
    };

    if let Some(health_server) = health_server {
        match health_server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Health server failed: {e}"),
            Err(e) => tracing::warn!("Health server task failed: {e}"),
        }
    }

    if subscription_ended {
        return Err(RunError::SubscriptionEnded);
    }

    match server_result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(RunError::Server(e)),
        Err(e) => Err(RunError::ServerTask(e)),
    }
}

/// Returns a future that completes when a shutdown signal is received.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
