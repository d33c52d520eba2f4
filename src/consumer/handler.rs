//! Per-delivery processing and the serial consume loop.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::broker::{Delivery, PublishOptions, Publisher, Subscription};
use crate::downstream::{CalendarApi, HttpClient};
use crate::message::QueuedRequest;
use crate::time::{Clock, MonotonicClock, Sleeper, TokioSleeper};

use super::{ConsumerState, Outcome, Pacing, Plan, Wait};

/// Result of handling one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handled {
    /// What happened.
    pub outcome: Outcome,
    /// What was done about it.
    pub plan: Plan,
}

/// Replays deliveries against the calendar API one at a time.
///
/// # Type Parameters
///
/// - `H`: HTTP client used to reach the calendar API
/// - `P`: publisher for the error queue
/// - `S`: sleeper for waits (defaults to [`TokioSleeper`])
/// - `C`: clock measuring processing time (defaults to [`MonotonicClock`])
#[derive(Debug)]
pub struct Consumer<H, P, S = TokioSleeper, C = MonotonicClock> {
    calendar: CalendarApi<H>,
    publisher: P,
    error_queue: String,
    error_publish_timeout: Duration,
    pacing: Pacing,
    state: ConsumerState,
    sleeper: S,
    clock: C,
}

impl<H, P> Consumer<H, P> {
    /// Default deadline for forwarding a message to the error queue (15 seconds).
    pub const DEFAULT_ERROR_PUBLISH_TIMEOUT: Duration = Duration::from_secs(15);

    /// Creates a consumer with fresh counters.
    #[must_use]
    pub fn new(
        calendar: CalendarApi<H>,
        publisher: P,
        error_queue: impl Into<String>,
        pacing: Pacing,
    ) -> Self {
        Self {
            calendar,
            publisher,
            error_queue: error_queue.into(),
            error_publish_timeout: Self::DEFAULT_ERROR_PUBLISH_TIMEOUT,
            pacing,
            state: ConsumerState::new(),
            sleeper: TokioSleeper,
            clock: MonotonicClock,
        }
    }
}

impl<H, P, S, C> Consumer<H, P, S, C> {
    /// Sets a custom sleeper.
    #[must_use]
    pub fn with_sleeper<S2>(self, sleeper: S2) -> Consumer<H, P, S2, C> {
        Consumer {
            calendar: self.calendar,
            publisher: self.publisher,
            error_queue: self.error_queue,
            error_publish_timeout: self.error_publish_timeout,
            pacing: self.pacing,
            state: self.state,
            sleeper,
            clock: self.clock,
        }
    }

    /// Sets a custom clock.
    #[must_use]
    pub fn with_clock<C2>(self, clock: C2) -> Consumer<H, P, S, C2> {
        Consumer {
            calendar: self.calendar,
            publisher: self.publisher,
            error_queue: self.error_queue,
            error_publish_timeout: self.error_publish_timeout,
            pacing: self.pacing,
            state: self.state,
            sleeper: self.sleeper,
            clock,
        }
    }

    /// Sets the deadline for forwarding a message to the error queue.
    #[must_use]
    pub const fn with_error_publish_timeout(mut self, timeout: Duration) -> Self {
        self.error_publish_timeout = timeout;
        self
    }

    /// Current counters.
    #[must_use]
    pub const fn state(&self) -> &ConsumerState {
        &self.state
    }
}

impl<H, P, S, C> Consumer<H, P, S, C>
where
    H: HttpClient,
    P: Publisher,
    S: Sleeper,
    C: Clock,
{
    /// Consumes `subscription` until it ends or `shutdown` completes.
    ///
    /// `shutdown` is only observed while waiting for the next delivery; a
    /// delivery that is already being handled, wait included, is finished first.
    pub async fn run<Sub, F>(&mut self, mut subscription: Sub, shutdown: F)
    where
        Sub: Subscription,
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        loop {
            let next = tokio::select! {
                biased;

                () = &mut shutdown => {
                    info!("Consumer stopping");
                    return;
                }

                delivery = subscription.next() => delivery,
            };

            let Some(delivery) = next else {
                warn!("Subscription ended, consumer stopping");
                return;
            };

            self.handle(delivery).await;
        }
    }

    /// Handles one delivery: classify, settle, escalate, then wait.
    pub async fn handle<D: Delivery>(&mut self, delivery: D) -> Handled {
        let id = delivery.id().to_string();

        let (outcome, started) = self.classify(&id, &delivery).await;
        let plan = self.pacing.plan(&outcome, &mut self.state);
        log_outcome(&id, &outcome, &self.state);

        // The delivery is consumed by settling; keep the raw bytes for the error queue.
        let escalation = if plan.escalate {
            delivery.payload().ok().map(<[u8]>::to_vec)
        } else {
            None
        };

        match delivery.settle(plan.disposition).await {
            Ok(()) => debug!("{id}: {}", plan.disposition),
            Err(e) => error!("{id}: Failed to settle message ({}): {e}", plan.disposition),
        }

        if let Some(payload) = escalation {
            self.escalate(&id, &payload).await;
        }

        self.hold(&id, plan.wait, started).await;

        Handled { outcome, plan }
    }

    /// Works out what happened to `delivery`, calling the calendar API if
    /// the message is usable.
    ///
    /// Returns the instant just before the calendar call, if one was made.
    async fn classify<D: Delivery>(&self, id: &str, delivery: &D) -> (Outcome, Option<Instant>) {
        let payload = match delivery.payload() {
            Ok(payload) => payload,
            Err(e) => return (Outcome::DeliveryFailed(e.clone()), None),
        };
        debug!("{id}: Got message: {}", String::from_utf8_lossy(payload));

        let message = match QueuedRequest::decode(payload) {
            Ok(message) => message,
            Err(e) => return (Outcome::Undecodable(e.to_string()), None),
        };

        let request = match self.calendar.build_request(&message) {
            Ok(request) => request,
            Err(e) => return (Outcome::InvalidRequest(e.to_string()), None),
        };

        info!(
            "{id}: Sending {} {} to calendar API",
            message.method, message.path
        );
        let started = self.clock.now();

        let outcome = match self.calendar.send(request).await {
            Ok(response) => {
                let outcome = Outcome::from_response(&response);
                debug!(
                    "{id}: Response from calendar API ({}): '{}'",
                    response.status,
                    response.body_text()
                );
                outcome
            }
            Err(e) if e.is_unreachable() => Outcome::Unreachable(e.to_string()),
            Err(e) => Outcome::InvalidRequest(e.to_string()),
        };

        (outcome, Some(started))
    }

    /// Forwards the raw payload to the error queue. Failures are only logged.
    async fn escalate(&self, id: &str, payload: &[u8]) {
        debug!("{id}: Sending message to {}", self.error_queue);
        let options = PublishOptions::transient(self.error_publish_timeout);

        if let Err(e) = self
            .publisher
            .publish(&self.error_queue, payload, options)
            .await
        {
            error!("{id}: Failed to push message to {}: {e}", self.error_queue);
        }
    }

    /// Blocks for whatever `wait` still requires.
    async fn hold(&self, id: &str, wait: Wait, started: Option<Instant>) {
        match wait {
            Wait::Immediate => {}
            Wait::Cooldown(duration) => {
                info!("{id}: Calendar API likely down, sleeping for {duration:?}");
                self.sleeper.sleep(duration).await;
            }
            Wait::Paced(duration) => {
                let elapsed =
                    started.map_or(Duration::ZERO, |s| self.clock.now().saturating_duration_since(s));
                let remaining = duration.saturating_sub(elapsed);

                if remaining.is_zero() {
                    debug!("{id}: Took longer than wait time ({duration:?}), moving on");
                } else {
                    debug!("{id}: Sleeping for {remaining:?}");
                    self.sleeper.sleep(remaining).await;
                }
            }
        }
    }
}

fn log_outcome(id: &str, outcome: &Outcome, state: &ConsumerState) {
    match outcome {
        Outcome::DeliveryFailed(e) => error!("{id}: Failed getting message from queue: {e}"),
        Outcome::Undecodable(reason) => error!("{id}: Could not decode message: {reason}"),
        Outcome::InvalidRequest(reason) => {
            error!("{id}: Could not build calendar request: {reason}");
        }
        Outcome::Unreachable(reason) => {
            error!("{id}: Failed to perform request to calendar API: {reason}");
        }
        Outcome::Succeeded { status } => info!("{id}: Success ({status})"),
        Outcome::RateLimited { status } => warn!(
            "{id}: Rate limit exceeded ({status}), {} failures so far",
            state.consecutive_failures()
        ),
        Outcome::Failed { status } => error!("{id}: Calendar API rejected request ({status})"),
    }
}
