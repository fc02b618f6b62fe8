use std::future::Future;
use std::panic;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context as TaskContext;
use std::task::Poll;
use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use timebox::BufferPool;
use timebox::Context;
use timebox::Shadow;
use timebox::SinkError;
use tokio::task::JoinError;
use tokio::time::Instant;
use tokio::time::sleep_until;
use tower::BoxError;
use tower::Service;

use crate::config::Config;
use crate::deadline::resolve_timeout;
use crate::deadline::set_deadlines;
use crate::error::TimeoutError;

#[derive(Clone, Debug)]
struct TimeoutServiceMetrics {
    timeouts: Counter<u64>,
    panics: Counter<u64>,
}

/// Runs the inner handler with a time limit.
///
/// See [`TimeoutLayer`](crate::TimeoutLayer) for the behaviour.
#[derive(Debug)]
pub struct TimeoutService<S> {
    inner: S,
    dt: Duration,
    config: Config,
    pool: Arc<BufferPool>,
    instruments: TimeoutServiceMetrics,
}

impl<S: Clone> Clone for TimeoutService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            dt: self.dt,
            config: self.config.clone(),
            pool: Arc::clone(&self.pool),
            instruments: self.instruments.clone(),
        }
    }
}

enum Outcome {
    Finished(Result<Result<(), BoxError>, JoinError>),
    Expired(SinkError),
}

impl<S> Service<Context> for TimeoutService<S>
where
    S: Service<Context, Response = (), Error = BoxError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = ();
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, c: Context) -> Self::Future {
        // The ready instance is the one which must serve this request.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        let dt = self.dt;
        let config = self.config.clone();
        let pool = Arc::clone(&self.pool);
        let instruments = self.instruments.clone();

        Box::pin(run(inner, c, dt, config, pool, instruments))
    }
}

async fn run<S>(
    mut inner: S,
    mut c: Context,
    dt: Duration,
    config: Config,
    pool: Arc<BufferPool>,
    instruments: TimeoutServiceMetrics,
) -> Result<(), BoxError>
where
    S: Service<Context, Response = (), Error = BoxError> + Send + 'static,
    S::Future: Send + 'static,
{
    set_deadlines(&mut c);
    let dt = resolve_timeout(c.route(), dt);
    if dt.is_zero() {
        return inner.call(c).await;
    }

    // A timeout past the clock's range never expires.
    let deadline = Instant::now().checked_add(dt);
    let parent = c.cancellation().clone();
    let token = parent.child_token();
    // Releases the handler if this future is dropped or returns early.
    let _cancel = token.clone().drop_guard();

    let shadow = Shadow::new(pool.get(), c.writer().pusher());
    let cp = c.clone_with(shadow.writer(), token.clone(), deadline);

    // The task owns `cp`; tokio drops it before the join handle resolves,
    // whether the handler returns or panics.
    let mut task = tokio::spawn(async move { inner.call(cp).await });

    let outcome = tokio::select! {
        biased;
        joined = &mut task => Outcome::Finished(joined),
        _ = expiry(deadline) => Outcome::Expired(SinkError::HandlerTimeout),
        _ = parent.cancelled() => Outcome::Expired(SinkError::Canceled),
    };

    match outcome {
        Outcome::Finished(Ok(result)) => {
            match shadow.commit(c.writer()) {
                Ok(n) => tracing::trace!(bytes = n, "handler response committed"),
                Err(err) => tracing::trace!(%err, "handler response not fully written"),
            }
            result
        }
        Outcome::Finished(Err(err)) if err.is_panic() => {
            instruments.panics.add(1, &route_attributes(&c));
            panic::resume_unwind(err.into_panic())
        }
        Outcome::Finished(Err(_)) => Err(Box::new(TimeoutError::Aborted)),
        Outcome::Expired(err) => {
            token.cancel();
            instruments.timeouts.add(1, &route_attributes(&c));
            tracing::debug!(
                route = c.route().map(|r| r.pattern()),
                timeout = ?dt,
                %err,
                "handler abandoned"
            );
            shadow.abandon(err, || (config.response)(&mut c));
            Ok(())
        }
    }
}

async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn route_attributes(c: &Context) -> [KeyValue; 1] {
    let pattern = c.route().map(|r| r.pattern().to_owned()).unwrap_or_default();
    [KeyValue::new("route", pattern)]
}

impl<S> TimeoutService<S> {
    pub fn new(inner: S, dt: Duration) -> Self {
        Self::with_config(inner, dt, Config::default(), Arc::new(BufferPool::default()))
    }

    pub(crate) fn with_config(
        inner: S,
        dt: Duration,
        config: Config,
        pool: Arc<BufferPool>,
    ) -> Self {
        let meter = global::meter("handler_timeout_service");
        let instruments = TimeoutServiceMetrics {
            timeouts: meter.u64_counter("handler_timeouts").build(),
            panics: meter.u64_counter("handler_panics").build(),
        };

        Self {
            inner,
            dt,
            config,
            pool,
            instruments,
        }
    }
}
