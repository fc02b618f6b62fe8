use std::sync::Arc;
use std::time::Duration;

use timebox::BufferPool;
use timebox::Context;
use tower::Layer;

use crate::config::Config;
use crate::config::Fallback;
use crate::service::TimeoutService;

/// Runs handlers with a time limit.
///
/// Each request is served by the inner handler on its own task, writing into
/// a buffered response. If the handler finishes in time its response is
/// copied to the client in one go. Otherwise the client receives the
/// fallback response (by default `503 Service Unavailable`), the handler's
/// cancellation token fires and its later writes fail with
/// [`SinkError::HandlerTimeout`](timebox::SinkError::HandlerTimeout).
///
/// Push is supported while buffering; flush, hijack and connection deadlines
/// are not.
///
/// Routes can override the timeout with [`override_handler`](timebox::override_handler)
/// and set connection deadlines with [`override_read`](timebox::override_read) and
/// [`override_write`](timebox::override_write). With a zero duration
/// ([`NO_TIMEOUT`](timebox::NO_TIMEOUT)) the layer passes requests straight
/// through, but per-route options remain effective.
#[derive(Clone, Debug)]
pub struct TimeoutLayer {
    dt: Duration,
    config: Config,
    pool: Arc<BufferPool>,
}

impl TimeoutLayer {
    /// Create a TimeoutLayer
    pub fn new(dt: Duration) -> Self {
        TimeoutLayer {
            dt,
            config: Config::default(),
            pool: Arc::new(BufferPool::default()),
        }
    }

    /// Set the response sent when a handler times out.
    ///
    /// The function writes to the real response sink of the original request.
    pub fn with_response<F>(self, response: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.with_fallback(Arc::new(response))
    }

    /// Like [`with_response`](Self::with_response), for a fallback shared
    /// between layers.
    pub fn with_fallback(mut self, response: Fallback) -> Self {
        self.config.response = response;
        self
    }

    /// Share a body buffer pool with other layers.
    pub fn with_buffer_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.pool = pool;
        self
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, service: S) -> Self::Service {
        TimeoutService::with_config(service, self.dt, self.config.clone(), self.pool.clone())
    }
}
