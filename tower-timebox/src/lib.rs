//! # Tower Timebox
//!
//! `tower-timebox` is a handler timeout middleware for the
//! [Tower](https://github.com/tower-rs/tower) ecosystem.
//!
//! Unlike `tower::timeout`, which can only drop a future that runs too long, this
//! middleware works with handlers that write their response through a
//! [`timebox::ResponseSink`]. It guarantees that the client sees either the complete
//! response of a handler which finished in time, or the fallback response, never a mix:
//!
//! 1. **Buffering**: the handler runs on its own task and writes into a
//!    [`timebox::Shadow`] instead of the real sink.
//! 2. **Commit**: if the handler returns before the deadline, headers, status and body
//!    are copied to the real sink under the shadow's lock.
//! 3. **Fallback**: if the deadline passes (or the request is canceled upstream), the
//!    shadow is sealed, the handler's cancellation token fires and the configured
//!    fallback writes to the real sink. Writes the handler makes afterwards fail with
//!    [`timebox::SinkError::HandlerTimeout`].
//! 4. **Panics**: a panicking handler is re-raised on the caller's task, so recovery
//!    layers further out see it exactly as they would without this middleware.
//!
//! Per-route behaviour is configured with the annotations in [`timebox`]:
//! [`timebox::override_handler`], [`timebox::override_read`] and
//! [`timebox::override_write`].

mod config;
mod deadline;
mod error;
mod layer;
mod service;
mod utils;


pub use config::Fallback;
pub use config::default_response;
pub use config::error_response;
pub use error::TimeoutError;
pub use layer::TimeoutLayer;
pub use service::TimeoutService;
pub use utils::ServiceBuilderExt;
