//! # timebox
//!
//! `timebox` provides the building blocks for enforcing a time limit on an HTTP handler
//! without ever exposing a half-written response.
//!
//! ## Core Philosophy
//!
//! A handler racing a deadline must not write to the client directly: if it loses the
//! race, some of its bytes may already be on the wire. Instead the handler writes into a
//! [`Shadow`], an in-memory response guarded by a single mutex. Whoever owns the shadow
//! decides exactly once to either commit the buffered response into the real
//! [`ResponseSink`], or abandon it, after which every further write from the handler
//! fails with [`SinkError::HandlerTimeout`].
//!
//! ## Key Concepts
//!
//! * **Response Sink**: the narrow capability set a handler writes its response through.
//!   Optional capabilities (flush, push, hijack, deadlines) report
//!   [`SinkError::NotSupported`] rather than silently degrading.
//! * **Route Annotations**: typed, immutable per-route values ([`HandlerTimeout`],
//!   [`ReadDeadline`], [`WriteDeadline`]) looked up with [`route_timeout`].
//! * **Buffer Pool**: body buffers are recycled across requests by a [`BufferPool`].
//!
//! The `tower-timebox` crate wires these into a `tower` middleware.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use timebox::BufferPool;
//! use timebox::ResponseRecorder;
//! use timebox::ResponseSink;
//! use timebox::Shadow;
//!
//! let pool = Arc::new(BufferPool::default());
//! let shadow = Shadow::new(pool.get(), None);
//!
//! let mut writer = shadow.writer();
//! writer.write_header(201);
//! writer.write(b"created").unwrap();
//!
//! let mut real = ResponseRecorder::new();
//! shadow.commit(&mut real).unwrap();
//! assert_eq!(real.status(), 201);
//! ```

mod context;
mod error;
mod pool;
mod recorder;
mod route;
mod shadow;
mod sink;

pub use context::Body;
pub use context::Context;
pub use error::RouteError;
pub use error::SinkError;
pub use pool::BufferPool;
pub use pool::PooledBuffer;
pub use recorder::ResponseRecorder;
pub use route::HandlerTimeout;
pub use route::NO_TIMEOUT;
pub use route::ReadDeadline;
pub use route::Route;
pub use route::RouteOption;
pub use route::TimeoutAnnotation;
pub use route::WriteDeadline;
pub use route::override_handler;
pub use route::override_read;
pub use route::override_write;
pub use route::route_timeout;
pub use shadow::Shadow;
pub use shadow::ShadowWriter;
pub use sink::Connection;
pub use sink::HeadersMut;
pub use sink::Pusher;
pub use sink::ResponseSink;
pub use sink::check_write_header_code;
