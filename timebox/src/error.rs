use std::io;
use std::time::Duration;

/// Errors returned by a [`ResponseSink`](crate::ResponseSink).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The handler exceeded its time limit and its response was discarded.
    ///
    /// Every write attempted by the handler after the deadline fires returns
    /// this error.
    #[error("http: Handler timeout")]
    HandlerTimeout,

    /// The request was canceled upstream before the handler finished.
    #[error("context canceled")]
    Canceled,

    /// The sink cannot provide the requested capability.
    ///
    /// Returned by flush, push, hijack and deadline operations when the
    /// underlying transport (or the timeout shadow) has no support for them.
    #[error("feature not supported")]
    NotSupported,

    /// The underlying transport failed.
    #[error("{message}")]
    Io {
        /// The kind of the originating I/O error.
        kind: io::ErrorKind,
        /// The `Display` representation of the originating I/O error.
        message: String,
    },
}

impl From<io::Error> for SinkError {
    fn from(err: io::Error) -> Self {
        SinkError::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Errors raised while declaring route annotations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// A read or write deadline override of zero would expire every request
    /// immediately, so it is refused at registration.
    #[error("{tag} override must be greater than zero, got {value:?}")]
    ZeroDeadline {
        /// The annotation being declared.
        tag: &'static str,
        /// The rejected value.
        value: Duration,
    },
}
