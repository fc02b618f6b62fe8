use std::fmt;
use std::sync::Arc;

use http::HeaderValue;
use http::StatusCode;
use http::header::CONTENT_LENGTH;
use http::header::CONTENT_TYPE;
use http::header::X_CONTENT_TYPE_OPTIONS;
use timebox::Context;
use timebox::ResponseSink;

/// Produces the response sent to the client when a handler times out.
pub type Fallback = Arc<dyn Fn(&mut Context) + Send + Sync>;

#[derive(Clone)]
pub(crate) struct Config {
    pub(crate) response: Fallback,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            response: Arc::new(default_response),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config").finish_non_exhaustive()
    }
}

/// Sends a plain `503 Service Unavailable` response.
pub fn default_response(c: &mut Context) {
    let status = StatusCode::SERVICE_UNAVAILABLE;
    error_response(
        c.writer(),
        status.canonical_reason().unwrap_or_default(),
        status,
    );
}

/// Replies with `message` as a plain text error body.
///
/// Any `Content-Length` set by the caller is dropped since it cannot match
/// the new body.
pub fn error_response(w: &mut dyn ResponseSink, message: &str, status: StatusCode) {
    {
        let mut headers = w.headers_mut();
        headers.remove(CONTENT_LENGTH);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    }
    w.write_header(status.as_u16());
    if let Err(err) = w.write(format!("{message}\n").as_bytes()) {
        tracing::trace!(%err, "failed to write error response");
    }
}
