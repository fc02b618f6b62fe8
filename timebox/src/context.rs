use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context as TaskContext;
use std::task::Poll;

use bytes::Bytes;
use http::HeaderValue;
use http::Request;
use http::header::CONTENT_TYPE;
use tokio::io::AsyncRead;
use tokio::io::ReadBuf;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::sync::WaitForCancellationFuture;

use crate::error::SinkError;
use crate::route::Route;
use crate::sink::ResponseSink;

/// The body of an inbound request.
pub struct Body {
    inner: Pin<Box<dyn AsyncRead + Send + Sync>>,
}

impl Body {
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        Self {
            inner: Box::pin(reader),
        }
    }

    pub fn empty() -> Self {
        Self::new(tokio::io::empty())
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body").finish_non_exhaustive()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::new(io::Cursor::new(bytes))
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Bytes::from_static(s.as_bytes()).into()
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Bytes::from(s).into()
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Bytes::from(v).into()
    }
}

impl AsyncRead for Body {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.inner.as_mut().poll_read(cx, buf)
    }
}

/// Everything a handler needs to serve one request.
///
/// A `Context` is built by the router for each inbound request. It carries
/// the request, the sink the response goes to, the matched route and a
/// cancellation token which fires when the request is abandoned.
pub struct Context {
    request: Request<Body>,
    writer: Box<dyn ResponseSink>,
    route: Option<Arc<Route>>,
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    pub fn new<W>(request: Request<Body>, writer: W) -> Self
    where
        W: ResponseSink + 'static,
    {
        Self {
            request,
            writer: Box::new(writer),
            route: None,
            cancellation: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_route(mut self, route: Arc<Route>) -> Self {
        self.route = Some(route);
        self
    }

    /// Tie this request to an existing cancellation token, for instance one
    /// that fires when the client disconnects.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn request(&self) -> &Request<Body> {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request<Body> {
        &mut self.request
    }

    pub fn body_mut(&mut self) -> &mut Body {
        self.request.body_mut()
    }

    pub fn writer(&mut self) -> &mut dyn ResponseSink {
        self.writer.as_mut()
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_deref()
    }

    /// The instant after which the handler's output will be discarded.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Completes once the request is canceled or its deadline has passed.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancellation.cancelled()
    }

    /// Write `body` as a plain text response with the given status.
    pub fn string(&mut self, code: u16, body: &str) -> Result<usize, SinkError> {
        {
            let mut headers = self.writer.headers_mut();
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                );
            }
        }
        self.writer.write_header(code);
        self.writer.write(body.as_bytes())
    }

    /// Derive a context which writes to `writer` and is bounded by
    /// `deadline`. `None` leaves the derived context without a deadline.
    ///
    /// The request head is copied; the body moves to the new context, so
    /// this context is left with an empty body.
    pub fn clone_with<W>(
        &mut self,
        writer: W,
        cancellation: CancellationToken,
        deadline: Option<Instant>,
    ) -> Context
    where
        W: ResponseSink + 'static,
    {
        let body = std::mem::take(self.request.body_mut());
        let mut request = Request::new(body);
        *request.method_mut() = self.request.method().clone();
        *request.uri_mut() = self.request.uri().clone();
        *request.version_mut() = self.request.version();
        *request.headers_mut() = self.request.headers().clone();
        *request.extensions_mut() = self.request.extensions().clone();

        Context {
            request,
            writer: Box::new(writer),
            route: self.route.clone(),
            cancellation,
            deadline,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request", &self.request)
            .field("route", &self.route)
            .field("deadline", &self.deadline)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::Method;
    use http::StatusCode;
    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::recorder::ResponseRecorder;

    #[tokio::test]
    async fn test_clone_with_moves_body_and_copies_head() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload?x=1")
            .header("x-trace", "abc")
            .body(Body::from("payload"))
            .unwrap();
        let route = Arc::new(Route::new("/upload"));
        let mut c = Context::new(request, ResponseRecorder::new()).with_route(route);

        let deadline = Instant::now() + Duration::from_secs(1);
        let token = c.cancellation().child_token();
        let mut cp = c.clone_with(ResponseRecorder::new(), token, Some(deadline));

        assert_eq!(cp.request().method(), Method::POST);
        assert_eq!(cp.request().uri(), "/upload?x=1");
        assert_eq!(cp.request().headers()["x-trace"], "abc");
        assert_eq!(cp.route().map(Route::pattern), Some("/upload"));
        assert_eq!(cp.deadline(), Some(deadline));
        assert_eq!(c.deadline(), None);

        let mut moved = String::new();
        cp.body_mut().read_to_string(&mut moved).await.unwrap();
        assert_eq!(moved, "payload");

        let mut left = String::new();
        c.body_mut().read_to_string(&mut left).await.unwrap();
        assert!(left.is_empty());
    }

    #[tokio::test]
    async fn test_parent_cancellation_reaches_clone() {
        let mut c = Context::new(Request::new(Body::empty()), ResponseRecorder::new());
        let token = c.cancellation().child_token();
        let cp = c.clone_with(ResponseRecorder::new(), token, Some(Instant::now()));

        assert!(!cp.is_cancelled());
        c.cancellation().cancel();
        cp.cancelled().await;
        assert!(cp.is_cancelled());
    }

    #[test]
    fn test_string_sets_text_content_type() {
        let rec = ResponseRecorder::new();
        let mut c = Context::new(Request::new(Body::empty()), rec.clone());
        c.string(201, "Created\n").unwrap();

        assert_eq!(rec.status(), StatusCode::CREATED);
        assert_eq!(rec.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(rec.body_string(), "Created\n");
    }
}
