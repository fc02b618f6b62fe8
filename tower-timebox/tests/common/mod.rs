#![allow(dead_code)]

use std::future::Future;
use std::io;
use std::io::Write;
use std::net::TcpStream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context as TaskContext;
use std::task::Poll;

use http::Request;
use parking_lot::Mutex;
use pin_project_lite::pin_project;
use timebox::Body;
use timebox::Context;
use timebox::HeadersMut;
use timebox::ResponseRecorder;
use timebox::ResponseSink;
use timebox::Route;
use timebox::RouteOption;
use timebox::SinkError;
use tokio::io::AsyncRead;
use tokio::io::ReadBuf;
use tokio::time::Instant;
use tokio::time::Sleep;
use tokio::time::sleep_until;
use tower::BoxError;
use tower::Layer;
use tower::Service;
use tower::ServiceExt;
use tower::util::BoxCloneSyncService;

pub type Deadline = Arc<Mutex<Option<Instant>>>;

pin_project! {
    /// A request body which fails with an i/o timeout once the connection's
    /// read deadline has passed.
    pub struct DeadlineReader<R> {
        #[pin]
        inner: R,
        deadline: Deadline,
        sleep: Option<Pin<Box<Sleep>>>,
    }
}

impl<R> DeadlineReader<R> {
    pub fn new(inner: R, deadline: Deadline) -> Self {
        Self {
            inner,
            deadline,
            sleep: None,
        }
    }
}

impl<R: AsyncRead> AsyncRead for DeadlineReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        if let Poll::Ready(res) = this.inner.poll_read(cx, buf) {
            return Poll::Ready(res);
        }

        let Some(deadline) = *this.deadline.lock() else {
            return Poll::Pending;
        };
        let sleep = this
            .sleep
            .get_or_insert_with(|| Box::pin(sleep_until(deadline)));
        if sleep.deadline() != deadline {
            sleep.as_mut().reset(deadline);
        }
        match sleep.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "i/o timeout",
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// A response sink standing in for a server connection.
///
/// Status and headers are recorded. Body bytes go to the socket when one is
/// attached, bounded by the write deadline, and to the recorder otherwise.
#[derive(Clone, Default)]
pub struct ConnSink {
    rec: ResponseRecorder,
    socket: Option<Arc<TcpStream>>,
    read_deadline: Deadline,
    write_deadline: Deadline,
}

impl ConnSink {
    pub fn new(read_deadline: Deadline) -> Self {
        Self {
            read_deadline,
            ..Self::default()
        }
    }

    pub fn with_socket(socket: TcpStream) -> Self {
        Self {
            socket: Some(Arc::new(socket)),
            ..Self::default()
        }
    }

    pub fn recorder(&self) -> &ResponseRecorder {
        &self.rec
    }

    fn write_socket(&self, mut socket: &TcpStream, buf: &[u8]) -> Result<usize, SinkError> {
        let deadline = *self.write_deadline.lock();
        let mut written = 0;
        while written < buf.len() {
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "i/o timeout").into());
                }
                socket.set_write_timeout(Some(remaining))?;
            }
            written += socket.write(&buf[written..])?;
        }
        Ok(written)
    }
}

impl ResponseSink for ConnSink {
    fn headers_mut(&mut self) -> HeadersMut<'_> {
        self.rec.headers_mut()
    }

    fn write_header(&mut self, code: u16) {
        self.rec.write_header(code)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, SinkError> {
        match self.socket.clone() {
            Some(socket) => {
                self.rec.write(&[])?;
                self.write_socket(&socket, buf)
            }
            None => self.rec.write(buf),
        }
    }

    fn written(&self) -> bool {
        self.rec.written()
    }

    fn set_read_deadline(&mut self, deadline: Instant) -> Result<(), SinkError> {
        *self.read_deadline.lock() = Some(deadline);
        Ok(())
    }

    fn set_write_deadline(&mut self, deadline: Instant) -> Result<(), SinkError> {
        *self.write_deadline.lock() = Some(deadline);
        Ok(())
    }
}

pub type Handler = BoxCloneSyncService<Context, (), BoxError>;

/// Just enough of a router to dispatch by exact path.
pub struct Router<L> {
    middleware: L,
    routes: Vec<(Arc<Route>, Handler)>,
}

impl<L> Router<L>
where
    L: Layer<Handler>,
    L::Service: Service<Context, Response = (), Error = BoxError> + Clone + Send + Sync + 'static,
    <L::Service as Service<Context>>::Future: Send + 'static,
{
    pub fn new(middleware: L) -> Self {
        Self {
            middleware,
            routes: Vec::new(),
        }
    }

    pub fn add<S>(&mut self, path: &str, handler: S, options: Vec<RouteOption>)
    where
        S: Service<Context, Response = (), Error = BoxError> + Clone + Send + Sync + 'static,
        S::Future: Send + 'static,
    {
        let route = options
            .into_iter()
            .fold(Route::new(path), |route, option| route.with(option));
        let handler = BoxCloneSyncService::new(
            self.middleware.layer(BoxCloneSyncService::new(handler)),
        );
        self.routes.push((Arc::new(route), handler));
    }

    pub async fn serve<W>(&self, req: Request<Body>, w: W) -> Result<(), BoxError>
    where
        W: ResponseSink + 'static,
    {
        let Some((route, handler)) = self
            .routes
            .iter()
            .find(|(route, _)| route.pattern() == req.uri().path())
        else {
            return Err("no route".into());
        };
        let c = Context::new(req, w).with_route(route.clone());
        handler.clone().oneshot(c).await
    }
}
