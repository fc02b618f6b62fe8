use std::sync::Arc;

use bytes::Bytes;
use bytes::BytesMut;
use http::HeaderMap;
use http::StatusCode;
use parking_lot::Mutex;
use parking_lot::MutexGuard;

use crate::error::SinkError;
use crate::sink::HeadersMut;
use crate::sink::Pusher;
use crate::sink::ResponseSink;
use crate::sink::check_write_header_code;

#[derive(Debug, Default)]
struct Recorded {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    flushed: bool,
}

/// An in-memory [`ResponseSink`] which records everything written to it.
///
/// Clones share the same recording, so a test can keep one clone while the
/// other is handed to the middleware.
#[derive(Clone, Default)]
pub struct ResponseRecorder {
    inner: Arc<Mutex<Recorded>>,
    pusher: Option<Arc<dyn Pusher>>,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise server push support through `pusher`.
    pub fn with_pusher(mut self, pusher: Arc<dyn Pusher>) -> Self {
        self.pusher = Some(pusher);
        self
    }

    /// The written status, or 200 if the handler never wrote one.
    pub fn status(&self) -> StatusCode {
        self.inner.lock().status.unwrap_or(StatusCode::OK)
    }

    pub fn headers(&self) -> HeaderMap {
        self.inner.lock().headers.clone()
    }

    pub fn body(&self) -> Bytes {
        Bytes::copy_from_slice(&self.inner.lock().body)
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().body).into_owned()
    }

    pub fn flushed(&self) -> bool {
        self.inner.lock().flushed
    }
}

impl std::fmt::Debug for ResponseRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseRecorder")
            .field("inner", &self.inner)
            .field("push", &self.pusher.is_some())
            .finish()
    }
}

impl ResponseSink for ResponseRecorder {
    fn headers_mut(&mut self) -> HeadersMut<'_> {
        HeadersMut::Guarded(MutexGuard::map(self.inner.lock(), |r| &mut r.headers))
    }

    #[track_caller]
    fn write_header(&mut self, code: u16) {
        let status = check_write_header_code(code);
        let mut recorded = self.inner.lock();
        if recorded.status.is_none() {
            recorded.status = Some(status);
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, SinkError> {
        let mut recorded = self.inner.lock();
        recorded.status.get_or_insert(StatusCode::OK);
        recorded.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn written(&self) -> bool {
        self.inner.lock().status.is_some()
    }

    fn pusher(&self) -> Option<Arc<dyn Pusher>> {
        self.pusher.clone()
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        let mut recorded = self.inner.lock();
        recorded.status.get_or_insert(StatusCode::OK);
        recorded.flushed = true;
        Ok(())
    }
}
