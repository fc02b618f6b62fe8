use std::panic::Location;
use std::sync::Arc;

use http::HeaderMap;
use http::StatusCode;
use parking_lot::Mutex;
use parking_lot::MutexGuard;

use crate::error::SinkError;
use crate::pool::PooledBuffer;
use crate::sink::HeadersMut;
use crate::sink::Pusher;
use crate::sink::ResponseSink;
use crate::sink::check_write_header_code;

#[derive(Debug)]
struct ShadowState {
    code: Option<StatusCode>,
    headers: HeaderMap,
    body: PooledBuffer,
    err: Option<SinkError>,
}

/// Buffered stand-in for a response sink.
///
/// The handler writes into a [`ShadowWriter`] while the owner of the
/// `Shadow` decides, exactly once, whether to [`commit`](Shadow::commit) the
/// buffered response into the real sink or to [`abandon`](Shadow::abandon)
/// it. Both share one mutex, so the decision never interleaves with a write.
pub struct Shadow {
    state: Arc<Mutex<ShadowState>>,
    pusher: Option<Arc<dyn Pusher>>,
}

impl Shadow {
    /// Create a shadow buffering into `body`.
    ///
    /// `pusher` is the real sink's push handle, if any; push does not touch
    /// the primary response so it bypasses the buffer.
    pub fn new(body: PooledBuffer, pusher: Option<Arc<dyn Pusher>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ShadowState {
                code: None,
                headers: HeaderMap::new(),
                body,
                err: None,
            })),
            pusher,
        }
    }

    /// The sink handed to the handler.
    pub fn writer(&self) -> ShadowWriter {
        ShadowWriter {
            state: Arc::clone(&self.state),
            pusher: self.pusher.clone(),
        }
    }

    /// Copy the buffered response into `dst`.
    ///
    /// Headers are copied first (replacing any value `dst` already holds for
    /// the same name), then the status, then the body. Returns the number of
    /// body bytes accepted by `dst`. Fails without touching `dst` if the
    /// shadow was abandoned.
    pub fn commit(&self, dst: &mut dyn ResponseSink) -> Result<usize, SinkError> {
        let state = self.state.lock();
        if let Some(err) = &state.err {
            return Err(err.clone());
        }

        {
            let mut headers = dst.headers_mut();
            for name in state.headers.keys() {
                headers.remove(name);
                for value in state.headers.get_all(name) {
                    headers.append(name.clone(), value.clone());
                }
            }
        }
        dst.write_header(state.code.unwrap_or(StatusCode::OK).as_u16());
        if state.body.is_empty() {
            return Ok(0);
        }
        dst.write(&state.body)
    }

    /// Seal the shadow with `err` and run `fallback` while still holding the
    /// lock.
    ///
    /// Any later write from the handler returns `err`.
    pub fn abandon<F, R>(&self, err: SinkError, fallback: F) -> R
    where
        F: FnOnce() -> R,
    {
        let mut state = self.state.lock();
        state.err = Some(err);
        fallback()
    }

    /// The terminal error, once the shadow has been abandoned.
    pub fn error(&self) -> Option<SinkError> {
        self.state.lock().err.clone()
    }
}

/// The handler side of a [`Shadow`].
///
/// Flush, hijack and connection deadlines cannot be honoured while output is
/// buffered and return [`SinkError::NotSupported`].
///
/// Headers stay editable after the shadow is abandoned; an abandoned shadow
/// is never committed, so such edits never reach the client.
pub struct ShadowWriter {
    state: Arc<Mutex<ShadowState>>,
    pusher: Option<Arc<dyn Pusher>>,
}

impl ResponseSink for ShadowWriter {
    fn headers_mut(&mut self) -> HeadersMut<'_> {
        HeadersMut::Guarded(MutexGuard::map(self.state.lock(), |s| &mut s.headers))
    }

    #[track_caller]
    fn write_header(&mut self, code: u16) {
        let status = check_write_header_code(code);
        let mut state = self.state.lock();
        if state.err.is_some() {
            return;
        }
        match state.code {
            None => state.code = Some(status),
            Some(current) => {
                let caller = Location::caller();
                tracing::warn!(
                    %current,
                    ignored = %status,
                    %caller,
                    "superfluous write_header call"
                );
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, SinkError> {
        let mut state = self.state.lock();
        if let Some(err) = &state.err {
            return Err(err.clone());
        }
        state.code.get_or_insert(StatusCode::OK);
        state.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn written(&self) -> bool {
        self.state.lock().code.is_some()
    }

    fn pusher(&self) -> Option<Arc<dyn Pusher>> {
        self.pusher.clone()
    }
}
