use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Arc;

use http::HeaderMap;
use http::StatusCode;
use parking_lot::MappedMutexGuard;
use tokio::io::AsyncRead;
use tokio::io::AsyncWrite;
use tokio::time::Instant;

use crate::error::SinkError;

/// Mutable access to a sink's header collection.
///
/// Sinks which share their state with another task hand out a guard; the
/// lock is released when this value is dropped.
pub enum HeadersMut<'a> {
    Borrowed(&'a mut HeaderMap),
    Guarded(MappedMutexGuard<'a, HeaderMap>),
}

impl Deref for HeadersMut<'_> {
    type Target = HeaderMap;

    fn deref(&self) -> &HeaderMap {
        match self {
            HeadersMut::Borrowed(headers) => &**headers,
            HeadersMut::Guarded(guard) => &**guard,
        }
    }
}

impl DerefMut for HeadersMut<'_> {
    fn deref_mut(&mut self) -> &mut HeaderMap {
        match self {
            HeadersMut::Borrowed(headers) => &mut **headers,
            HeadersMut::Guarded(guard) => &mut **guard,
        }
    }
}

/// Initiates server push for a resource.
///
/// Push is independent of the primary response, so it is exposed as a
/// shareable handle rather than through `&mut` access to the sink.
pub trait Pusher: Send + Sync {
    fn push(&self, target: &str, headers: &HeaderMap) -> Result<(), SinkError>;
}

/// A raw connection taken over from the HTTP transport.
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Connection for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// The capability set a handler uses to produce a response.
///
/// The required methods cover status, headers and body. The optional
/// capabilities default to [`SinkError::NotSupported`] so callers can detect
/// them deterministically.
pub trait ResponseSink: Send + Sync {
    /// The header collection to populate before the status is written.
    fn headers_mut(&mut self) -> HeadersMut<'_>;

    /// Sends the response status. Only the first call has an effect.
    ///
    /// # Panics
    ///
    /// Panics if `code` is outside `100..=999`.
    fn write_header(&mut self, code: u16);

    /// Writes body bytes, committing status 200 if none was written yet.
    fn write(&mut self, buf: &[u8]) -> Result<usize, SinkError>;

    /// Returns true once the status has been committed.
    fn written(&self) -> bool;

    /// A handle for server push, when the transport supports it.
    fn pusher(&self) -> Option<Arc<dyn Pusher>> {
        None
    }

    fn push(&mut self, target: &str, headers: &HeaderMap) -> Result<(), SinkError> {
        match self.pusher() {
            Some(pusher) => pusher.push(target, headers),
            None => Err(SinkError::NotSupported),
        }
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Err(SinkError::NotSupported)
    }

    fn hijack(&mut self) -> Result<Box<dyn Connection>, SinkError> {
        Err(SinkError::NotSupported)
    }

    fn set_read_deadline(&mut self, _deadline: Instant) -> Result<(), SinkError> {
        Err(SinkError::NotSupported)
    }

    fn set_write_deadline(&mut self, _deadline: Instant) -> Result<(), SinkError> {
        Err(SinkError::NotSupported)
    }
}

impl<S> ResponseSink for Box<S>
where
    S: ResponseSink + ?Sized,
{
    fn headers_mut(&mut self) -> HeadersMut<'_> {
        (**self).headers_mut()
    }

    #[track_caller]
    fn write_header(&mut self, code: u16) {
        (**self).write_header(code)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, SinkError> {
        (**self).write(buf)
    }

    fn written(&self) -> bool {
        (**self).written()
    }

    fn pusher(&self) -> Option<Arc<dyn Pusher>> {
        (**self).pusher()
    }

    fn push(&mut self, target: &str, headers: &HeaderMap) -> Result<(), SinkError> {
        (**self).push(target, headers)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }

    fn hijack(&mut self) -> Result<Box<dyn Connection>, SinkError> {
        (**self).hijack()
    }

    fn set_read_deadline(&mut self, deadline: Instant) -> Result<(), SinkError> {
        (**self).set_read_deadline(deadline)
    }

    fn set_write_deadline(&mut self, deadline: Instant) -> Result<(), SinkError> {
        (**self).set_write_deadline(deadline)
    }
}

/// Validates a status code passed to [`ResponseSink::write_header`].
///
/// # Panics
///
/// An out of range code is a handler bug, not a runtime condition, so this
/// panics rather than returning an error.
#[track_caller]
pub fn check_write_header_code(code: u16) -> StatusCode {
    match StatusCode::from_u16(code) {
        Ok(status) => status,
        Err(_) => panic!("invalid status code {code}"),
    }
}
