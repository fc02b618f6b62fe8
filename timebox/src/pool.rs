use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Arc;

use bytes::BytesMut;
use parking_lot::Mutex;

/// Buffers that grew beyond this are dropped rather than kept idle.
const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

const DEFAULT_MAX_IDLE: usize = 256;

/// A pool of reusable body buffers.
///
/// Each timed request takes a buffer at start. The buffer is cleared and
/// returned when the last holder of its [`PooledBuffer`] drops it, which may
/// be after the request finished if an abandoned handler is still running.
#[derive(Debug)]
pub struct BufferPool {
    idle: Mutex<Vec<BytesMut>>,
    max_idle: usize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE)
    }
}

impl BufferPool {
    /// Create a pool which keeps at most `max_idle` buffers around.
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    pub fn get(self: &Arc<Self>) -> PooledBuffer {
        let mut buf = self.idle.lock().pop().unwrap_or_default();
        buf.clear();
        PooledBuffer {
            buf,
            pool: Arc::clone(self),
        }
    }

    /// Number of buffers currently waiting for reuse.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    fn put(&self, mut buf: BytesMut) {
        if buf.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        buf.clear();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(buf);
        }
    }
}

/// A body buffer on loan from a [`BufferPool`].
#[derive(Debug)]
pub struct PooledBuffer {
    buf: BytesMut,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuffer {
    type Target = BytesMut;

    fn deref(&self) -> &BytesMut {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.put(std::mem::take(&mut self.buf));
    }
}
