use std::{
    ops::{Deref, DerefMut},
    sync::{Arc, Mutex, PoisonError},
};

/// Simple pool of byte buffers reused across page decodes to avoid reallocating
/// a decompression buffer for every page.
///
/// Buffers are handed out as [`PooledBuffer`] guards and go back to the pool when
/// the guard is dropped, so a page releases its memory on every exit path.
#[derive(Debug)]
pub struct BuffersPool {
    /// Idle buffers.
    buffers: Mutex<Vec<Vec<u8>>>,
    /// Maximum number of idle buffers retained.
    capacity: usize,
}

impl BuffersPool {
    /// Creates a new empty buffer pool retaining at most `capacity` idle buffers.
    pub fn new(capacity: usize) -> Arc<BuffersPool> {
        Arc::new(BuffersPool {
            buffers: Mutex::new(Vec::new()),
            capacity,
        })
    }

    /// Retrieves an empty buffer from the pool, or a new one if the pool is empty.
    pub fn get_buffer(self: &Arc<Self>) -> PooledBuffer {
        let buffer = self
            .buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        PooledBuffer {
            pool: Some(self.clone()),
            buffer,
        }
    }

    /// Number of idle buffers.
    pub fn idle_count(&self) -> usize {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn return_buffer(&self, mut buffer: Vec<u8>) {
        buffer.clear();
        let mut buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
        if buffers.len() < self.capacity {
            buffers.push(buffer);
        }
    }
}

/// A buffer borrowed from a [`BuffersPool`], returned to it on drop.
#[derive(Debug, Default)]
pub struct PooledBuffer {
    pool: Option<Arc<BuffersPool>>,
    buffer: Vec<u8>,
}

impl PooledBuffer {
    /// A buffer not associated with any pool.
    pub fn detached(buffer: Vec<u8>) -> PooledBuffer {
        PooledBuffer { pool: None, buffer }
    }
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.return_buffer(std::mem::take(&mut self.buffer));
        }
    }
}
