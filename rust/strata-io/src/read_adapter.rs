//! A helper that turns any `ReadAt` implementation into a standard `std::io::Read`.

use crate::ReadAt;

/// A helper that turns any `ReadAt` implementation into a standard `std::io::Read` and
/// `std::io::Seek`.
///
/// The adapter maintains an internal position and reads sequentially from the underlying
/// `ReadAt` source. Wrap it in a `std::io::BufReader` to batch small reads (page headers,
/// varints) into requests sized for the storage.
pub struct ReadAdapter<R> {
    inner: R,
    pos: u64,
    /// Cached size of the inner `ReadAt`
    size: Option<u64>,
}

impl<R> ReadAdapter<R> {
    /// Creates a new `ReadAdapter` wrapping the given `ReadAt` implementation.
    ///
    /// The adapter starts reading from position 0.
    pub fn new(inner: R) -> Self {
        Self::new_at_position(inner, 0)
    }

    /// Creates a new `ReadAdapter` starting from the specified position.
    pub fn new_at_position(inner: R, pos: u64) -> Self {
        Self {
            inner,
            pos,
            size: None,
        }
    }

    /// Returns the current read position.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Returns a reference to the underlying `ReadAt` implementation.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Consumes the adapter and returns the underlying `ReadAt` implementation.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: ReadAt> ReadAdapter<R> {
    fn size(&mut self) -> std::io::Result<u64> {
        match self.size {
            Some(size) => Ok(size),
            None => {
                let size = self.inner.size()?;
                self.size = Some(size);
                Ok(size)
            }
        }
    }
}

impl<R: ReadAt> std::io::Read for ReadAdapter<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let size = self.size()?;
        if self.pos >= size {
            return Ok(0);
        }

        let to_read = (size - self.pos).min(buf.len() as u64) as usize;
        let bytes_read = self.inner.read_at(self.pos, &mut buf[..to_read])?;
        self.pos += bytes_read as u64;
        Ok(bytes_read)
    }
}

impl<R: ReadAt> std::io::Seek for ReadAdapter<R> {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        use std::io::SeekFrom;

        let new_pos = match pos {
            SeekFrom::Start(offset) => offset,
            SeekFrom::End(offset) => {
                let size = self.size()?;
                size.saturating_add_signed(offset)
            }
            SeekFrom::Current(offset) => self.pos.saturating_add_signed(offset),
        };

        // Seeking past the end is allowed, subsequent reads report end of input.
        self.pos = new_pos;
        Ok(self.pos)
    }

    fn stream_position(&mut self) -> std::io::Result<u64> {
        Ok(self.pos)
    }
}
