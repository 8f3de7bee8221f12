//! I/O abstractions for the read path:
//! - `ReadAt`: positional reader filling caller buffers from arbitrary offsets of a
//!   file/blob.
//! - `SlicedReadAt`: a section of a `ReadAt` addressed relative to its start.
//! - `ReadAdapter`: sequential `Read + Seek` over any `ReadAt`.
//!
//! Provides a couple of simple implementations: memory-based and file-based.

use std::sync::Arc;

pub mod file;
pub mod memory;
pub mod read_adapter;
pub mod sliced_read;
pub mod utils;

pub use file::FileReader;
pub use read_adapter::ReadAdapter;
pub use sliced_read::SlicedReadAt;

/// A trait representing a conceptual file or buffer that supports reading from arbitrary
/// positions.
///
/// Reads are offset-addressed and carry no shared mutable state, so a single instance
/// can serve any number of concurrent readers.
pub trait ReadAt: Send + Sync + 'static {
    /// Returns the size of the underlying object.
    fn size(&self) -> std::io::Result<u64>;

    /// Reads bytes starting at `pos` into `buf`.
    ///
    /// **NOTE**: `read_at` should not return with a short read, unless end-of-file
    /// is encountered.
    ///
    /// # Arguments
    ///
    /// * `pos` - Absolute offset of the first byte to read.
    /// * `buf` - Destination buffer.
    ///
    /// # Returns
    ///
    /// The number of bytes read, which is less than `buf.len()` only when the read
    /// reached the end of the object (zero when `pos` is at or past the end).
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Retrieves the storage profile associated with this reader.
    fn storage_profile(&self) -> StorageProfile;
}

/// Convenience methods available on every [`ReadAt`].
pub trait ReadAtExt: ReadAt {
    /// Fills `buf` entirely from `pos`.
    ///
    /// A read that would cross the end of the object fails with
    /// [`std::io::ErrorKind::UnexpectedEof`], which keeps "read past end of declared
    /// range" distinguishable from failures of the source itself.
    fn read_exact_at(&self, pos: u64, buf: &mut [u8]) -> std::io::Result<()> {
        let n = self.read_at(pos, buf)?;
        if n < buf.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "read past end of declared range: {} bytes at offset {pos}, {n} available",
                    buf.len()
                ),
            ));
        }
        Ok(())
    }

    /// Reads exactly `len` bytes from `pos` into a new buffer.
    fn read_vec_at(&self, pos: u64, len: usize) -> std::io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact_at(pos, &mut buf)?;
        Ok(buf)
    }
}

impl<T: ReadAt + ?Sized> ReadAtExt for T {}

/// Characterizes the performance aspects of the underlying storage implementation.
#[derive(Debug, Clone)]
pub struct StorageProfile {
    /// Suggested minimum size for an effective I/O request.
    /// Using buffers smaller than this size may be inefficient, as the round-trip time
    /// could dominate the overall I/O operation time.
    pub min_io_size: usize,

    /// Suggested maximum size for a single I/O request.
    pub max_io_size: usize,
}

impl StorageProfile {
    /// Clamps a given I/O size to the recommended range defined by this profile.
    ///
    /// The minimum size is guaranteed to be at least 1, and the maximum size is
    /// guaranteed to be at least the minimum size.
    pub fn clamp_io_size(&self, size: usize) -> usize {
        let min = self.min_io_size.max(1).min(self.max_io_size);
        let max = self.max_io_size.max(1).max(min);
        size.clamp(min, max)
    }
}

impl Default for StorageProfile {
    fn default() -> StorageProfile {
        Self {
            min_io_size: 4 * 1024,
            max_io_size: 4 * 1024 * 1024,
        }
    }
}

impl<T> ReadAt for Arc<T>
where
    T: ReadAt + ?Sized,
{
    fn size(&self) -> std::io::Result<u64> {
        self.as_ref().size()
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        self.as_ref().read_at(pos, buf)
    }

    fn storage_profile(&self) -> StorageProfile {
        self.as_ref().storage_profile()
    }
}
