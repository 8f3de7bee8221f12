//! A `ReadAt` adapter that restricts reads to a specified range of the underlying reader.

use std::ops::Range;

use crate::{ReadAt, ReadAtExt, StorageProfile, verify};

/// A `ReadAt` adapter that restricts reads to a specified range of the underlying
/// reader, such as the byte range of one column chunk within a file.
///
/// All positions are **relative to the slice's starting position**. For example, if a
/// `SlicedReadAt` is created with a range of `10..20`, then:
///
/// *   `size()` returns `10`.
/// *   `read_at(0, &mut [0; 5])` reads bytes 10-15 of the underlying reader.
/// *   `read_at(5, &mut [0; 15])` reads bytes 15-20 (clamped to the slice size).
#[derive(Clone)]
pub struct SlicedReadAt<R> {
    inner: R,
    range: Range<u64>,
}

impl<R> SlicedReadAt<R> {
    /// Creates a new `SlicedReadAt` adapter.
    ///
    /// # Panics
    ///
    /// Panics if `range.start > range.end`.
    pub fn new(inner: R, range: Range<u64>) -> Self {
        assert!(range.start <= range.end);
        Self { inner, range }
    }

    /// Returns the size of the slice.
    pub fn slice_size(&self) -> u64 {
        self.range.end - self.range.start
    }

    /// Returns the range of the slice within the underlying reader.
    pub fn slice_range(&self) -> Range<u64> {
        self.range.clone()
    }

    /// Returns a reference to the underlying reader.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Consumes the `SlicedReadAt`, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Clone> SlicedReadAt<R> {
    /// Creates a sub-slice using the specified `range` relative to the starting
    /// position of this slice.
    pub fn slice(&self, range: Range<u64>) -> std::io::Result<SlicedReadAt<R>> {
        let this_size = self.slice_size();
        verify!(range.start <= range.end);
        verify!(range.end <= this_size);
        Ok(SlicedReadAt {
            inner: self.inner.clone(),
            range: self.range.start + range.start..self.range.start + range.end,
        })
    }
}

impl<R: ReadAt> SlicedReadAt<R> {
    /// Reads the entire range of bytes represented by this slice.
    pub fn read_all(&self) -> std::io::Result<Vec<u8>> {
        self.inner
            .read_vec_at(self.range.start, self.slice_size() as usize)
    }
}

impl<R: ReadAt> ReadAt for SlicedReadAt<R> {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.slice_size())
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        let slice_size = self.slice_size();
        if pos >= slice_size {
            return Ok(0);
        }
        let len = (slice_size - pos).min(buf.len() as u64) as usize;
        self.inner.read_at(self.range.start + pos, &mut buf[..len])
    }

    fn storage_profile(&self) -> StorageProfile {
        self.inner.storage_profile()
    }
}
