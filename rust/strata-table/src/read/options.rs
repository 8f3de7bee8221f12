use serde::{Deserialize, Serialize};
use strata_io::StorageProfile;

/// Tunables of the read path.
///
/// Deserializable from configuration; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Capacity of the sequential read buffer of each column chunk cursor.
    pub read_buffer_size: usize,
    /// Maximum number of levels and values decoded per batch.
    pub value_batch_size: usize,
    /// Whether page CRC-32 checksums are verified when present.
    pub verify_checksums: bool,
    /// Number of rows buffered per merge input.
    pub merge_buffer_rows: usize,
}

impl ReaderOptions {
    pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;
    pub const DEFAULT_VALUE_BATCH_SIZE: usize = 1024;

    pub fn new() -> ReaderOptions {
        ReaderOptions::default()
    }

    pub fn with_read_buffer_size(mut self, read_buffer_size: usize) -> ReaderOptions {
        self.read_buffer_size = read_buffer_size;
        self
    }

    pub fn with_value_batch_size(mut self, value_batch_size: usize) -> ReaderOptions {
        self.value_batch_size = value_batch_size;
        self
    }

    pub fn with_verify_checksums(mut self, verify_checksums: bool) -> ReaderOptions {
        self.verify_checksums = verify_checksums;
        self
    }

    pub fn with_merge_buffer_rows(mut self, merge_buffer_rows: usize) -> ReaderOptions {
        self.merge_buffer_rows = merge_buffer_rows;
        self
    }

    /// Read buffer size adjusted to the I/O range recommended by the source.
    pub fn effective_read_buffer_size(&self, profile: &StorageProfile) -> usize {
        profile.clamp_io_size(self.read_buffer_size)
    }

    pub fn effective_value_batch_size(&self) -> usize {
        self.value_batch_size.max(1)
    }

    pub fn effective_merge_buffer_rows(&self) -> usize {
        self.merge_buffer_rows.max(1)
    }
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            read_buffer_size: Self::DEFAULT_READ_BUFFER_SIZE,
            value_batch_size: Self::DEFAULT_VALUE_BATCH_SIZE,
            verify_checksums: true,
            merge_buffer_rows: 1,
        }
    }
}
