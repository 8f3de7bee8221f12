use std::sync::Arc;

use crate::{ReadAt, StorageProfile};

impl<T> ReadAt for T
where
    T: details::ByteContent + Send + Sync + 'static,
{
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.content().len() as u64)
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        let content = self.content();
        let Ok(pos) = usize::try_from(pos) else {
            return Ok(0);
        };
        if pos >= content.len() {
            return Ok(0);
        }
        let len = buf.len().min(content.len() - pos);
        buf[..len].copy_from_slice(&content[pos..pos + len]);
        Ok(len)
    }

    fn storage_profile(&self) -> StorageProfile {
        StorageProfile {
            min_io_size: 1,
            max_io_size: self
                .content()
                .len()
                .min(StorageProfile::default().max_io_size),
        }
    }
}

mod details {
    pub trait ByteContent {
        fn content(&self) -> &[u8];
    }

    impl ByteContent for Vec<u8> {
        fn content(&self) -> &[u8] {
            self
        }
    }

    impl ByteContent for &'static [u8] {
        fn content(&self) -> &[u8] {
            self
        }
    }
}

/// Wraps an in-memory buffer into a shareable byte source.
pub fn shared_buffer(data: impl Into<Vec<u8>>) -> Arc<dyn ReadAt> {
    Arc::new(data.into())
}
