//! Repetition and definition level streams.

use strata_common::{Result, error::Error};

use crate::rle::{RleDecoder, bit_width};

/// Peekable window over the levels of one page.
///
/// Levels are decoded from a hybrid RLE/bit-packed run sequence in batches of at most
/// `batch_size`. [`LevelStream::peek`] exposes the undecoded remainder of the current
/// batch (refilling it when empty) and [`LevelStream::discard`] consumes a prefix of it.
///
/// A stream with a zero max level stores nothing and yields zeros.
#[derive(Debug)]
pub struct LevelStream<'a> {
    decoder: Option<RleDecoder<'a>>,
    max_level: u8,
    /// Levels not yet decoded into `batch`.
    remaining: usize,
    batch: Vec<u8>,
    pos: usize,
    batch_size: usize,
    scratch: Vec<u32>,
}

impl<'a> LevelStream<'a> {
    pub fn new(
        data: &'a [u8],
        max_level: u8,
        num_levels: usize,
        batch_size: usize,
    ) -> Result<LevelStream<'a>> {
        let decoder = if max_level > 0 {
            Some(RleDecoder::new(data, bit_width(max_level as u64))?)
        } else {
            None
        };
        Ok(LevelStream {
            decoder,
            max_level,
            remaining: num_levels,
            batch: Vec::new(),
            pos: 0,
            batch_size: batch_size.max(1),
            scratch: Vec::new(),
        })
    }

    /// Creates a stream of `num_levels` zero levels.
    pub fn zeros(num_levels: usize, batch_size: usize) -> LevelStream<'static> {
        LevelStream {
            decoder: None,
            max_level: 0,
            remaining: num_levels,
            batch: Vec::new(),
            pos: 0,
            batch_size: batch_size.max(1),
            scratch: Vec::new(),
        }
    }

    pub fn max_level(&self) -> u8 {
        self.max_level
    }

    /// Number of levels not yet discarded.
    pub fn remaining(&self) -> usize {
        self.remaining + (self.batch.len() - self.pos)
    }

    /// Returns the buffered, not yet discarded levels, decoding the next batch when
    /// the buffer is empty. An empty slice means the stream is exhausted.
    pub fn peek(&mut self) -> Result<&[u8]> {
        if self.pos == self.batch.len() && self.remaining > 0 {
            self.refill()?;
        }
        Ok(&self.batch[self.pos..])
    }

    /// Consumes the first `count` buffered levels.
    pub fn discard(&mut self, count: usize) {
        debug_assert!(self.pos + count <= self.batch.len());
        self.pos = (self.pos + count).min(self.batch.len());
    }

    /// Consumes the rest of the stream, counting the levels matching `predicate`.
    pub fn count(&mut self, predicate: impl Fn(u8) -> bool) -> Result<usize> {
        let mut count = 0;
        loop {
            let levels = self.peek()?;
            if levels.is_empty() {
                return Ok(count);
            }
            count += levels.iter().filter(|&&level| predicate(level)).count();
            let n = levels.len();
            self.discard(n);
        }
    }

    fn refill(&mut self) -> Result<()> {
        let n = self.batch_size.min(self.remaining);
        self.batch.clear();
        self.batch.resize(n, 0);
        self.pos = 0;
        if let Some(decoder) = &mut self.decoder {
            let read = decoder.read_u8(&mut self.batch, &mut self.scratch)?;
            if read < n {
                return Err(Error::unexpected_eof("truncated level run"));
            }
            if let Some(&level) = self.batch.iter().find(|&&level| level > self.max_level) {
                return Err(Error::invalid_format(
                    "level stream",
                    format!("level {level} exceeds max level {}", self.max_level),
                ));
            }
        }
        self.remaining -= n;
        Ok(())
    }
}
