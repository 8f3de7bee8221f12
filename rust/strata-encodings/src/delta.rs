//! `DELTA_BINARY_PACKED` encoding of 32- and 64-bit integers.
//!
//! The stream starts with a header of ULEB128 varints: values per block, miniblocks per
//! block, total value count, and the zigzag-encoded first value. Each block follows as
//! a zigzag min delta, one bit width byte per miniblock, then the miniblocks holding
//! `delta - min_delta` bit-packed LSB-first. Miniblocks past the last value are
//! omitted, the last written one is padded to its full size.

use strata_common::{Result, error::Error};
use strata_format::value::{Kind, Value};

use crate::rle::{bit_width, pack, read_uleb128, unpack_wide, write_uleb128};

/// Largest block accepted by the decoder, in values.
pub const MAX_BLOCK_SIZE: usize = 65536;

const BLOCK_SIZE: usize = 128;
const MINIBLOCKS: usize = 4;

/// Streaming decoder of a delta binary packed stream.
///
/// 32-bit streams wrap around in 32-bit arithmetic; decoded values are returned
/// widened to `i64` and truncate back to `i32` losslessly.
#[derive(Debug, Clone)]
pub struct DeltaDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    max_bit_width: u8,
    values_per_miniblock: usize,
    miniblocks_per_block: usize,
    /// Values left in the stream, including a pending first value.
    remaining: usize,
    first: Option<i64>,
    last: i64,
    min_delta: i64,
    bit_widths: &'a [u8],
    next_miniblock: usize,
    miniblock: &'a [u8],
    miniblock_width: u8,
    miniblock_left: usize,
    bit_pos: usize,
}

impl<'a> DeltaDecoder<'a> {
    /// Parses the stream header. `kind` is `Int32` or `Int64`.
    pub fn new(kind: Kind, data: &'a [u8]) -> Result<DeltaDecoder<'a>> {
        let max_bit_width = match kind {
            Kind::Int32 => 32,
            Kind::Int64 => 64,
            _ => {
                return Err(Error::invalid_arg(
                    "kind",
                    format!("delta binary packed encoding of {kind:?} values"),
                ));
            }
        };
        let mut pos = 0;
        let block_size = read_uleb128(data, &mut pos, "delta block size")?;
        let miniblocks = read_uleb128(data, &mut pos, "delta miniblock count")?;
        let total = read_uleb128(data, &mut pos, "delta value count")?;
        let first = zigzag(read_uleb128(data, &mut pos, "delta first value")?);

        if block_size == 0 || block_size % 128 != 0 || block_size > MAX_BLOCK_SIZE as u64 {
            return Err(Error::invalid_format(
                "delta header",
                format!("invalid block size {block_size}"),
            ));
        }
        if miniblocks == 0 || block_size % miniblocks != 0 || (block_size / miniblocks) % 32 != 0
        {
            return Err(Error::invalid_format(
                "delta header",
                format!("invalid miniblock count {miniblocks} for block size {block_size}"),
            ));
        }
        if total > i32::MAX as u64 {
            return Err(Error::invalid_format(
                "delta header",
                format!("too many values: {total}"),
            ));
        }

        Ok(DeltaDecoder {
            data,
            pos,
            max_bit_width,
            values_per_miniblock: (block_size / miniblocks) as usize,
            miniblocks_per_block: miniblocks as usize,
            remaining: total as usize,
            first: (total > 0).then_some(first),
            last: first,
            min_delta: 0,
            bit_widths: &[],
            next_miniblock: 0,
            miniblock: &[],
            miniblock_width: 0,
            miniblock_left: 0,
            bit_pos: 0,
        })
    }

    /// Number of values the stream still declares.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Decodes up to `out.len()` values. Returns fewer only when the stream is done.
    pub fn read(&mut self, out: &mut [i64]) -> Result<usize> {
        let mut n = 0;
        while n < out.len() && self.remaining > 0 {
            if let Some(first) = self.first.take() {
                out[n] = first;
                n += 1;
                self.remaining -= 1;
                continue;
            }
            if self.miniblock_left == 0 {
                self.next_miniblock()?;
            }
            let count = self
                .miniblock_left
                .min(self.remaining)
                .min(out.len() - n);
            for slot in &mut out[n..n + count] {
                let delta = unpack_wide(self.miniblock, self.bit_pos, self.miniblock_width);
                self.bit_pos += self.miniblock_width as usize;
                self.last = self
                    .last
                    .wrapping_add(self.min_delta)
                    .wrapping_add(delta as i64);
                *slot = self.last;
            }
            n += count;
            self.remaining -= count;
            self.miniblock_left -= count;
        }
        Ok(n)
    }

    fn next_miniblock(&mut self) -> Result<()> {
        if self.next_miniblock >= self.bit_widths.len() {
            self.next_block()?;
        }
        let width = self.bit_widths[self.next_miniblock];
        self.next_miniblock += 1;
        if width > self.max_bit_width {
            return Err(Error::invalid_format(
                "delta block",
                format!("miniblock bit width {width} exceeds {}", self.max_bit_width),
            ));
        }
        let full_len = self.values_per_miniblock * width as usize / 8;
        let needed = (self.values_per_miniblock.min(self.remaining) * width as usize).div_ceil(8);
        let available = self.data.len() - self.pos;
        if available < needed {
            return Err(Error::unexpected_eof("delta miniblock"));
        }
        let len = full_len.min(available);
        let data: &'a [u8] = self.data;
        self.miniblock = &data[self.pos..self.pos + len];
        self.pos += len;
        self.miniblock_width = width;
        self.miniblock_left = self.values_per_miniblock;
        self.bit_pos = 0;
        Ok(())
    }

    fn next_block(&mut self) -> Result<()> {
        self.min_delta = zigzag(read_uleb128(self.data, &mut self.pos, "delta min delta")?);
        // The widths of trailing unused miniblocks may be cut off with the stream.
        let count = self.miniblocks_per_block.min(self.data.len() - self.pos);
        if count == 0 {
            return Err(Error::unexpected_eof("delta miniblock bit widths"));
        }
        let data: &'a [u8] = self.data;
        self.bit_widths = &data[self.pos..self.pos + count];
        self.pos += count;
        self.next_miniblock = 0;
        Ok(())
    }
}

fn zigzag(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

fn unzigzag(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

/// Appends the delta binary packed encoding of `values` to `out`, in blocks of 128
/// values split into four miniblocks. Every value must be a non-null `kind` value,
/// `kind` being `Int32` or `Int64`.
pub fn encode(kind: Kind, values: &[Value], out: &mut Vec<u8>) -> Result<()> {
    let narrow = match kind {
        Kind::Int32 => true,
        Kind::Int64 => false,
        _ => {
            return Err(Error::invalid_arg(
                "kind",
                format!("delta binary packed encoding of {kind:?} values"),
            ));
        }
    };
    let values = values
        .iter()
        .map(|value| {
            let v = if narrow {
                value.as_i32().map(i64::from)
            } else {
                value.as_i64()
            };
            v.ok_or_else(|| {
                Error::invalid_arg(
                    "values",
                    format!("expected a {kind:?} value, got {:?}", value.datum()),
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    write_uleb128(out, BLOCK_SIZE as u64);
    write_uleb128(out, MINIBLOCKS as u64);
    write_uleb128(out, values.len() as u64);
    write_uleb128(out, unzigzag(values.first().copied().unwrap_or(0)));

    let sub = |a: i64, b: i64| {
        if narrow {
            i64::from((a as i32).wrapping_sub(b as i32))
        } else {
            a.wrapping_sub(b)
        }
    };
    let deltas: Vec<i64> = values.windows(2).map(|w| sub(w[1], w[0])).collect();
    let per_miniblock = BLOCK_SIZE / MINIBLOCKS;
    for block in deltas.chunks(BLOCK_SIZE) {
        let min_delta = block.iter().copied().min().unwrap_or(0);
        let packed: Vec<u64> = block
            .iter()
            .map(|&d| {
                if narrow {
                    sub(d, min_delta) as u32 as u64
                } else {
                    sub(d, min_delta) as u64
                }
            })
            .collect();
        let miniblocks: Vec<&[u64]> = packed.chunks(per_miniblock).collect();
        let widths: Vec<u8> = (0..MINIBLOCKS)
            .map(|i| {
                miniblocks
                    .get(i)
                    .map_or(0, |m| bit_width(m.iter().copied().max().unwrap_or(0)))
            })
            .collect();

        write_uleb128(out, unzigzag(min_delta));
        out.extend_from_slice(&widths);
        for (miniblock, &width) in miniblocks.iter().zip(&widths) {
            let padding = per_miniblock - miniblock.len();
            pack(
                out,
                miniblock
                    .iter()
                    .copied()
                    .chain(std::iter::repeat_n(0, padding)),
                width,
            );
        }
    }
    Ok(())
}
