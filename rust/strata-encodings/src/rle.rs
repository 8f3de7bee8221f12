//! Hybrid RLE/bit-packed encoding of small unsigned integers, used for repetition and
//! definition levels, dictionary indices and RLE-encoded booleans.
//!
//! The stream is a sequence of runs, each starting with a ULEB128 header:
//! - `header & 1 == 0`: an RLE run of `header >> 1` copies of one value, stored in
//!   `ceil(bit_width / 8)` little-endian bytes;
//! - `header & 1 == 1`: a bit-packed run of `header >> 1` groups of eight values,
//!   packed LSB-first into `bit_width` bytes per group.

use strata_common::{Result, error::Error};

/// Maximum supported bit width.
pub const MAX_BIT_WIDTH: u8 = 32;

/// Number of bits needed to represent `max_value`.
pub fn bit_width(max_value: u64) -> u8 {
    (64 - max_value.leading_zeros()) as u8
}

/// Decoder of a hybrid RLE/bit-packed stream.
#[derive(Debug, Clone)]
pub struct RleDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    bit_width: u8,
    run: Run<'a>,
}

#[derive(Debug, Clone, Copy)]
enum Run<'a> {
    None,
    Repeated { value: u32, remaining: usize },
    Packed { bytes: &'a [u8], next: usize, len: usize },
}

impl<'a> RleDecoder<'a> {
    pub fn new(data: &'a [u8], bit_width: u8) -> Result<RleDecoder<'a>> {
        if bit_width > MAX_BIT_WIDTH {
            return Err(Error::invalid_format(
                "rle stream",
                format!("bit width {bit_width} exceeds {MAX_BIT_WIDTH}"),
            ));
        }
        Ok(RleDecoder {
            data,
            pos: 0,
            bit_width,
            run: Run::None,
        })
    }

    pub fn bit_width(&self) -> u8 {
        self.bit_width
    }

    /// Decodes up to `out.len()` values. Returns the number of values decoded, which is
    /// short only when the stream is exhausted.
    ///
    /// Bit-packed runs are padded to groups of eight, so a stream may yield more values
    /// than were encoded; callers bound reads by the value count they expect.
    pub fn read(&mut self, out: &mut [u32]) -> Result<usize> {
        let mut n = 0;
        while n < out.len() {
            match &mut self.run {
                Run::None => {
                    if !self.next_run()? {
                        break;
                    }
                }
                Run::Repeated { value, remaining } => {
                    let count = (*remaining).min(out.len() - n);
                    out[n..n + count].fill(*value);
                    *remaining -= count;
                    n += count;
                    if *remaining == 0 {
                        self.run = Run::None;
                    }
                }
                Run::Packed { bytes, next, len } => {
                    let count = (*len - *next).min(out.len() - n);
                    for slot in &mut out[n..n + count] {
                        *slot = unpack(bytes, *next * self.bit_width as usize, self.bit_width);
                        *next += 1;
                    }
                    n += count;
                    if *next == *len {
                        self.run = Run::None;
                    }
                }
            }
        }
        Ok(n)
    }

    /// Same as [`RleDecoder::read`], narrowing values to bytes (levels).
    pub fn read_u8(&mut self, out: &mut [u8], scratch: &mut Vec<u32>) -> Result<usize> {
        scratch.resize(out.len(), 0);
        let n = self.read(scratch)?;
        for (dst, &src) in out.iter_mut().zip(&scratch[..n]) {
            *dst = src as u8;
        }
        Ok(n)
    }

    fn next_run(&mut self) -> Result<bool> {
        if self.pos >= self.data.len() {
            return Ok(false);
        }
        let header = self.read_header()?;
        let count = usize::try_from(header >> 1)
            .map_err(|_| Error::invalid_format("rle stream", "run length overflow"))?;
        if header & 1 == 1 {
            let byte_len = count
                .checked_mul(self.bit_width as usize)
                .ok_or_else(|| Error::invalid_format("rle stream", "run length overflow"))?;
            let len = count
                .checked_mul(8)
                .ok_or_else(|| Error::invalid_format("rle stream", "run length overflow"))?;
            let bytes = self.take(byte_len)?;
            self.run = Run::Packed {
                bytes,
                next: 0,
                len,
            };
        } else {
            let width = (self.bit_width as usize).div_ceil(8);
            let bytes = self.take(width)?;
            let value = bytes
                .iter()
                .rev()
                .fold(0u32, |acc, &b| (acc << 8) | b as u32);
            self.run = Run::Repeated {
                value,
                remaining: count,
            };
        }
        Ok(true)
    }

    fn read_header(&mut self) -> Result<u64> {
        read_uleb128(self.data, &mut self.pos, "rle run header")
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let data: &'a [u8] = self.data;
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| Error::unexpected_eof("truncated rle run"))?;
        let bytes = &data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }
}

/// Reads a ULEB128 varint of at most ten bytes at `*pos`, advancing past it.
pub(crate) fn read_uleb128(data: &[u8], pos: &mut usize, element: &str) -> Result<u64> {
    let mut value = 0u64;
    for i in 0..10 {
        let &byte = data
            .get(*pos)
            .ok_or_else(|| Error::unexpected_eof(element))?;
        *pos += 1;
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(Error::invalid_format(element, "varint is too long"))
}

/// Extracts the `bit_width`-bit value starting at bit `bit_pos` (LSB-first).
fn unpack(bytes: &[u8], bit_pos: usize, bit_width: u8) -> u32 {
    if bit_width == 0 {
        return 0;
    }
    let start = bit_pos / 8;
    let shift = bit_pos % 8;
    let mut window = [0u8; 8];
    let end = (start + 8).min(bytes.len());
    window[..end - start].copy_from_slice(&bytes[start..end]);
    let word = u64::from_le_bytes(window) >> shift;
    (word & ((1u64 << bit_width) - 1)) as u32
}

/// Same as `unpack` for bit widths up to 64.
pub(crate) fn unpack_wide(bytes: &[u8], bit_pos: usize, bit_width: u8) -> u64 {
    if bit_width == 0 {
        return 0;
    }
    let start = bit_pos / 8;
    let shift = bit_pos % 8;
    let mut window = [0u8; 16];
    let end = (start + 16).min(bytes.len());
    if start < end {
        window[..end - start].copy_from_slice(&bytes[start..end]);
    }
    let word = u128::from_le_bytes(window) >> shift;
    (word & ((1u128 << bit_width) - 1)) as u64
}

/// Appends the low `bit_width` bits of each value, packed LSB-first from `out`'s end.
pub(crate) fn pack(out: &mut Vec<u8>, values: impl IntoIterator<Item = u64>, bit_width: u8) {
    let start = out.len();
    let mut bit = 0;
    for value in values {
        for b in 0..bit_width {
            if bit / 8 + start >= out.len() {
                out.push(0);
            }
            if (value >> b) & 1 == 1 {
                out[start + bit / 8] |= 1 << (bit % 8);
            }
            bit += 1;
        }
    }
}

/// Encoder producing hybrid RLE/bit-packed streams.
///
/// Runs of at least eight equal values become RLE runs, everything else is bit-packed
/// in groups of eight (the final group padded with zeros).
#[derive(Debug)]
pub struct RleEncoder {
    bit_width: u8,
    out: Vec<u8>,
    literals: Vec<u32>,
}

impl RleEncoder {
    pub fn new(bit_width: u8) -> RleEncoder {
        RleEncoder {
            bit_width,
            out: Vec::new(),
            literals: Vec::new(),
        }
    }

    pub fn encode(bit_width: u8, values: &[u32]) -> Vec<u8> {
        let mut encoder = RleEncoder::new(bit_width);
        encoder.put(values);
        encoder.finish()
    }

    pub fn put(&mut self, values: &[u32]) {
        let mut i = 0;
        while i < values.len() {
            let value = values[i];
            let run = values[i..].iter().take_while(|&&v| v == value).count();
            if run >= 8 && self.literals.len() % 8 == 0 {
                self.flush_literals();
                self.write_repeated(value, run);
                i += run;
            } else {
                self.literals.push(value);
                i += 1;
            }
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.flush_literals();
        self.out
    }

    fn write_repeated(&mut self, value: u32, count: usize) {
        write_uleb128(&mut self.out, (count as u64) << 1);
        let width = (self.bit_width as usize).div_ceil(8);
        self.out.extend_from_slice(&value.to_le_bytes()[..width]);
    }

    fn flush_literals(&mut self) {
        if self.literals.is_empty() {
            return;
        }
        let groups = self.literals.len().div_ceil(8);
        self.literals.resize(groups * 8, 0);
        write_uleb128(&mut self.out, ((groups as u64) << 1) | 1);
        pack(
            &mut self.out,
            self.literals.iter().map(|&v| u64::from(v)),
            self.bit_width,
        );
        self.literals.clear();
    }
}

pub fn write_uleb128(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(data: &[u8], bit_width: u8, count: usize) -> Vec<u32> {
        let mut decoder = RleDecoder::new(data, bit_width).unwrap();
        let mut out = vec![0u32; count];
        let n = decoder.read(&mut out).unwrap();
        assert_eq!(n, count);
        out
    }

    #[test]
    fn test_bit_width() {
        assert_eq!(bit_width(0), 0);
        assert_eq!(bit_width(1), 1);
        assert_eq!(bit_width(2), 2);
        assert_eq!(bit_width(7), 3);
        assert_eq!(bit_width(8), 4);
        assert_eq!(bit_width(127), 7);
    }

    #[test]
    fn test_rle_run() {
        // 10 copies of value 3, bit width 2.
        let data = [20u8, 3];
        assert_eq!(decode_all(&data, 2, 10), vec![3; 10]);
    }

    #[test]
    fn test_bit_packed_run() {
        // One group: values 0..8 with bit width 3.
        let data = [3u8, 0x88, 0xc6, 0xfa];
        assert_eq!(decode_all(&data, 3, 8), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_round_trip_random() {
        for bit_width in [1u8, 2, 5, 8, 13, 20, 32] {
            let max = if bit_width == 32 {
                u32::MAX
            } else {
                (1u32 << bit_width) - 1
            };
            let mut values = Vec::new();
            while values.len() < 1000 {
                let value = fastrand::u32(0..=max);
                let repeat = if fastrand::bool() {
                    fastrand::usize(1..30)
                } else {
                    1
                };
                values.extend(std::iter::repeat_n(value, repeat));
            }
            let encoded = RleEncoder::encode(bit_width, &values);
            let decoded = decode_all(&encoded, bit_width, values.len());
            assert_eq!(decoded, values, "bit width {bit_width}");
        }
    }

    #[test]
    fn test_batched_reads() {
        let values: Vec<u32> = (0..100).map(|i| (i / 10) % 4).collect();
        let encoded = RleEncoder::encode(2, &values);
        let mut decoder = RleDecoder::new(&encoded, 2).unwrap();
        let mut decoded = Vec::new();
        let mut batch = [0u32; 7];
        while decoded.len() < values.len() {
            let n = decoder.read(&mut batch).unwrap();
            assert!(n > 0);
            decoded.extend_from_slice(&batch[..n]);
        }
        decoded.truncate(values.len());
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_zero_bit_width() {
        let encoded = RleEncoder::encode(0, &[0; 20]);
        assert_eq!(decode_all(&encoded, 0, 20), vec![0; 20]);
    }

    #[test]
    fn test_truncated_stream() {
        // Bit-packed run of 2 groups with bit width 4 needs 8 bytes, only 3 present.
        let data = [5u8, 1, 2, 3];
        let mut decoder = RleDecoder::new(&data, 4).unwrap();
        let mut out = [0u32; 16];
        assert!(decoder.read(&mut out).unwrap_err().is_corruption());

        // RLE run header without its value.
        let data = [20u8];
        let mut decoder = RleDecoder::new(&data, 2).unwrap();
        assert!(decoder.read(&mut out).is_err());
    }

    #[test]
    fn test_exhausted_stream() {
        let encoded = RleEncoder::encode(1, &[1, 1, 1, 1, 1, 1, 1, 1, 1]);
        let mut decoder = RleDecoder::new(&encoded, 1).unwrap();
        let mut out = [0u32; 32];
        assert_eq!(decoder.read(&mut out).unwrap(), 9);
        assert_eq!(decoder.read(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_oversized_packed_run() {
        // Bit-packed header with a group count whose value count overflows. Groups of
        // width zero occupy no bytes, so only the count can reject it.
        let data = [0xffu8, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        let mut decoder = RleDecoder::new(&data, 0).unwrap();
        let mut out = [0u32; 8];
        let err = decoder.read(&mut out).unwrap_err();
        assert!(err.is_corruption());

        // A large but representable count of zero-width groups decodes lazily.
        let mut data = Vec::new();
        write_uleb128(&mut data, (1u64 << 40) | 1);
        let mut decoder = RleDecoder::new(&data, 0).unwrap();
        assert_eq!(decoder.read(&mut out).unwrap(), 8);
        assert_eq!(out, [0; 8]);
    }

    #[test]
    fn test_invalid_bit_width() {
        assert!(RleDecoder::new(&[], 33).is_err());
    }
}
