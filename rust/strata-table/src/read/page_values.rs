//! Interleaving of decoded values with repetition and definition levels.

use strata_common::{Result, error::Error};
use strata_encodings::{LevelStream, ValueDecoder};
use strata_format::value::Value;

/// Reader of the values of one data page.
///
/// For columns with levels, every output slot carries the repetition and definition
/// level of its position; slots whose definition level is below the column's max are
/// null placeholders tagged with the column ordinal. Columns without levels read
/// straight from the value decoder.
#[derive(Debug)]
pub struct PageValues<'a> {
    column: u16,
    max_definition_level: u8,
    has_levels: bool,
    repetition_levels: LevelStream<'a>,
    definition_levels: LevelStream<'a>,
    decoder: ValueDecoder<'a>,
    /// Values (including nulls) left in the page.
    remaining: usize,
}

impl<'a> PageValues<'a> {
    pub fn new(
        column: u16,
        max_repetition_level: u8,
        max_definition_level: u8,
        repetition_levels: LevelStream<'a>,
        definition_levels: LevelStream<'a>,
        decoder: ValueDecoder<'a>,
        num_values: usize,
    ) -> PageValues<'a> {
        PageValues {
            column,
            max_definition_level,
            has_levels: max_repetition_level > 0 || max_definition_level > 0,
            repetition_levels,
            definition_levels,
            decoder,
            remaining: num_values,
        }
    }

    /// Number of values (including nulls) not yet read.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Reads up to `out.len()` values. Returns 0 once the page is exhausted.
    pub fn read_values(&mut self, out: &mut [Value]) -> Result<usize> {
        if self.remaining == 0 || out.is_empty() {
            return Ok(0);
        }
        if !self.has_levels {
            return self.read_plain(out);
        }

        let reps = self.repetition_levels.peek()?;
        let defs = self.definition_levels.peek()?;
        let n = out.len().min(self.remaining).min(reps.len()).min(defs.len());
        if n == 0 {
            return Err(Error::unexpected_eof("page levels"));
        }
        let (reps, defs) = (&reps[..n], &defs[..n]);
        let max_def = self.max_definition_level;
        let count = defs.iter().filter(|&&d| d == max_def).count();

        let read = self.decoder.read_values(&mut out[..count])?;
        if read < count {
            return Err(Error::unexpected_eof(format!(
                "page values: expected {count}, decoded {read}"
            )));
        }

        // Real values occupy out[..count]; walking back to front moves each one to the
        // last slot with a max definition level at or before its position.
        let mut j = count;
        for i in (0..n).rev() {
            if defs[i] == max_def {
                j -= 1;
                out.swap(i, j);
            } else {
                out[i] = Value::null().with_column(self.column);
            }
            out[i].set_levels(reps[i], defs[i]);
        }

        self.repetition_levels.discard(n);
        self.definition_levels.discard(n);
        self.remaining -= n;
        Ok(n)
    }

    fn read_plain(&mut self, out: &mut [Value]) -> Result<usize> {
        let want = out.len().min(self.remaining);
        let n = self.decoder.read_values(&mut out[..want])?;
        if n == 0 {
            return Err(Error::unexpected_eof(format!(
                "page values: {} values missing",
                self.remaining
            )));
        }
        for value in &mut out[..n] {
            value.set_levels(0, 0);
        }
        self.remaining -= n;
        Ok(n)
    }

    /// Appends the remaining values of the page to `out`.
    pub fn read_to_end(&mut self, out: &mut Vec<Value>, batch_size: usize) -> Result<()> {
        let batch_size = batch_size.max(1);
        while self.remaining > 0 {
            let start = out.len();
            out.resize(start + batch_size.min(self.remaining), Value::null());
            let n = self.read_values(&mut out[start..])?;
            out.truncate(start + n);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use strata_encodings::rle::{RleEncoder, bit_width};
    use strata_format::{defs::Encoding, value::Kind};

    use super::*;

    struct Encoded {
        reps: Vec<u8>,
        defs: Vec<u8>,
        values: Vec<u8>,
    }

    fn encode(levels: &[(u8, u8)], max_rep: u8, max_def: u8) -> Encoded {
        let reps: Vec<u32> = levels.iter().map(|&(r, _)| r as u32).collect();
        let defs: Vec<u32> = levels.iter().map(|&(_, d)| d as u32).collect();
        let values: Vec<Value> = levels
            .iter()
            .enumerate()
            .filter(|(_, (_, d))| *d == max_def)
            .map(|(i, _)| Value::int32(i as i32))
            .collect();
        let mut data = Vec::new();
        strata_encodings::plain::encode(Kind::Int32, &values, &mut data).unwrap();
        Encoded {
            reps: RleEncoder::encode(bit_width(max_rep as u64), &reps),
            defs: RleEncoder::encode(bit_width(max_def as u64), &defs),
            values: data,
        }
    }

    fn reader<'a>(
        encoded: &'a Encoded,
        num_values: usize,
        max_rep: u8,
        max_def: u8,
        batch: usize,
    ) -> PageValues<'a> {
        let mut decoder = ValueDecoder::new(Some(Kind::Int32), 2, None, None);
        decoder
            .reset(Encoding::Plain, &encoded.values, num_values)
            .unwrap();
        PageValues::new(
            2,
            max_rep,
            max_def,
            LevelStream::new(&encoded.reps, max_rep, num_values, batch).unwrap(),
            LevelStream::new(&encoded.defs, max_def, num_values, batch).unwrap(),
            decoder,
            num_values,
        )
    }

    #[test]
    fn test_null_interleaving() {
        let max_rep = 1;
        let max_def = 2;
        for _ in 0..20 {
            let levels: Vec<(u8, u8)> = (0..300)
                .map(|i| {
                    let rep = if i == 0 { 0 } else { fastrand::u8(0..=max_rep) };
                    (rep, fastrand::u8(0..=max_def))
                })
                .collect();
            let encoded = encode(&levels, max_rep, max_def);
            let batch = fastrand::usize(1..64);
            let mut page = reader(&encoded, levels.len(), max_rep, max_def, batch);

            let mut values = Vec::new();
            page.read_to_end(&mut values, fastrand::usize(1..50)).unwrap();
            assert_eq!(values.len(), levels.len());
            for (i, (value, &(rep, def))) in values.iter().zip(&levels).enumerate() {
                assert_eq!(value.repetition_level(), rep);
                assert_eq!(value.definition_level(), def);
                assert_eq!(value.column(), 2);
                if def == max_def {
                    assert_eq!(value.as_i32(), Some(i as i32));
                } else {
                    assert!(value.is_null());
                }
            }
            let mut out = vec![Value::null(); 4];
            assert_eq!(page.read_values(&mut out).unwrap(), 0);
        }
    }

    #[test]
    fn test_all_nulls() {
        let levels = vec![(0u8, 0u8); 10];
        let encoded = encode(&levels, 0, 1);
        let mut page = reader(&encoded, 10, 0, 1, 4);
        let mut values = Vec::new();
        page.read_to_end(&mut values, 3).unwrap();
        assert_eq!(values.len(), 10);
        assert!(values.iter().all(|v| v.is_null() && v.column() == 2));
    }

    #[test]
    fn test_missing_values() {
        let levels = vec![(0u8, 1u8); 10];
        let mut encoded = encode(&levels, 0, 1);
        encoded.values.truncate(5 * 4);
        let mut page = reader(&encoded, 10, 0, 1, 16);
        let mut out = vec![Value::null(); 10];
        assert!(page.read_values(&mut out).unwrap_err().is_corruption());
    }

    #[test]
    fn test_without_levels() {
        let levels = vec![(0u8, 0u8); 7];
        let encoded = encode(&levels, 0, 0);
        let mut page = reader(&encoded, 7, 0, 0, 16);
        let mut values = Vec::new();
        page.read_to_end(&mut values, 5).unwrap();
        let ints: Vec<Option<i32>> = values.iter().map(Value::as_i32).collect();
        assert_eq!(ints, (0..7).map(Some).collect::<Vec<_>>());
    }
}
