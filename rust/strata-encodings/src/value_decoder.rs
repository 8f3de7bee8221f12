//! Decoding of the value section of a data page.

use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use strata_common::{Result, error::Error};
use strata_format::{
    defs::Encoding,
    value::{Kind, Value},
};

use crate::{delta::DeltaDecoder, dictionary::Dictionary, plain::PlainDecoder, rle::RleDecoder};

/// Decoder of the non-null values of one column, re-targeted at each page with
/// [`ValueDecoder::reset`].
///
/// The concrete decoder is picked from the column kind and the page encoding:
/// - `PLAIN` for every kind,
/// - `RLE` (length-prefixed, bit width 1) for booleans,
/// - `DELTA_BINARY_PACKED` for 32- and 64-bit integers,
/// - `RLE_DICTIONARY` (and the legacy `PLAIN_DICTIONARY`) for dictionary indices,
/// - columns without a kind decode every value as null.
#[derive(Debug)]
pub struct ValueDecoder<'a> {
    kind: Option<Kind>,
    column: u16,
    type_length: Option<usize>,
    dictionary: Option<Arc<dyn Dictionary>>,
    remaining: usize,
    variant: Variant<'a>,
}

#[derive(Debug)]
enum Variant<'a> {
    Empty,
    Null,
    Plain(PlainDecoder<'a>),
    RleBoolean {
        decoder: RleDecoder<'a>,
        scratch: Vec<u32>,
    },
    Delta {
        decoder: DeltaDecoder<'a>,
        scratch: Vec<i64>,
    },
    Indexed {
        decoder: RleDecoder<'a>,
        scratch: Vec<u32>,
        indexes: Vec<i32>,
    },
}

impl<'a> ValueDecoder<'a> {
    pub fn new(
        kind: Option<Kind>,
        column: u16,
        type_length: Option<usize>,
        dictionary: Option<Arc<dyn Dictionary>>,
    ) -> ValueDecoder<'a> {
        ValueDecoder {
            kind,
            column,
            type_length,
            dictionary,
            remaining: 0,
            variant: Variant::Empty,
        }
    }

    pub fn kind(&self) -> Option<Kind> {
        self.kind
    }

    pub fn column(&self) -> u16 {
        self.column
    }

    /// Number of values left in the current page.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self.variant, Variant::Indexed { .. })
    }

    pub fn set_dictionary(&mut self, dictionary: Option<Arc<dyn Dictionary>>) {
        self.dictionary = dictionary;
    }

    /// Points the decoder at the value section of a new page holding `num_values`
    /// non-null values in `encoding`.
    pub fn reset(&mut self, encoding: Encoding, data: &'a [u8], num_values: usize) -> Result<()> {
        self.remaining = num_values;
        let Some(kind) = self.kind else {
            self.variant = Variant::Null;
            return Ok(());
        };
        self.variant = match (encoding.normalize_data(), kind) {
            (Encoding::RleDictionary, _) => {
                if self.dictionary.is_none() {
                    return Err(Error::invalid_format(
                        "data page",
                        "dictionary-encoded page without a dictionary",
                    ));
                }
                let decoder = match data.split_first() {
                    Some((&bit_width, indexes)) => RleDecoder::new(indexes, bit_width)?,
                    None if num_values == 0 => RleDecoder::new(&[], 0)?,
                    None => return Err(Error::unexpected_eof("dictionary index bit width")),
                };
                Variant::Indexed {
                    decoder,
                    scratch: Vec::new(),
                    indexes: Vec::new(),
                }
            }
            (Encoding::Plain, kind) => {
                Variant::Plain(PlainDecoder::new(kind, self.type_length, data)?)
            }
            (Encoding::Rle, Kind::Boolean) => {
                if data.len() < 4 {
                    return Err(Error::unexpected_eof("boolean run length"));
                }
                let len = LittleEndian::read_u32(&data[..4]) as usize;
                let runs = data[4..]
                    .get(..len)
                    .ok_or_else(|| Error::unexpected_eof("boolean runs"))?;
                Variant::RleBoolean {
                    decoder: RleDecoder::new(runs, 1)?,
                    scratch: Vec::new(),
                }
            }
            (Encoding::DeltaBinaryPacked, Kind::Int32 | Kind::Int64) => Variant::Delta {
                decoder: DeltaDecoder::new(kind, data)?,
                scratch: Vec::new(),
            },
            (encoding, kind) => {
                return Err(Error::not_implemented(format!(
                    "{encoding:?} encoding of {kind:?} values"
                )));
            }
        };
        Ok(())
    }

    /// Decodes up to `out.len()` values of the current page, tagging them with the
    /// column ordinal. Returns 0 once the page's values are exhausted; a count short
    /// of `min(out.len(), remaining)` means the value data ended early.
    pub fn read_values(&mut self, out: &mut [Value]) -> Result<usize> {
        let want = out.len().min(self.remaining);
        let out = &mut out[..want];
        let n = match &mut self.variant {
            Variant::Empty => 0,
            Variant::Null => {
                out.fill(Value::null());
                want
            }
            Variant::Plain(decoder) => decoder.read(out)?,
            Variant::RleBoolean { decoder, scratch } => {
                scratch.resize(want, 0);
                let n = decoder.read(scratch)?;
                for (slot, &bit) in out.iter_mut().zip(&scratch[..n]) {
                    *slot = Value::boolean(bit != 0);
                }
                n
            }
            Variant::Delta { decoder, scratch } => {
                scratch.resize(want, 0);
                let n = decoder.read(scratch)?;
                let narrow = self.kind == Some(Kind::Int32);
                for (slot, &v) in out.iter_mut().zip(&scratch[..n]) {
                    *slot = if narrow {
                        Value::int32(v as i32)
                    } else {
                        Value::int64(v)
                    };
                }
                n
            }
            Variant::Indexed {
                decoder,
                scratch,
                indexes,
            } => {
                let n = read_indexes(decoder, scratch, indexes, want)?;
                let Some(dictionary) = self.dictionary.as_ref() else {
                    return Err(Error::invalid_format(
                        "data page",
                        "dictionary-encoded page without a dictionary",
                    ));
                };
                dictionary.lookup(&indexes[..n], &mut out[..n])?;
                n
            }
        };
        for value in &mut out[..n] {
            value.set_column(self.column);
        }
        self.remaining -= n;
        Ok(n)
    }

    /// Reads up to `max` raw dictionary indexes of the current page into `out`
    /// without resolving them.
    pub fn read_indexes(&mut self, out: &mut Vec<i32>, max: usize) -> Result<usize> {
        let want = max.min(self.remaining);
        let Variant::Indexed {
            decoder, scratch, ..
        } = &mut self.variant
        else {
            return Err(Error::invalid_operation(
                "read_indexes on a page that is not dictionary-encoded",
            ));
        };
        let n = read_indexes(decoder, scratch, out, want)?;
        self.remaining -= n;
        Ok(n)
    }

    pub fn dictionary(&self) -> Option<&Arc<dyn Dictionary>> {
        self.dictionary.as_ref()
    }
}

fn read_indexes(
    decoder: &mut RleDecoder,
    scratch: &mut Vec<u32>,
    indexes: &mut Vec<i32>,
    count: usize,
) -> Result<usize> {
    scratch.resize(count, 0);
    let n = decoder.read(scratch)?;
    indexes.clear();
    // Indexes beyond i32::MAX wrap to negative values and fail the dictionary range
    // check.
    indexes.extend(scratch[..n].iter().map(|&i| i as i32));
    Ok(n)
}
