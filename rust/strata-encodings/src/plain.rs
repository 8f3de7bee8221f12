//! Plain value encoding: little-endian primitives, LSB-first bit-packed booleans,
//! `u32`-length-prefixed byte arrays and fixed-stride byte arrays.

use byteorder::{ByteOrder, LittleEndian};
use strata_common::{Result, error::Error, verify_arg};
use strata_format::value::{Datum, Kind, Value};

/// Sequential decoder of plain-encoded values of one kind.
#[derive(Debug, Clone)]
pub struct PlainDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    /// Bit position for booleans.
    bit: usize,
    kind: Kind,
    type_length: usize,
}

impl<'a> PlainDecoder<'a> {
    pub fn new(kind: Kind, type_length: Option<usize>, data: &'a [u8]) -> Result<PlainDecoder<'a>> {
        let type_length = match kind {
            Kind::FixedLenByteArray => match type_length {
                Some(len) if len > 0 => len,
                _ => {
                    return Err(Error::invalid_arg(
                        "type_length",
                        "fixed-length byte array requires a positive type length",
                    ));
                }
            },
            _ => 0,
        };
        Ok(PlainDecoder {
            data,
            pos: 0,
            bit: 0,
            kind,
            type_length,
        })
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn is_exhausted(&self) -> bool {
        match self.kind {
            Kind::Boolean => self.bit >= self.data.len() * 8,
            _ => self.pos >= self.data.len(),
        }
    }

    /// Decodes up to `out.len()` values, overwriting the payload of each slot.
    ///
    /// Returns fewer values only when the input ends on a value boundary; a value
    /// cut in the middle is an `UnexpectedEof` error. Boolean streams carry padding
    /// bits, so their callers bound `out` by the declared value count.
    pub fn read(&mut self, out: &mut [Value]) -> Result<usize> {
        let mut n = 0;
        while n < out.len() && !self.is_exhausted() {
            let datum = self.next_datum()?;
            out[n] = Value::new(datum);
            n += 1;
        }
        Ok(n)
    }

    fn next_datum(&mut self) -> Result<Datum> {
        let datum = match self.kind {
            Kind::Boolean => {
                let byte = self.data[self.bit / 8];
                let value = (byte >> (self.bit % 8)) & 1 == 1;
                self.bit += 1;
                Datum::Boolean(value)
            }
            Kind::Int32 => Datum::Int32(LittleEndian::read_i32(self.take(4)?)),
            Kind::Int64 => Datum::Int64(LittleEndian::read_i64(self.take(8)?)),
            Kind::Float => Datum::Float(LittleEndian::read_f32(self.take(4)?)),
            Kind::Double => Datum::Double(LittleEndian::read_f64(self.take(8)?)),
            Kind::ByteArray => {
                let len = LittleEndian::read_u32(self.take(4)?) as usize;
                Datum::ByteArray(self.take(len)?.to_vec())
            }
            Kind::FixedLenByteArray => {
                Datum::FixedLenByteArray(self.take(self.type_length)?.to_vec())
            }
        };
        Ok(datum)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let data: &'a [u8] = self.data;
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| Error::unexpected_eof("plain value"))?;
        let bytes = &data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }
}

/// Appends the plain encoding of `values` to `out`. Every value must be a non-null
/// value of `kind`; fixed-length byte arrays must all have the same length.
pub fn encode(kind: Kind, values: &[Value], out: &mut Vec<u8>) -> Result<()> {
    if kind == Kind::Boolean {
        let start = out.len();
        out.resize(start + values.len().div_ceil(8), 0);
        for (i, value) in values.iter().enumerate() {
            let v = value
                .as_bool()
                .ok_or_else(|| kind_mismatch(kind, value))?;
            if v {
                out[start + i / 8] |= 1 << (i % 8);
            }
        }
        return Ok(());
    }

    let mut fixed_len = None;
    for value in values {
        match (kind, value.datum()) {
            (Kind::Int32, Datum::Int32(v)) => out.extend_from_slice(&v.to_le_bytes()),
            (Kind::Int64, Datum::Int64(v)) => out.extend_from_slice(&v.to_le_bytes()),
            (Kind::Float, Datum::Float(v)) => out.extend_from_slice(&v.to_le_bytes()),
            (Kind::Double, Datum::Double(v)) => out.extend_from_slice(&v.to_le_bytes()),
            (Kind::ByteArray, Datum::ByteArray(v)) => {
                let len = u32::try_from(v.len())
                    .map_err(|_| Error::invalid_arg("values", "byte array is too long"))?;
                out.extend_from_slice(&len.to_le_bytes());
                out.extend_from_slice(v);
            }
            (Kind::FixedLenByteArray, Datum::FixedLenByteArray(v)) => {
                let len = *fixed_len.get_or_insert(v.len());
                verify_arg!(values, v.len() == len);
                out.extend_from_slice(v);
            }
            _ => return Err(kind_mismatch(kind, value)),
        }
    }
    Ok(())
}

fn kind_mismatch(kind: Kind, value: &Value) -> Error {
    Error::invalid_arg(
        "values",
        format!("expected a {kind:?} value, got {:?}", value.datum()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(kind: Kind, type_length: Option<usize>, data: &[u8], count: usize) -> Vec<Value> {
        let mut decoder = PlainDecoder::new(kind, type_length, data).unwrap();
        let mut out = vec![Value::null(); count];
        let n = decoder.read(&mut out).unwrap();
        out.truncate(n);
        out
    }

    #[test]
    fn test_primitives() {
        let values: Vec<Value> = (0..100).map(|_| Value::int64(fastrand::i64(..))).collect();
        let mut buf = Vec::new();
        encode(Kind::Int64, &values, &mut buf).unwrap();
        assert_eq!(buf.len(), 800);
        assert_eq!(decode_all(Kind::Int64, None, &buf, 200), values);

        let values = vec![Value::double(1.5), Value::double(-0.25)];
        let mut buf = Vec::new();
        encode(Kind::Double, &values, &mut buf).unwrap();
        assert_eq!(decode_all(Kind::Double, None, &buf, 2), values);
    }

    #[test]
    fn test_booleans() {
        let values: Vec<Value> = (0..13).map(|i| Value::boolean(i % 3 == 0)).collect();
        let mut buf = Vec::new();
        encode(Kind::Boolean, &values, &mut buf).unwrap();
        assert_eq!(buf.len(), 2);
        assert_eq!(buf[0], 0b0100_1001);
        assert_eq!(decode_all(Kind::Boolean, None, &buf, 13), values);
    }

    #[test]
    fn test_byte_arrays() {
        let values = vec![
            Value::byte_array(b"abc".to_vec()),
            Value::byte_array(Vec::new()),
            Value::byte_array(b"xyz123".to_vec()),
        ];
        let mut buf = Vec::new();
        encode(Kind::ByteArray, &values, &mut buf).unwrap();
        assert_eq!(&buf[..7], &[3, 0, 0, 0, b'a', b'b', b'c']);
        assert_eq!(decode_all(Kind::ByteArray, None, &buf, 10), values);

        let values = vec![
            Value::fixed_len_byte_array(vec![1, 2]),
            Value::fixed_len_byte_array(vec![3, 4]),
        ];
        let mut buf = Vec::new();
        encode(Kind::FixedLenByteArray, &values, &mut buf).unwrap();
        assert_eq!(buf, vec![1, 2, 3, 4]);
        assert_eq!(decode_all(Kind::FixedLenByteArray, Some(2), &buf, 5), values);
    }

    #[test]
    fn test_truncated_value() {
        let mut decoder = PlainDecoder::new(Kind::Int32, None, &[1, 0, 0, 0, 2, 0]).unwrap();
        let mut out = vec![Value::null(); 2];
        assert!(decoder.read(&mut out).unwrap_err().is_corruption());

        let mut decoder = PlainDecoder::new(Kind::ByteArray, None, &[5, 0, 0, 0, b'a']).unwrap();
        assert!(decoder.read(&mut out).unwrap_err().is_corruption());
    }

    #[test]
    fn test_kind_mismatch() {
        let mut buf = Vec::new();
        let err = encode(Kind::Int32, &[Value::int64(1)], &mut buf).unwrap_err();
        assert!(!err.is_corruption());
        assert!(encode(Kind::Boolean, &[Value::null()], &mut buf).is_err());
        assert!(PlainDecoder::new(Kind::FixedLenByteArray, None, &[]).is_err());
    }
}
