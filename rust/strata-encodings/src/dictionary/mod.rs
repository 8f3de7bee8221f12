//! Dictionaries: ordered, append-only sets of distinct values addressed by position.
//!
//! Data pages of a dictionary-encoded column chunk store `i32` positions into the
//! dictionary decoded from the chunk's dictionary page. The encode side
//! ([`Dictionary::insert`]) deduplicates values through a reverse index of value
//! hashes that is only built on first insertion.

mod byte_array;
mod fixed_len;
mod numeric;

use std::cmp::Ordering;

use ahash::AHashMap;
use strata_common::{Result, error::Error};
use strata_format::{
    defs::Encoding,
    value::{Kind, Value},
};
use tinyvec::TinyVec;

use crate::plain::PlainDecoder;

pub use byte_array::ByteArrayDictionary;
pub use fixed_len::FixedLenByteArrayDictionary;
pub use numeric::{
    DoubleDictionary, FloatDictionary, Int32Dictionary, Int64Dictionary, NumericDictionary,
    NumericEntry,
};

pub trait Dictionary: Send + Sync + std::fmt::Debug {
    /// Kind of the values held by the dictionary.
    fn kind(&self) -> Kind;

    /// Number of distinct entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an owned copy of the entry at position `index`.
    fn value(&self, index: i32) -> Result<Value>;

    /// Writes the position of each value to `indexes`, appending values not seen
    /// before. `indexes` must be at least as long as `values` and every value must be
    /// a non-null value of the dictionary kind.
    fn insert(&mut self, values: &[Value], indexes: &mut [i32]) -> Result<()>;

    /// Overwrites `values[i]` with the entry at `indexes[i]`. Every index is validated
    /// before any value is written.
    fn lookup(&self, indexes: &[i32], values: &mut [Value]) -> Result<()>;

    /// Minimum and maximum of the entries referenced by `indexes`, in a single pass
    /// over the entries. `None` when `indexes` is empty.
    fn bounds(&self, indexes: &[i32]) -> Result<Option<(Value, Value)>>;

    /// Drops all entries and the reverse index.
    fn reset(&mut self);
}

/// Decodes the values of a dictionary page into a new dictionary.
///
/// Values are decoded until `num_values` entries are read or the page data ends.
pub fn read_dictionary(
    kind: Kind,
    type_length: Option<usize>,
    encoding: Encoding,
    data: &[u8],
    num_values: usize,
) -> Result<Box<dyn Dictionary>> {
    let encoding = encoding.normalize_dictionary();
    if encoding != Encoding::Plain {
        return Err(Error::not_implemented(format!(
            "dictionary page encoding {encoding:?}"
        )));
    }

    let mut dictionary = new_dictionary(kind, type_length)?;
    let mut decoder = PlainDecoder::new(kind, type_length, data)?;
    let mut batch = vec![Value::null(); num_values.min(1024)];
    let mut remaining = num_values;
    while remaining > 0 {
        let want = remaining.min(batch.len());
        let n = decoder.read(&mut batch[..want])?;
        if n == 0 {
            break;
        }
        dictionary.append(&batch[..n])?;
        remaining -= n;
    }
    if remaining > 0 {
        log::debug!(
            "{kind:?} dictionary page ended after {} of {num_values} declared values",
            num_values - remaining
        );
    }
    Ok(dictionary.into_dyn())
}

/// Creates an empty dictionary for values of `kind`.
pub fn empty_dictionary(kind: Kind, type_length: Option<usize>) -> Result<Box<dyn Dictionary>> {
    Ok(new_dictionary(kind, type_length)?.into_dyn())
}

enum AnyDictionary {
    ByteArray(ByteArrayDictionary),
    FixedLen(FixedLenByteArrayDictionary),
    Int32(Int32Dictionary),
    Int64(Int64Dictionary),
    Float(FloatDictionary),
    Double(DoubleDictionary),
}

impl AnyDictionary {
    fn append(&mut self, values: &[Value]) -> Result<()> {
        match self {
            AnyDictionary::ByteArray(d) => d.append(values),
            AnyDictionary::FixedLen(d) => d.append(values),
            AnyDictionary::Int32(d) => d.append(values),
            AnyDictionary::Int64(d) => d.append(values),
            AnyDictionary::Float(d) => d.append(values),
            AnyDictionary::Double(d) => d.append(values),
        }
    }

    fn into_dyn(self) -> Box<dyn Dictionary> {
        match self {
            AnyDictionary::ByteArray(d) => Box::new(d),
            AnyDictionary::FixedLen(d) => Box::new(d),
            AnyDictionary::Int32(d) => Box::new(d),
            AnyDictionary::Int64(d) => Box::new(d),
            AnyDictionary::Float(d) => Box::new(d),
            AnyDictionary::Double(d) => Box::new(d),
        }
    }
}

fn new_dictionary(kind: Kind, type_length: Option<usize>) -> Result<AnyDictionary> {
    let dictionary = match kind {
        Kind::ByteArray => AnyDictionary::ByteArray(ByteArrayDictionary::new()),
        Kind::FixedLenByteArray => {
            let len = type_length.ok_or_else(|| {
                Error::invalid_arg("type_length", "fixed-length byte array requires a length")
            })?;
            AnyDictionary::FixedLen(FixedLenByteArrayDictionary::new(len))
        }
        Kind::Int32 => AnyDictionary::Int32(Int32Dictionary::new()),
        Kind::Int64 => AnyDictionary::Int64(Int64Dictionary::new()),
        Kind::Float => AnyDictionary::Float(FloatDictionary::new()),
        Kind::Double => AnyDictionary::Double(DoubleDictionary::new()),
        Kind::Boolean => return Err(Error::not_implemented("boolean dictionary")),
    };
    Ok(dictionary)
}

/// Hash-keyed reverse index of dictionary entries. Colliding hashes keep all of
/// their positions; callers resolve them by comparing the stored entries.
#[derive(Debug, Default)]
struct ReverseIndex {
    hasher: ahash::RandomState,
    slots: AHashMap<u64, TinyVec<[u32; 2]>>,
}

impl ReverseIndex {
    fn hash(&self, bytes: &[u8]) -> u64 {
        self.hasher.hash_one(bytes)
    }

    fn find(&self, hash: u64, is_match: impl Fn(u32) -> bool) -> Option<u32> {
        self.slots
            .get(&hash)?
            .iter()
            .copied()
            .find(|&pos| is_match(pos))
    }

    fn insert(&mut self, hash: u64, pos: u32) {
        self.slots.entry(hash).or_default().push(pos);
    }
}

fn check_index(index: i32, len: usize) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or_else(|| {
            Error::out_of_range(
                "dictionary index",
                format!("index {index} out of range for dictionary of length {len}"),
            )
        })
}

fn check_lookup(indexes: &[i32], values: &[Value], len: usize) -> Result<()> {
    if values.len() < indexes.len() {
        return Err(Error::invalid_arg(
            "values",
            format!(
                "output holds {} values, {} indexes given",
                values.len(),
                indexes.len()
            ),
        ));
    }
    for &index in indexes {
        check_index(index, len)?;
    }
    Ok(())
}

fn check_insert(values: &[Value], indexes: &[i32]) -> Result<()> {
    if indexes.len() < values.len() {
        return Err(Error::invalid_arg(
            "indexes",
            format!(
                "output holds {} indexes, {} values given",
                indexes.len(),
                values.len()
            ),
        ));
    }
    Ok(())
}

fn position(len: usize) -> Result<u32> {
    u32::try_from(len)
        .ok()
        .filter(|&pos| pos < i32::MAX as u32)
        .ok_or_else(|| Error::invalid_operation("dictionary is full"))
}

fn kind_mismatch(kind: Kind, value: &Value) -> Error {
    Error::invalid_arg(
        "values",
        format!("expected a {kind:?} value, got {:?}", value.datum()),
    )
}

/// Positions of the minimum and maximum entries referenced by `indexes` under `cmp`.
fn bounds_positions(
    indexes: &[i32],
    len: usize,
    cmp: impl Fn(usize, usize) -> Ordering,
) -> Result<Option<(usize, usize)>> {
    let Some((&first, rest)) = indexes.split_first() else {
        return Ok(None);
    };
    let first = check_index(first, len)?;
    let (mut min, mut max) = (first, first);
    for &index in rest {
        let i = check_index(index, len)?;
        if cmp(i, min) == Ordering::Less {
            min = i;
        }
        if cmp(i, max) == Ordering::Greater {
            max = i;
        }
    }
    Ok(Some((min, max)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_values(kind: Kind, count: usize, distinct: usize) -> Vec<Value> {
        (0..count)
            .map(|_| {
                let n = fastrand::usize(0..distinct);
                match kind {
                    Kind::ByteArray => Value::byte_array(format!("value-{n}").into_bytes()),
                    Kind::FixedLenByteArray => {
                        Value::fixed_len_byte_array((n as u32).to_be_bytes().to_vec())
                    }
                    Kind::Int32 => Value::int32(n as i32 - 50),
                    Kind::Int64 => Value::int64(n as i64 * 1000),
                    Kind::Float => Value::float(n as f32 / 4.0),
                    Kind::Double => Value::double(-(n as f64)),
                    Kind::Boolean => Value::boolean(n % 2 == 0),
                }
            })
            .collect()
    }

    fn distinct_count(values: &[Value]) -> usize {
        let mut distinct: Vec<&Value> = Vec::new();
        for value in values {
            if !distinct.contains(&value) {
                distinct.push(value);
            }
        }
        distinct.len()
    }

    #[test]
    fn test_insert_lookup_round_trip() {
        for kind in [
            Kind::ByteArray,
            Kind::FixedLenByteArray,
            Kind::Int32,
            Kind::Int64,
            Kind::Float,
            Kind::Double,
        ] {
            let mut dictionary = empty_dictionary(kind, Some(4)).unwrap();
            let values = random_values(kind, 500, 40);
            let mut indexes = vec![0i32; values.len()];
            dictionary.insert(&values, &mut indexes).unwrap();
            assert_eq!(dictionary.len(), distinct_count(&values), "{kind:?}");

            let mut decoded = vec![Value::null(); values.len()];
            dictionary.lookup(&indexes, &mut decoded).unwrap();
            assert_eq!(decoded, values, "{kind:?}");

            // Inserting again yields the same positions without growing.
            let len = dictionary.len();
            let mut again = vec![0i32; values.len()];
            dictionary.insert(&values, &mut again).unwrap();
            assert_eq!(again, indexes);
            assert_eq!(dictionary.len(), len);
        }
    }

    #[test]
    fn test_bounds() {
        for kind in [Kind::ByteArray, Kind::Int64, Kind::Double] {
            let mut dictionary = empty_dictionary(kind, None).unwrap();
            let values = random_values(kind, 200, 50);
            let mut indexes = vec![0i32; values.len()];
            dictionary.insert(&values, &mut indexes).unwrap();

            for _ in 0..20 {
                let start = fastrand::usize(0..values.len());
                let end = fastrand::usize(start + 1..=values.len());
                let subset = &values[start..end];
                let min = subset.iter().min_by(|a, b| a.compare(b)).unwrap();
                let max = subset.iter().max_by(|a, b| a.compare(b)).unwrap();
                let (lo, hi) = dictionary.bounds(&indexes[start..end]).unwrap().unwrap();
                assert_eq!(lo.compare(min), Ordering::Equal, "{kind:?}");
                assert_eq!(hi.compare(max), Ordering::Equal, "{kind:?}");
            }
            assert!(dictionary.bounds(&[]).unwrap().is_none());
        }
    }

    #[test]
    fn test_out_of_range() {
        let mut dictionary = empty_dictionary(Kind::ByteArray, None).unwrap();
        let mut indexes = [0i32; 2];
        dictionary
            .insert(
                &[Value::byte_array(b"a".to_vec()), Value::byte_array(b"b".to_vec())],
                &mut indexes,
            )
            .unwrap();
        let mut values = vec![Value::null(); 3];
        let err = dictionary.lookup(&[0, 1, 2], &mut values).unwrap_err();
        assert!(err.is_out_of_range());
        assert!(err.to_string().contains("index 2"));
        assert!(err.to_string().contains("length 2"));
        assert!(dictionary.lookup(&[-1], &mut values).unwrap_err().is_out_of_range());
        assert!(dictionary.value(5).unwrap_err().is_out_of_range());
        assert!(dictionary.bounds(&[0, 7]).unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_invalid_insert() {
        let mut dictionary = empty_dictionary(Kind::Int32, None).unwrap();
        let mut indexes = [0i32; 1];
        let values = [Value::int32(1), Value::int32(2)];
        assert!(!dictionary.insert(&values, &mut indexes).unwrap_err().is_corruption());
        assert!(dictionary.insert(&[Value::int64(1)], &mut indexes).is_err());
        assert!(dictionary.insert(&[Value::null()], &mut indexes).is_err());
        assert_eq!(dictionary.len(), 0);
    }

    #[test]
    fn test_insert_stops_at_invalid_value() {
        for (kind, type_length, valid, invalid) in [
            (
                Kind::FixedLenByteArray,
                Some(2),
                Value::fixed_len_byte_array(vec![1, 2]),
                Value::fixed_len_byte_array(vec![1, 2, 3]),
            ),
            (
                Kind::ByteArray,
                None,
                Value::byte_array(b"ab".to_vec()),
                Value::int32(7),
            ),
        ] {
            let mut dictionary = empty_dictionary(kind, type_length).unwrap();
            let mut indexes = [-1i32; 3];
            let values = [valid.clone(), invalid, valid.clone()];
            let err = dictionary.insert(&values, &mut indexes).unwrap_err();
            assert!(!err.is_corruption(), "{kind:?}");
            // Values before the failing one are kept and stay findable.
            assert_eq!(indexes, [0, -1, -1], "{kind:?}");
            assert_eq!(dictionary.len(), 1);
            dictionary.insert(&[valid.clone()], &mut indexes[..1]).unwrap();
            assert_eq!(indexes[0], 0);
            assert_eq!(dictionary.len(), 1);
        }
    }

    #[test]
    fn test_reset() {
        let mut dictionary = empty_dictionary(Kind::FixedLenByteArray, Some(2)).unwrap();
        let mut indexes = [0i32; 2];
        let values = [
            Value::fixed_len_byte_array(vec![1, 2]),
            Value::fixed_len_byte_array(vec![3, 4]),
        ];
        dictionary.insert(&values, &mut indexes).unwrap();
        assert_eq!(indexes, [0, 1]);
        dictionary.reset();
        assert!(dictionary.is_empty());
        dictionary.insert(&values[1..], &mut indexes).unwrap();
        assert_eq!(indexes[0], 0);
        assert_eq!(dictionary.value(0).unwrap(), values[1]);
    }

    #[test]
    fn test_read_dictionary_page() {
        let values: Vec<Value> = ["x", "yy", "zzz"]
            .iter()
            .map(|s| Value::byte_array(s.as_bytes().to_vec()))
            .collect();
        let mut data = Vec::new();
        crate::plain::encode(Kind::ByteArray, &values, &mut data).unwrap();

        let dictionary =
            read_dictionary(Kind::ByteArray, None, Encoding::PlainDictionary, &data, 3).unwrap();
        assert_eq!(dictionary.len(), 3);
        assert_eq!(dictionary.value(2).unwrap(), values[2]);

        // A declared count larger than the data stops at the end of the data.
        let dictionary = read_dictionary(Kind::ByteArray, None, Encoding::Plain, &data, 10).unwrap();
        assert_eq!(dictionary.len(), 3);

        assert!(read_dictionary(Kind::ByteArray, None, Encoding::Rle, &data, 3).is_err());
        assert!(read_dictionary(Kind::Boolean, None, Encoding::Plain, &[1], 1).is_err());
    }

    #[test]
    fn test_insert_after_load() {
        let mut data = Vec::new();
        crate::plain::encode(Kind::Int32, &[Value::int32(7), Value::int32(9)], &mut data).unwrap();
        let mut dictionary = read_dictionary(Kind::Int32, None, Encoding::Plain, &data, 2).unwrap();
        let mut indexes = [0i32; 3];
        dictionary
            .insert(&[Value::int32(9), Value::int32(11), Value::int32(7)], &mut indexes)
            .unwrap();
        assert_eq!(indexes, [1, 2, 0]);
    }
}
