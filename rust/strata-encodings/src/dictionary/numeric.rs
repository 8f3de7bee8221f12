use std::cmp::Ordering;

use ahash::AHashMap;
use strata_common::Result;
use strata_format::value::{Datum, Kind, Value};

use super::{
    Dictionary, bounds_positions, check_index, check_insert, check_lookup, kind_mismatch,
    position,
};

/// Primitive entry type of a [`NumericDictionary`].
pub trait NumericEntry: Copy + Send + Sync + std::fmt::Debug + 'static {
    const KIND: Kind;

    fn from_value(value: &Value) -> Option<Self>;

    fn to_value(self) -> Value;

    /// Identity of the entry in the reverse index: its bit pattern.
    fn key(self) -> u64;

    fn compare(self, other: Self) -> Ordering;
}

macro_rules! impl_numeric_entry {
    ($ty:ty, $kind:ident, $ctor:ident, |$v:ident| $key:expr, $cmp:expr) => {
        impl NumericEntry for $ty {
            const KIND: Kind = Kind::$kind;

            fn from_value(value: &Value) -> Option<Self> {
                match value.datum() {
                    Datum::$kind(v) => Some(*v),
                    _ => None,
                }
            }

            fn to_value(self) -> Value {
                Value::$ctor(self)
            }

            fn key(self) -> u64 {
                let $v = self;
                $key
            }

            fn compare(self, other: Self) -> Ordering {
                $cmp(self, other)
            }
        }
    };
}

impl_numeric_entry!(i32, Int32, int32, |v| v as u32 as u64, |a: i32, b: i32| a.cmp(&b));
impl_numeric_entry!(i64, Int64, int64, |v| v as u64, |a: i64, b: i64| a.cmp(&b));
impl_numeric_entry!(f32, Float, float, |v| v.to_bits() as u64, compare_float::<f32>);
impl_numeric_entry!(f64, Double, double, |v| v.to_bits(), compare_float::<f64>);

fn compare_float<T: PartialOrd>(a: T, b: T) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Dictionary of fixed-width numeric values.
///
/// Entries are deduplicated by bit pattern, so `0.0` and `-0.0` are distinct entries
/// and NaN payloads are kept apart.
#[derive(Debug)]
pub struct NumericDictionary<T: NumericEntry> {
    entries: Vec<T>,
    index: Option<AHashMap<u64, u32>>,
}

pub type Int32Dictionary = NumericDictionary<i32>;
pub type Int64Dictionary = NumericDictionary<i64>;
pub type FloatDictionary = NumericDictionary<f32>;
pub type DoubleDictionary = NumericDictionary<f64>;

impl<T: NumericEntry> NumericDictionary<T> {
    pub fn new() -> NumericDictionary<T> {
        NumericDictionary {
            entries: Vec::new(),
            index: None,
        }
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub(super) fn append(&mut self, values: &[Value]) -> Result<()> {
        for value in values {
            let entry = T::from_value(value).ok_or_else(|| kind_mismatch(T::KIND, value))?;
            position(self.entries.len())?;
            self.entries.push(entry);
        }
        self.index = None;
        Ok(())
    }

    fn build_index(&self) -> AHashMap<u64, u32> {
        let mut index = AHashMap::with_capacity(self.entries.len());
        for (pos, entry) in self.entries.iter().enumerate() {
            index.entry(entry.key()).or_insert(pos as u32);
        }
        index
    }
}

impl<T: NumericEntry> Default for NumericDictionary<T> {
    fn default() -> Self {
        NumericDictionary::new()
    }
}

impl<T: NumericEntry> Dictionary for NumericDictionary<T> {
    fn kind(&self) -> Kind {
        T::KIND
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn value(&self, index: i32) -> Result<Value> {
        let pos = check_index(index, self.entries.len())?;
        Ok(self.entries[pos].to_value())
    }

    fn insert(&mut self, values: &[Value], indexes: &mut [i32]) -> Result<()> {
        check_insert(values, indexes)?;
        let mut index = match self.index.take() {
            Some(index) => index,
            None => self.build_index(),
        };
        let mut result = Ok(());
        for (value, slot) in values.iter().zip(indexes.iter_mut()) {
            let Some(entry) = T::from_value(value) else {
                result = Err(kind_mismatch(T::KIND, value));
                break;
            };
            let pos = match index.get(&entry.key()) {
                Some(&pos) => pos,
                None => match position(self.entries.len()) {
                    Ok(pos) => {
                        self.entries.push(entry);
                        index.insert(entry.key(), pos);
                        pos
                    }
                    Err(e) => {
                        result = Err(e);
                        break;
                    }
                },
            };
            *slot = pos as i32;
        }
        self.index = Some(index);
        result
    }

    fn lookup(&self, indexes: &[i32], values: &mut [Value]) -> Result<()> {
        check_lookup(indexes, values, self.entries.len())?;
        for (&index, value) in indexes.iter().zip(values.iter_mut()) {
            *value = self.entries[index as usize].to_value();
        }
        Ok(())
    }

    fn bounds(&self, indexes: &[i32]) -> Result<Option<(Value, Value)>> {
        let positions = bounds_positions(indexes, self.entries.len(), |a, b| {
            self.entries[a].compare(self.entries[b])
        })?;
        Ok(positions.map(|(min, max)| (self.entries[min].to_value(), self.entries[max].to_value())))
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.index = None;
    }
}
