//! Logical values produced by the read path.

use std::cmp::Ordering;

use byteorder::{ByteOrder, LittleEndian};
use strata_common::{Result, error::Error};

use crate::defs::PhysicalType;

/// Kind of a non-null value, one per supported physical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Boolean,
    Int32,
    Int64,
    Float,
    Double,
    ByteArray,
    FixedLenByteArray,
}

impl Kind {
    /// Maps a physical type to a value kind. Types without a value representation
    /// (`INT96`) yield `None` and are read as null-only columns.
    pub fn from_physical_type(physical_type: PhysicalType) -> Option<Kind> {
        match physical_type {
            PhysicalType::Boolean => Some(Kind::Boolean),
            PhysicalType::Int32 => Some(Kind::Int32),
            PhysicalType::Int64 => Some(Kind::Int64),
            PhysicalType::Int96 => None,
            PhysicalType::Float => Some(Kind::Float),
            PhysicalType::Double => Some(Kind::Double),
            PhysicalType::ByteArray => Some(Kind::ByteArray),
            PhysicalType::FixedLenByteArray => Some(Kind::FixedLenByteArray),
        }
    }

    pub fn physical_type(self) -> PhysicalType {
        match self {
            Kind::Boolean => PhysicalType::Boolean,
            Kind::Int32 => PhysicalType::Int32,
            Kind::Int64 => PhysicalType::Int64,
            Kind::Float => PhysicalType::Float,
            Kind::Double => PhysicalType::Double,
            Kind::ByteArray => PhysicalType::ByteArray,
            Kind::FixedLenByteArray => PhysicalType::FixedLenByteArray,
        }
    }

    /// Width in bytes of a plain-encoded value of this kind, for kinds with a
    /// fixed-width primitive representation.
    pub fn primitive_width(self) -> Option<usize> {
        match self {
            Kind::Int32 | Kind::Float => Some(4),
            Kind::Int64 | Kind::Double => Some(8),
            Kind::Boolean | Kind::ByteArray | Kind::FixedLenByteArray => None,
        }
    }
}

/// Payload of a [`Value`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Datum {
    #[default]
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<u8>),
    FixedLenByteArray(Vec<u8>),
}

/// A single value of a leaf column together with its repetition and definition
/// levels and the ordinal of the column it belongs to.
///
/// Values own their payload: once a value leaves a decode buffer it no longer
/// references page memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Value {
    datum: Datum,
    repetition_level: u8,
    definition_level: u8,
    column: u16,
}

impl Value {
    pub fn new(datum: Datum) -> Value {
        Value {
            datum,
            ..Default::default()
        }
    }

    pub fn null() -> Value {
        Value::default()
    }

    pub fn boolean(v: bool) -> Value {
        Value::new(Datum::Boolean(v))
    }

    pub fn int32(v: i32) -> Value {
        Value::new(Datum::Int32(v))
    }

    pub fn int64(v: i64) -> Value {
        Value::new(Datum::Int64(v))
    }

    pub fn float(v: f32) -> Value {
        Value::new(Datum::Float(v))
    }

    pub fn double(v: f64) -> Value {
        Value::new(Datum::Double(v))
    }

    pub fn byte_array(v: impl Into<Vec<u8>>) -> Value {
        Value::new(Datum::ByteArray(v.into()))
    }

    pub fn fixed_len_byte_array(v: impl Into<Vec<u8>>) -> Value {
        Value::new(Datum::FixedLenByteArray(v.into()))
    }

    pub fn with_levels(mut self, repetition_level: u8, definition_level: u8) -> Value {
        self.set_levels(repetition_level, definition_level);
        self
    }

    pub fn with_column(mut self, column: u16) -> Value {
        self.column = column;
        self
    }

    pub fn set_levels(&mut self, repetition_level: u8, definition_level: u8) {
        self.repetition_level = repetition_level;
        self.definition_level = definition_level;
    }

    pub fn set_column(&mut self, column: u16) {
        self.column = column;
    }

    pub fn datum(&self) -> &Datum {
        &self.datum
    }

    pub fn into_datum(self) -> Datum {
        self.datum
    }

    pub fn kind(&self) -> Option<Kind> {
        match &self.datum {
            Datum::Null => None,
            Datum::Boolean(_) => Some(Kind::Boolean),
            Datum::Int32(_) => Some(Kind::Int32),
            Datum::Int64(_) => Some(Kind::Int64),
            Datum::Float(_) => Some(Kind::Float),
            Datum::Double(_) => Some(Kind::Double),
            Datum::ByteArray(_) => Some(Kind::ByteArray),
            Datum::FixedLenByteArray(_) => Some(Kind::FixedLenByteArray),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.datum, Datum::Null)
    }

    pub fn repetition_level(&self) -> u8 {
        self.repetition_level
    }

    pub fn definition_level(&self) -> u8 {
        self.definition_level
    }

    pub fn column(&self) -> u16 {
        self.column
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.datum {
            Datum::Boolean(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self.datum {
            Datum::Int32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.datum {
            Datum::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self.datum {
            Datum::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.datum {
            Datum::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.datum {
            Datum::ByteArray(v) | Datum::FixedLenByteArray(v) => Some(v),
            _ => None,
        }
    }

    /// Compares the payloads of two values, ignoring levels and column ordinals.
    ///
    /// Integers compare as signed, floating point values with `<`/`>` (so NaN
    /// compares equal to everything), byte arrays lexicographically. Null orders
    /// before any non-null value.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (&self.datum, &other.datum) {
            (Datum::Null, Datum::Null) => Ordering::Equal,
            (Datum::Null, _) => Ordering::Less,
            (_, Datum::Null) => Ordering::Greater,
            (Datum::Boolean(a), Datum::Boolean(b)) => a.cmp(b),
            (Datum::Int32(a), Datum::Int32(b)) => a.cmp(b),
            (Datum::Int64(a), Datum::Int64(b)) => a.cmp(b),
            (Datum::Float(a), Datum::Float(b)) => compare_float(*a, *b),
            (Datum::Double(a), Datum::Double(b)) => compare_float(*a, *b),
            (Datum::ByteArray(a), Datum::ByteArray(b))
            | (Datum::FixedLenByteArray(a), Datum::FixedLenByteArray(b)) => a.cmp(b),
            (a, b) => discriminant(a).cmp(&discriminant(b)),
        }
    }

    /// Parses a single plain-encoded value as stored in statistics and column indexes:
    /// byte arrays are stored without a length prefix.
    pub fn parse(kind: Kind, bytes: &[u8]) -> Result<Value> {
        let datum = match kind {
            Kind::Boolean => {
                let &[b] = bytes else {
                    return Err(stat_size_error(kind, 1, bytes.len()));
                };
                Datum::Boolean(b & 1 != 0)
            }
            Kind::Int32 => Datum::Int32(LittleEndian::read_i32(fixed(kind, bytes, 4)?)),
            Kind::Int64 => Datum::Int64(LittleEndian::read_i64(fixed(kind, bytes, 8)?)),
            Kind::Float => Datum::Float(LittleEndian::read_f32(fixed(kind, bytes, 4)?)),
            Kind::Double => Datum::Double(LittleEndian::read_f64(fixed(kind, bytes, 8)?)),
            Kind::ByteArray => Datum::ByteArray(bytes.to_vec()),
            Kind::FixedLenByteArray => Datum::FixedLenByteArray(bytes.to_vec()),
        };
        Ok(Value::new(datum))
    }

    /// Serializes the payload in the representation accepted by [`Value::parse`].
    /// Null values serialize to an empty buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.datum {
            Datum::Null => Vec::new(),
            Datum::Boolean(v) => vec![*v as u8],
            Datum::Int32(v) => v.to_le_bytes().to_vec(),
            Datum::Int64(v) => v.to_le_bytes().to_vec(),
            Datum::Float(v) => v.to_le_bytes().to_vec(),
            Datum::Double(v) => v.to_le_bytes().to_vec(),
            Datum::ByteArray(v) | Datum::FixedLenByteArray(v) => v.clone(),
        }
    }
}

fn compare_float<T: PartialOrd>(a: T, b: T) -> Ordering {
    if a < b {
        Ordering::Less
    } else if a > b {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

fn discriminant(datum: &Datum) -> u8 {
    match datum {
        Datum::Null => 0,
        Datum::Boolean(_) => 1,
        Datum::Int32(_) => 2,
        Datum::Int64(_) => 3,
        Datum::Float(_) => 4,
        Datum::Double(_) => 5,
        Datum::ByteArray(_) => 6,
        Datum::FixedLenByteArray(_) => 7,
    }
}

fn fixed(kind: Kind, bytes: &[u8], width: usize) -> Result<&[u8]> {
    if bytes.len() == width {
        Ok(bytes)
    } else {
        Err(stat_size_error(kind, width, bytes.len()))
    }
}

#[cold]
fn stat_size_error(kind: Kind, expected: usize, actual: usize) -> Error {
    Error::invalid_format(
        "statistics value",
        format!("{kind:?} value must be {expected} bytes, got {actual}"),
    )
}
