use strata_common::{Result, error::Error};
use strata_format::value::{Datum, Kind, Value};

use super::{
    Dictionary, ReverseIndex, bounds_positions, check_index, check_insert, check_lookup,
    kind_mismatch, position,
};

/// Dictionary of fixed-length byte arrays stored in an arena of fixed stride.
#[derive(Debug)]
pub struct FixedLenByteArrayDictionary {
    arena: Vec<u8>,
    type_length: usize,
    index: Option<ReverseIndex>,
}

impl FixedLenByteArrayDictionary {
    pub fn new(type_length: usize) -> FixedLenByteArrayDictionary {
        FixedLenByteArrayDictionary {
            arena: Vec::new(),
            type_length,
            index: None,
        }
    }

    pub fn type_length(&self) -> usize {
        self.type_length
    }

    pub fn entry(&self, pos: usize) -> &[u8] {
        let start = pos * self.type_length;
        &self.arena[start..start + self.type_length]
    }

    pub(super) fn append(&mut self, values: &[Value]) -> Result<()> {
        for value in values {
            let bytes = self.bytes_of(value)?;
            self.push(bytes)?;
        }
        self.index = None;
        Ok(())
    }

    fn bytes_of<'v>(&self, value: &'v Value) -> Result<&'v [u8]> {
        match value.datum() {
            Datum::FixedLenByteArray(bytes) if bytes.len() == self.type_length => Ok(bytes),
            Datum::FixedLenByteArray(bytes) => Err(Error::invalid_arg(
                "values",
                format!(
                    "expected {} bytes, got a value of {} bytes",
                    self.type_length,
                    bytes.len()
                ),
            )),
            _ => Err(kind_mismatch(Kind::FixedLenByteArray, value)),
        }
    }

    fn push(&mut self, bytes: &[u8]) -> Result<u32> {
        let pos = position(self.len())?;
        self.arena.extend_from_slice(bytes);
        Ok(pos)
    }

    fn build_index(&self) -> ReverseIndex {
        let mut index = ReverseIndex::default();
        for pos in 0..self.len() {
            let hash = index.hash(self.entry(pos));
            index.insert(hash, pos as u32);
        }
        index
    }

    fn insert_indexed(
        &mut self,
        index: &mut ReverseIndex,
        values: &[Value],
        indexes: &mut [i32],
    ) -> Result<()> {
        for (value, slot) in values.iter().zip(indexes.iter_mut()) {
            let bytes = self.bytes_of(value)?;
            let hash = index.hash(bytes);
            let pos = match index.find(hash, |pos| self.entry(pos as usize) == bytes) {
                Some(pos) => pos,
                None => {
                    let pos = self.push(bytes)?;
                    index.insert(hash, pos);
                    pos
                }
            };
            *slot = pos as i32;
        }
        Ok(())
    }
}

impl Dictionary for FixedLenByteArrayDictionary {
    fn kind(&self) -> Kind {
        Kind::FixedLenByteArray
    }

    fn len(&self) -> usize {
        if self.type_length == 0 {
            0
        } else {
            self.arena.len() / self.type_length
        }
    }

    fn value(&self, index: i32) -> Result<Value> {
        let pos = check_index(index, self.len())?;
        Ok(Value::fixed_len_byte_array(self.entry(pos)))
    }

    fn insert(&mut self, values: &[Value], indexes: &mut [i32]) -> Result<()> {
        check_insert(values, indexes)?;
        verify_type_length(self.type_length)?;
        let mut index = match self.index.take() {
            Some(index) => index,
            None => self.build_index(),
        };
        let result = self.insert_indexed(&mut index, values, indexes);
        self.index = Some(index);
        result
    }

    fn lookup(&self, indexes: &[i32], values: &mut [Value]) -> Result<()> {
        check_lookup(indexes, values, self.len())?;
        for (&index, value) in indexes.iter().zip(values.iter_mut()) {
            *value = Value::fixed_len_byte_array(self.entry(index as usize));
        }
        Ok(())
    }

    fn bounds(&self, indexes: &[i32]) -> Result<Option<(Value, Value)>> {
        let positions = bounds_positions(indexes, self.len(), |a, b| {
            self.entry(a).cmp(self.entry(b))
        })?;
        Ok(positions.map(|(min, max)| {
            (
                Value::fixed_len_byte_array(self.entry(min)),
                Value::fixed_len_byte_array(self.entry(max)),
            )
        }))
    }

    fn reset(&mut self) {
        self.arena.clear();
        self.index = None;
    }
}

fn verify_type_length(type_length: usize) -> Result<()> {
    if type_length == 0 {
        return Err(Error::invalid_operation(
            "zero-length fixed-length byte array dictionary",
        ));
    }
    Ok(())
}
