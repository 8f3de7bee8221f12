use strata_common::{Result, error::Error};
use strata_format::value::{Datum, Kind, Value};

use super::{
    Dictionary, ReverseIndex, bounds_positions, check_index, check_insert, check_lookup,
    kind_mismatch, position,
};

/// Dictionary of variable-length byte arrays.
///
/// Entries are stored back to back in a single arena; `offsets[i]..offsets[i + 1]`
/// delimits entry `i`.
#[derive(Debug)]
pub struct ByteArrayDictionary {
    arena: Vec<u8>,
    offsets: Vec<u32>,
    index: Option<ReverseIndex>,
}

impl ByteArrayDictionary {
    pub fn new() -> ByteArrayDictionary {
        ByteArrayDictionary {
            arena: Vec::new(),
            offsets: vec![0],
            index: None,
        }
    }

    pub fn entry(&self, pos: usize) -> &[u8] {
        let start = self.offsets[pos] as usize;
        let end = self.offsets[pos + 1] as usize;
        &self.arena[start..end]
    }

    /// Appends page entries as-is, without deduplication.
    pub(super) fn append(&mut self, values: &[Value]) -> Result<()> {
        for value in values {
            let bytes = bytes_of(value)?;
            self.push(bytes)?;
        }
        self.index = None;
        Ok(())
    }

    fn push(&mut self, bytes: &[u8]) -> Result<u32> {
        let pos = position(self.len())?;
        let end = u32::try_from(self.arena.len() + bytes.len())
            .map_err(|_| Error::invalid_operation("dictionary arena is full"))?;
        self.arena.extend_from_slice(bytes);
        self.offsets.push(end);
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
            let bytes = bytes_of(value)?;
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

impl Default for ByteArrayDictionary {
    fn default() -> Self {
        ByteArrayDictionary::new()
    }
}

impl Dictionary for ByteArrayDictionary {
    fn kind(&self) -> Kind {
        Kind::ByteArray
    }

    fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    fn value(&self, index: i32) -> Result<Value> {
        let pos = check_index(index, self.len())?;
        Ok(Value::byte_array(self.entry(pos)))
    }

    fn insert(&mut self, values: &[Value], indexes: &mut [i32]) -> Result<()> {
        check_insert(values, indexes)?;
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
            *value = Value::byte_array(self.entry(index as usize));
        }
        Ok(())
    }

    fn bounds(&self, indexes: &[i32]) -> Result<Option<(Value, Value)>> {
        let positions = bounds_positions(indexes, self.len(), |a, b| {
            self.entry(a).cmp(self.entry(b))
        })?;
        Ok(positions.map(|(min, max)| {
            (
                Value::byte_array(self.entry(min)),
                Value::byte_array(self.entry(max)),
            )
        }))
    }

    fn reset(&mut self) {
        self.arena.clear();
        self.offsets.truncate(1);
        self.index = None;
    }
}

fn bytes_of(value: &Value) -> Result<&[u8]> {
    match value.datum() {
        Datum::ByteArray(bytes) => Ok(bytes),
        _ => Err(kind_mismatch(Kind::ByteArray, value)),
    }
}
