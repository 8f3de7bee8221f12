use std::sync::Arc;

use strata_common::{Result, try_or_ret_some_err};
use strata_format::{schema::Schema, value::Value};

/// A row: the values of every leaf column in column order. A repeated column
/// contributes one value per element (or a single null/empty marker), each carrying
/// its levels and column ordinal.
pub type Row = Vec<Value>;

/// A source of rows read in batches.
pub trait RowSource: Send {
    fn schema(&self) -> &Arc<Schema>;

    /// Reads up to `rows.len()` rows, overwriting the slots. Returns 0 once the source
    /// is exhausted, and keeps returning 0 on later calls.
    fn read_rows(&mut self, rows: &mut [Row]) -> Result<usize>;

    /// Positions the source so that the next row read is `row`.
    fn seek_to_row(&mut self, row: u64) -> Result<()>;

    /// Releases the resources held by the source.
    fn close(&mut self);
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn schema(&self) -> &Arc<Schema> {
        self.as_ref().schema()
    }

    fn read_rows(&mut self, rows: &mut [Row]) -> Result<usize> {
        self.as_mut().read_rows(rows)
    }

    fn seek_to_row(&mut self, row: u64) -> Result<()> {
        self.as_mut().seek_to_row(row)
    }

    fn close(&mut self) {
        self.as_mut().close()
    }
}

impl<S: RowSource + ?Sized> RowSource for &mut S {
    fn schema(&self) -> &Arc<Schema> {
        (**self).schema()
    }

    fn read_rows(&mut self, rows: &mut [Row]) -> Result<usize> {
        (**self).read_rows(rows)
    }

    fn seek_to_row(&mut self, row: u64) -> Result<()> {
        (**self).seek_to_row(row)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Iterator over the rows of a [`RowSource`], reading them in batches.
pub struct Rows<S> {
    source: S,
    batch: Vec<Row>,
    pos: usize,
    len: usize,
    done: bool,
}

impl<S: RowSource> Rows<S> {
    pub fn new(source: S, batch_size: usize) -> Rows<S> {
        Rows {
            source,
            batch: vec![Row::new(); batch_size.max(1)],
            pos: 0,
            len: 0,
            done: false,
        }
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: RowSource> Iterator for Rows<S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos == self.len {
            if self.done {
                return None;
            }
            self.pos = 0;
            self.len = 0;
            self.len = try_or_ret_some_err!(self.source.read_rows(&mut self.batch));
            if self.len == 0 {
                self.done = true;
                return None;
            }
        }
        let row = std::mem::take(&mut self.batch[self.pos]);
        self.pos += 1;
        Some(Ok(row))
    }
}
