//! Row groups and the row-oriented reader assembling rows from their column chunks.

use std::sync::Arc;

use itertools::Itertools;
use strata_common::{Result, error::Error};
use strata_format::{
    defs::{self, ColumnChunk, ColumnIndex, OffsetIndex, PhysicalType},
    message::decode_message,
    schema::{LeafColumn, Schema},
    value::Value,
};
use strata_io::{ReadAt, ReadAtExt, utils::io_error};

use super::{
    column_chunk::ColumnChunkCursor,
    options::ReaderOptions,
    row::{Row, RowSource},
    sort::SortingColumn,
};

/// A horizontal partition of a table: one column chunk per leaf column of the schema,
/// the page indexes of each chunk, and the columns the rows are sorted by.
pub struct RowGroup {
    reader: Arc<dyn ReadAt>,
    schema: Arc<Schema>,
    num_rows: u64,
    columns: Vec<ColumnChunk>,
    offset_indexes: Vec<Option<Arc<OffsetIndex>>>,
    column_indexes: Vec<Option<Arc<ColumnIndex>>>,
    sorting_columns: Vec<SortingColumn>,
    options: ReaderOptions,
}

impl RowGroup {
    /// Opens a row group described by `meta`, validating its column chunks against
    /// `schema` and loading the offset and column indexes of every chunk.
    pub fn open(
        reader: Arc<dyn ReadAt>,
        schema: Arc<Schema>,
        meta: &defs::RowGroup,
        options: ReaderOptions,
    ) -> Result<RowGroup> {
        if meta.columns.len() != schema.num_columns() {
            return Err(Error::invalid_format(
                "row group",
                format!(
                    "{} column chunks for a schema of {} columns",
                    meta.columns.len(),
                    schema.num_columns()
                ),
            ));
        }
        let num_rows = u64::try_from(meta.num_rows).map_err(|_| {
            Error::invalid_format("row group", format!("negative row count {}", meta.num_rows))
        })?;

        let mut offset_indexes = Vec::with_capacity(meta.columns.len());
        let mut column_indexes = Vec::with_capacity(meta.columns.len());
        for (chunk, column) in meta.columns.iter().zip_eq(schema.columns()) {
            validate_chunk(chunk, column).map_err(column.error_context(None, None))?;
            let offset_index = load_index::<OffsetIndex>(
                reader.as_ref(),
                chunk.offset_index_range()?,
                "offset index",
            )
            .map_err(column.error_context(None, None))?;
            let column_index = load_index::<ColumnIndex>(
                reader.as_ref(),
                chunk.column_index_range()?,
                "column index",
            )
            .map_err(column.error_context(None, None))?;
            offset_indexes.push(offset_index.map(Arc::new));
            column_indexes.push(column_index.map(Arc::new));
        }

        let sorting_columns = meta
            .sorting_columns
            .iter()
            .map(|sorting| SortingColumn::from_metadata(&schema, sorting))
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "opened row group of {num_rows} rows, {} columns, sorted by [{}]",
            schema.num_columns(),
            sorting_columns.iter().join(", ")
        );
        Ok(RowGroup {
            reader,
            schema,
            num_rows,
            columns: meta.columns.clone(),
            offset_indexes,
            column_indexes,
            sorting_columns,
            options,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    pub fn column_chunks(&self) -> &[ColumnChunk] {
        &self.columns
    }

    pub fn sorting_columns(&self) -> &[SortingColumn] {
        &self.sorting_columns
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn offset_index(&self, column: usize) -> Option<&Arc<OffsetIndex>> {
        self.offset_indexes.get(column)?.as_ref()
    }

    pub fn column_index(&self, column: usize) -> Option<&Arc<ColumnIndex>> {
        self.column_indexes.get(column)?.as_ref()
    }

    /// Opens a page cursor over the chunk of column `column`.
    pub fn open_column(&self, column: usize) -> Result<ColumnChunkCursor> {
        let leaf = self.schema.column(column).ok_or_else(|| {
            Error::invalid_arg(
                "column",
                format!(
                    "column {column} out of range for {} columns",
                    self.schema.num_columns()
                ),
            )
        })?;
        ColumnChunkCursor::open(
            self.reader.clone(),
            leaf.clone(),
            &self.columns[column],
            self.offset_indexes[column].clone(),
            self.column_indexes[column].clone(),
            &self.options,
        )
    }

    /// Creates a reader over the rows of the row group.
    pub fn reader(&self) -> Result<RowGroupReader> {
        let columns = (0..self.schema.num_columns())
            .map(|i| self.open_column(i).map(ColumnRows::new))
            .collect::<Result<Vec<_>>>()?;
        Ok(RowGroupReader {
            schema: self.schema.clone(),
            columns,
            closed: false,
        })
    }
}

impl std::fmt::Debug for RowGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowGroup")
            .field("schema", &self.schema.name())
            .field("num_rows", &self.num_rows)
            .field("columns", &self.columns.len())
            .field("sorting_columns", &self.sorting_columns)
            .finish_non_exhaustive()
    }
}

fn validate_chunk(chunk: &ColumnChunk, column: &LeafColumn) -> Result<()> {
    let meta = chunk.meta()?;
    let physical_type = PhysicalType::try_from(meta.physical_type).map_err(|_| {
        Error::invalid_format(
            "column chunk",
            format!("unknown physical type {}", meta.physical_type),
        )
    })?;
    if column.physical_type().is_some_and(|t| t != physical_type) {
        return Err(Error::invalid_format(
            "column chunk",
            format!(
                "physical type {physical_type:?} does not match the schema type {:?}",
                column.physical_type()
            ),
        ));
    }
    if !meta.path_in_schema.is_empty() && meta.path_in_schema != column.path() {
        return Err(Error::invalid_format(
            "column chunk",
            format!(
                "path '{}' does not match the schema column",
                meta.path_in_schema.join(".")
            ),
        ));
    }
    Ok(())
}

fn load_index<M: prost::Message + Default>(
    reader: &dyn ReadAt,
    range: Option<std::ops::Range<u64>>,
    element: &str,
) -> Result<Option<M>> {
    let Some(range) = range else {
        return Ok(None);
    };
    let buf = reader
        .read_vec_at(range.start, (range.end - range.start) as usize)
        .map_err(|e| io_error(element, e))?;
    decode_message(&buf, element).map(Some)
}

/// Decode state of one column of a [`RowGroupReader`]: the values of the current
/// page and the rows of the page not yet assembled.
struct ColumnRows {
    cursor: ColumnChunkCursor,
    values: Vec<Value>,
    pos: usize,
    rows: usize,
    done: bool,
}

impl ColumnRows {
    fn new(cursor: ColumnChunkCursor) -> ColumnRows {
        ColumnRows {
            cursor,
            values: Vec::new(),
            pos: 0,
            rows: 0,
            done: false,
        }
    }

    /// Loads pages until one has rows left or the chunk ends.
    fn fill(&mut self) -> Result<()> {
        while self.rows == 0 && !self.done {
            self.values.clear();
            self.pos = 0;
            match self.cursor.read_page()? {
                None => self.done = true,
                Some(page) => {
                    page.decode_into(&mut self.values)?;
                    self.rows = page.num_rows();
                    self.cursor.release(page);
                }
            }
        }
        Ok(())
    }

    /// Moves the values of the next row of this column to `row`: the value starting
    /// the row followed by the values continuing it.
    fn take_row(&mut self, row: &mut Row) -> Result<()> {
        let Some(first) = self.values.get_mut(self.pos) else {
            return Err(Error::invalid_format(
                "data page",
                "fewer values than the declared row count",
            )
            .in_column(self.cursor.column().path_string(), None, None));
        };
        row.push(std::mem::take(first));
        self.pos += 1;
        while let Some(value) = self.values.get_mut(self.pos) {
            if value.repetition_level() == 0 {
                break;
            }
            row.push(std::mem::take(value));
            self.pos += 1;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.values.clear();
        self.pos = 0;
        self.rows = 0;
        self.done = false;
    }
}

/// Reader of the rows of a [`RowGroup`].
///
/// Every read is bounded by the rows left in the current page of each column, so a
/// batch never spans a page boundary of any column. The reader is closed when
/// dropped.
pub struct RowGroupReader {
    schema: Arc<Schema>,
    columns: Vec<ColumnRows>,
    closed: bool,
}

impl RowGroupReader {
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn read_rows(&mut self, rows: &mut [Row]) -> Result<usize> {
        if self.closed {
            return Ok(0);
        }
        let mut n = rows.len();
        for column in &mut self.columns {
            column.fill()?;
            n = n.min(column.rows);
        }
        for row in rows.iter_mut() {
            row.clear();
        }
        if n == 0 || self.columns.is_empty() {
            return Ok(0);
        }
        for row in &mut rows[..n] {
            for column in &mut self.columns {
                column.take_row(row)?;
            }
        }
        for column in &mut self.columns {
            column.rows -= n;
        }
        Ok(n)
    }

    /// Positions every column at `row` and drops the buffered pages.
    pub fn seek_to_row(&mut self, row: u64) -> Result<()> {
        if self.closed {
            return Err(Error::invalid_operation("seek on a closed row group reader"));
        }
        for column in &mut self.columns {
            column.reset();
            column.cursor.seek_to_row(row)?;
        }
        Ok(())
    }

    /// Closes every column cursor. Later reads report the end of the rows.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for column in &mut self.columns {
            column.reset();
            column.cursor.close();
        }
    }
}

impl RowSource for RowGroupReader {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn read_rows(&mut self, rows: &mut [Row]) -> Result<usize> {
        RowGroupReader::read_rows(self, rows)
    }

    fn seek_to_row(&mut self, row: u64) -> Result<()> {
        RowGroupReader::seek_to_row(self, row)
    }

    fn close(&mut self) {
        RowGroupReader::close(self)
    }
}

impl Drop for RowGroupReader {
    fn drop(&mut self) {
        self.close();
    }
}
