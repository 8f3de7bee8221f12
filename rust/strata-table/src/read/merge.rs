//! K-way merge of sorted row sources.

use std::{cmp::Ordering, sync::Arc};

use itertools::Itertools;
use strata_common::{Result, error::Error};
use strata_format::{schema::Schema, value::Value};

use super::{
    options::ReaderOptions,
    row::{Row, RowSource},
    row_group::RowGroup,
    sort::{SortFunc, SortingColumn, has_prefix},
};

/// Merges rows of several sources, each sorted by the same columns, into one stream
/// ordered by those columns.
///
/// Without sorting columns the sources are concatenated in input order. Rows comparing
/// equal are emitted in input order of their sources.
pub struct MergeEngine {
    schema: Arc<Schema>,
    inputs: Vec<MergeInput>,
    sort_funcs: Vec<(u16, SortFunc)>,
    /// Min-heap of indexes of the inputs holding a row.
    heap: Vec<usize>,
    /// Input being drained when concatenating.
    current: usize,
    initialized: bool,
    closed: bool,
    /// Rows emitted so far.
    emitted: u64,
}

impl MergeEngine {
    /// Creates a merge of `sources` ordered by `sorting`. Every source must have a
    /// schema compatible with `schema` and every sorting column must name one of its
    /// columns.
    pub fn new(
        schema: Arc<Schema>,
        sources: Vec<Box<dyn RowSource>>,
        sorting: &[SortingColumn],
    ) -> Result<MergeEngine> {
        for (i, source) in sources.iter().enumerate() {
            if !schema.is_compatible(source.schema()) {
                return Err(Error::schema_mismatch(format!(
                    "schema of merge input {i} differs from the merge schema"
                )));
            }
        }
        let sort_funcs = sorting
            .iter()
            .map(|sorting| {
                let path = sorting.path().iter().map(String::as_str).collect_vec();
                let column = schema.find_column(&path).ok_or_else(|| {
                    Error::schema_mismatch(format!("no column for sorting column {sorting}"))
                })?;
                Ok((column.index() as u16, SortFunc::new(column, sorting)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(MergeEngine {
            schema,
            inputs: sources.into_iter().map(MergeInput::new).collect(),
            sort_funcs,
            heap: Vec::new(),
            current: 0,
            initialized: false,
            closed: false,
            emitted: 0,
        })
    }

    /// Sets the number of rows buffered per input.
    pub fn with_buffer_rows(mut self, rows: usize) -> MergeEngine {
        for input in &mut self.inputs {
            input.buffer = vec![Row::new(); rows.max(1)];
        }
        self
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Number of rows emitted so far, including rows skipped by seeks.
    pub fn position(&self) -> u64 {
        self.emitted
    }

    pub fn read_rows(&mut self, rows: &mut [Row]) -> Result<usize> {
        if self.closed || rows.is_empty() {
            return Ok(0);
        }
        if !self.initialized {
            self.init()?;
        }
        let n = if self.sort_funcs.is_empty() {
            self.concatenate(rows)?
        } else {
            self.merge(rows)?
        };
        self.emitted += n as u64;
        Ok(n)
    }

    /// Advances to `row`, discarding the rows before it. The merge only moves forward:
    /// a target before the current position is out of range.
    pub fn seek_to_row(&mut self, row: u64) -> Result<()> {
        if row < self.emitted {
            return Err(Error::out_of_range(
                "row",
                format!("cannot seek backward from row {} to {row}", self.emitted),
            ));
        }
        let mut discard = vec![Row::new(); (row - self.emitted).min(64) as usize];
        while self.emitted < row {
            let want = (row - self.emitted).min(discard.len() as u64) as usize;
            if self.read_rows(&mut discard[..want])? == 0 {
                break;
            }
        }
        Ok(())
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.heap.clear();
        for input in &mut self.inputs {
            input.close();
        }
    }

    fn init(&mut self) -> Result<()> {
        self.initialized = true;
        if self.sort_funcs.is_empty() {
            log::debug!("concatenating {} merge inputs", self.inputs.len());
            return Ok(());
        }
        for i in 0..self.inputs.len() {
            if self.inputs[i].fill()? {
                self.heap.push(i);
                self.sift_up(self.heap.len() - 1);
            }
        }
        log::debug!(
            "merging {} of {} inputs on {} sorting columns",
            self.heap.len(),
            self.inputs.len(),
            self.sort_funcs.len()
        );
        Ok(())
    }

    fn concatenate(&mut self, rows: &mut [Row]) -> Result<usize> {
        let mut n = 0;
        while n < rows.len() && self.current < self.inputs.len() {
            let input = &mut self.inputs[self.current];
            if !input.fill()? {
                self.current += 1;
                continue;
            }
            rows[n] = input.take();
            n += 1;
        }
        Ok(n)
    }

    fn merge(&mut self, rows: &mut [Row]) -> Result<usize> {
        let mut n = 0;
        while n < rows.len() {
            let Some(&top) = self.heap.first() else {
                break;
            };
            let input = &mut self.inputs[top];
            rows[n] = input.take();
            n += 1;
            if input.fill()? {
                self.sift_down(0);
            } else {
                let last = self.heap.len() - 1;
                self.heap.swap(0, last);
                self.heap.pop();
                if !self.heap.is_empty() {
                    self.sift_down(0);
                }
            }
        }
        Ok(n)
    }

    fn less(&self, a: usize, b: usize) -> bool {
        let (Some(row_a), Some(row_b)) = (self.inputs[a].head(), self.inputs[b].head()) else {
            return false;
        };
        for (column, sort) in &self.sort_funcs {
            match sort.compare(column_values(row_a, *column), column_values(row_b, *column)) {
                Ordering::Equal => continue,
                ordering => return ordering == Ordering::Less,
            }
        }
        a < b
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.less(self.heap[i], self.heap[parent]) {
                break;
            }
            self.heap.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * i + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut child = left;
            if right < len && self.less(self.heap[right], self.heap[left]) {
                child = right;
            }
            if !self.less(self.heap[child], self.heap[i]) {
                break;
            }
            self.heap.swap(i, child);
            i = child;
        }
    }
}

impl RowSource for MergeEngine {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn read_rows(&mut self, rows: &mut [Row]) -> Result<usize> {
        MergeEngine::read_rows(self, rows)
    }

    fn seek_to_row(&mut self, row: u64) -> Result<()> {
        MergeEngine::seek_to_row(self, row)
    }

    fn close(&mut self) {
        MergeEngine::close(self)
    }
}

impl std::fmt::Debug for MergeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeEngine")
            .field("schema", &self.schema.name())
            .field("inputs", &self.inputs.len())
            .field("sorting_columns", &self.sort_funcs.len())
            .field("emitted", &self.emitted)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Drop for MergeEngine {
    fn drop(&mut self) {
        self.close();
    }
}

/// Values of `column` within a row whose values are in column order.
fn column_values(row: &[Value], column: u16) -> &[Value] {
    let start = row.partition_point(|v| v.column() < column);
    let end = start + row[start..].partition_point(|v| v.column() == column);
    &row[start..end]
}

/// A merge input with its buffered rows.
struct MergeInput {
    source: Box<dyn RowSource>,
    buffer: Vec<Row>,
    pos: usize,
    len: usize,
    done: bool,
}

impl MergeInput {
    fn new(source: Box<dyn RowSource>) -> MergeInput {
        MergeInput {
            source,
            buffer: vec![Row::new()],
            pos: 0,
            len: 0,
            done: false,
        }
    }

    /// Makes sure a row is buffered. Returns false once the source is exhausted.
    fn fill(&mut self) -> Result<bool> {
        if self.pos < self.len {
            return Ok(true);
        }
        if self.done {
            return Ok(false);
        }
        self.pos = 0;
        self.len = 0;
        self.len = self.source.read_rows(&mut self.buffer)?;
        if self.len == 0 {
            self.done = true;
        }
        Ok(!self.done)
    }

    fn head(&self) -> Option<&Row> {
        self.buffer[..self.len].get(self.pos)
    }

    fn take(&mut self) -> Row {
        let row = std::mem::take(&mut self.buffer[self.pos]);
        self.pos += 1;
        row
    }

    fn close(&mut self) {
        self.pos = 0;
        self.len = 0;
        self.done = true;
        self.source.close();
    }
}

/// Merges row groups sorted by `sorting` into one stream.
///
/// The row groups must share the same schema, and when `sorting` is not empty every row
/// group must be sorted by columns starting with `sorting`. Both are checked before
/// any page is read. No row groups produce an empty stream.
pub fn merge_row_groups(
    row_groups: &[RowGroup],
    sorting: &[SortingColumn],
    options: &ReaderOptions,
) -> Result<MergeEngine> {
    let Some(first) = row_groups.first() else {
        return MergeEngine::new(Arc::new(Schema::new("", Vec::new())?), Vec::new(), &[]);
    };
    let schema = first.schema().clone();
    for (i, row_group) in row_groups.iter().enumerate().skip(1) {
        if !schema.is_compatible(row_group.schema()) {
            return Err(Error::schema_mismatch(format!(
                "schema of row group {i} differs from the schema of row group 0"
            )));
        }
    }
    if !sorting.is_empty() {
        for (i, row_group) in row_groups.iter().enumerate() {
            if !has_prefix(row_group.sorting_columns(), sorting) {
                return Err(Error::sorting_columns_mismatch(format!(
                    "row group {i} is sorted by [{}], which does not start with [{}]",
                    row_group.sorting_columns().iter().join(", "),
                    sorting.iter().join(", ")
                )));
            }
        }
    }

    let sources = row_groups
        .iter()
        .map(|row_group| -> Result<Box<dyn RowSource>> { Ok(Box::new(row_group.reader()?)) })
        .collect::<Result<Vec<_>>>()?;
    Ok(MergeEngine::new(schema, sources, sorting)?
        .with_buffer_rows(options.effective_merge_buffer_rows()))
}
