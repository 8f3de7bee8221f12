//! Row group reading and merging.

pub mod column_chunk;
pub mod merge;
pub mod options;
pub mod page;
pub mod page_values;
pub mod row;
pub mod row_group;
pub mod sort;

pub use column_chunk::ColumnChunkCursor;
pub use merge::{MergeEngine, merge_row_groups};
pub use options::ReaderOptions;
pub use page::Page;
pub use row::{Row, RowSource, Rows};
pub use row_group::{RowGroup, RowGroupReader};
pub use sort::{SortFunc, SortingColumn};
