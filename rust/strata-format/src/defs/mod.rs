pub mod metadata;
pub mod page;

mod metadata_ext;
mod page_ext;

pub use metadata::{
    BoundaryOrder, ColumnChunk, ColumnIndex, ColumnMetaData, FieldRepetitionType, OffsetIndex,
    PageLocation, PhysicalType, RowGroup, SchemaElement, SortingColumn,
};
pub use page::{
    CompressionCodec, DataPageHeader, DataPageHeaderV2, DictionaryPageHeader, Encoding,
    PageHeader, PageType, Statistics,
};

/// Upper bound on the encoded size of a single page header. Larger length prefixes are
/// treated as corruption rather than allocated.
pub const MAX_PAGE_HEADER_SIZE: usize = 16 * 1024 * 1024;

/// Size of the little-endian length prefix of V1 level blocks.
pub const LEVELS_LEN_SIZE: usize = 4;

/// Levels (and therefore maximum repetition/definition levels) are bounded by this value.
pub const MAX_LEVEL: u8 = 127;
