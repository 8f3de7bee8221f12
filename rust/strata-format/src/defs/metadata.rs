// Column chunk, row group, page index and schema metadata messages.

use super::page::{CompressionCodec, Encoding, Statistics};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ColumnMetaData {
    #[prost(enumeration = "PhysicalType", tag = "1")]
    pub physical_type: i32,
    #[prost(enumeration = "Encoding", repeated, tag = "2")]
    pub encodings: ::prost::alloc::vec::Vec<i32>,
    #[prost(string, repeated, tag = "3")]
    pub path_in_schema: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(enumeration = "CompressionCodec", tag = "4")]
    pub codec: i32,
    #[prost(int64, tag = "5")]
    pub num_values: i64,
    #[prost(int64, tag = "6")]
    pub total_uncompressed_size: i64,
    /// Size of all pages of the chunk, including the dictionary page and headers.
    #[prost(int64, tag = "7")]
    pub total_compressed_size: i64,
    #[prost(int64, tag = "9")]
    pub data_page_offset: i64,
    #[prost(int64, optional, tag = "10")]
    pub index_page_offset: ::core::option::Option<i64>,
    #[prost(int64, optional, tag = "11")]
    pub dictionary_page_offset: ::core::option::Option<i64>,
    #[prost(message, optional, tag = "12")]
    pub statistics: ::core::option::Option<Statistics>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ColumnChunk {
    #[prost(string, optional, tag = "1")]
    pub file_path: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(int64, tag = "2")]
    pub file_offset: i64,
    #[prost(message, optional, tag = "3")]
    pub meta_data: ::core::option::Option<ColumnMetaData>,
    #[prost(int64, optional, tag = "4")]
    pub offset_index_offset: ::core::option::Option<i64>,
    #[prost(int32, optional, tag = "5")]
    pub offset_index_length: ::core::option::Option<i32>,
    #[prost(int64, optional, tag = "6")]
    pub column_index_offset: ::core::option::Option<i64>,
    #[prost(int32, optional, tag = "7")]
    pub column_index_length: ::core::option::Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SortingColumn {
    /// Ordinal of the leaf column in the schema.
    #[prost(int32, tag = "1")]
    pub column_idx: i32,
    #[prost(bool, tag = "2")]
    pub descending: bool,
    #[prost(bool, tag = "3")]
    pub nulls_first: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RowGroup {
    #[prost(message, repeated, tag = "1")]
    pub columns: ::prost::alloc::vec::Vec<ColumnChunk>,
    #[prost(int64, tag = "2")]
    pub total_byte_size: i64,
    #[prost(int64, tag = "3")]
    pub num_rows: i64,
    #[prost(message, repeated, tag = "4")]
    pub sorting_columns: ::prost::alloc::vec::Vec<SortingColumn>,
    #[prost(int64, optional, tag = "5")]
    pub file_offset: ::core::option::Option<i64>,
    #[prost(int64, optional, tag = "6")]
    pub total_compressed_size: ::core::option::Option<i64>,
    #[prost(int32, optional, tag = "7")]
    pub ordinal: ::core::option::Option<i32>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct PageLocation {
    /// Absolute file offset of the page header.
    #[prost(int64, tag = "1")]
    pub offset: i64,
    /// Size of the page including its header.
    #[prost(int32, tag = "2")]
    pub compressed_page_size: i32,
    #[prost(int64, tag = "3")]
    pub first_row_index: i64,
}

/// Locations of the data pages of one column chunk, ordered by `first_row_index`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OffsetIndex {
    #[prost(message, repeated, tag = "1")]
    pub page_locations: ::prost::alloc::vec::Vec<PageLocation>,
}

/// Per-page bounds of one column chunk, indexed by data page ordinal.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ColumnIndex {
    #[prost(bool, repeated, tag = "1")]
    pub null_pages: ::prost::alloc::vec::Vec<bool>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub min_values: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub max_values: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    #[prost(enumeration = "BoundaryOrder", tag = "4")]
    pub boundary_order: i32,
    #[prost(int64, repeated, tag = "5")]
    pub null_counts: ::prost::alloc::vec::Vec<i64>,
}

/// One node of the flattened (depth-first) schema tree.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SchemaElement {
    #[prost(enumeration = "PhysicalType", optional, tag = "1")]
    pub physical_type: ::core::option::Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub type_length: ::core::option::Option<i32>,
    #[prost(enumeration = "FieldRepetitionType", optional, tag = "3")]
    pub repetition_type: ::core::option::Option<i32>,
    #[prost(string, tag = "4")]
    pub name: ::prost::alloc::string::String,
    #[prost(int32, optional, tag = "5")]
    pub num_children: ::core::option::Option<i32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PhysicalType {
    Boolean = 0,
    Int32 = 1,
    Int64 = 2,
    Int96 = 3,
    Float = 4,
    Double = 5,
    ByteArray = 6,
    FixedLenByteArray = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum FieldRepetitionType {
    Required = 0,
    Optional = 1,
    Repeated = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum BoundaryOrder {
    Unordered = 0,
    Ascending = 1,
    Descending = 2,
}
