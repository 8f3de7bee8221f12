// Page-level metadata messages.

/// Per-page or per-chunk statistics. `min_value`/`max_value` hold single values in
/// plain encoding (byte arrays without a length prefix); `min`/`max` are the
/// deprecated signed-order variants still written by older producers.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Statistics {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub max: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub min: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    #[prost(int64, optional, tag = "3")]
    pub null_count: ::core::option::Option<i64>,
    #[prost(int64, optional, tag = "4")]
    pub distinct_count: ::core::option::Option<i64>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub max_value: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "6")]
    pub min_value: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataPageHeader {
    #[prost(int32, tag = "1")]
    pub num_values: i32,
    #[prost(enumeration = "Encoding", tag = "2")]
    pub encoding: i32,
    #[prost(enumeration = "Encoding", tag = "3")]
    pub definition_level_encoding: i32,
    #[prost(enumeration = "Encoding", tag = "4")]
    pub repetition_level_encoding: i32,
    #[prost(message, optional, tag = "5")]
    pub statistics: ::core::option::Option<Statistics>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DictionaryPageHeader {
    #[prost(int32, tag = "1")]
    pub num_values: i32,
    #[prost(enumeration = "Encoding", tag = "2")]
    pub encoding: i32,
    #[prost(bool, optional, tag = "3")]
    pub is_sorted: ::core::option::Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataPageHeaderV2 {
    #[prost(int32, tag = "1")]
    pub num_values: i32,
    #[prost(int32, tag = "2")]
    pub num_nulls: i32,
    #[prost(int32, tag = "3")]
    pub num_rows: i32,
    #[prost(enumeration = "Encoding", tag = "4")]
    pub encoding: i32,
    #[prost(int32, tag = "5")]
    pub definition_levels_byte_length: i32,
    #[prost(int32, tag = "6")]
    pub repetition_levels_byte_length: i32,
    #[prost(bool, optional, tag = "7")]
    pub is_compressed: ::core::option::Option<bool>,
    #[prost(message, optional, tag = "8")]
    pub statistics: ::core::option::Option<Statistics>,
}

/// Header preceding every page of a column chunk.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PageHeader {
    #[prost(enumeration = "PageType", tag = "1")]
    pub page_type: i32,
    #[prost(int32, tag = "2")]
    pub uncompressed_page_size: i32,
    #[prost(int32, tag = "3")]
    pub compressed_page_size: i32,
    /// CRC-32 (IEEE) of the raw page bytes following the header.
    #[prost(uint32, optional, tag = "4")]
    pub crc: ::core::option::Option<u32>,
    #[prost(message, optional, tag = "5")]
    pub data_page_header: ::core::option::Option<DataPageHeader>,
    #[prost(message, optional, tag = "7")]
    pub dictionary_page_header: ::core::option::Option<DictionaryPageHeader>,
    #[prost(message, optional, tag = "8")]
    pub data_page_header_v2: ::core::option::Option<DataPageHeaderV2>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PageType {
    DataPage = 0,
    IndexPage = 1,
    DictionaryPage = 2,
    DataPageV2 = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Encoding {
    Plain = 0,
    /// Legacy dictionary tag: on dictionary pages it means plain-encoded values, on
    /// data pages RLE-encoded dictionary indices.
    PlainDictionary = 2,
    Rle = 3,
    BitPacked = 4,
    DeltaBinaryPacked = 5,
    DeltaLengthByteArray = 6,
    DeltaByteArray = 7,
    RleDictionary = 8,
    ByteStreamSplit = 9,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CompressionCodec {
    Uncompressed = 0,
    Snappy = 1,
    Gzip = 2,
    Lzo = 3,
    Brotli = 4,
    Lz4 = 5,
    Zstd = 6,
    Lz4Raw = 7,
}
