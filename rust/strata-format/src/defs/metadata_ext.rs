use std::ops::Range;

use strata_common::{Result, error::Error};

use super::{ColumnChunk, ColumnMetaData, PageLocation};

impl ColumnChunk {
    /// Returns the chunk's column metadata, which every readable chunk must carry.
    pub fn meta(&self) -> Result<&ColumnMetaData> {
        self.meta_data
            .as_ref()
            .ok_or_else(|| Error::invalid_format("column chunk", "missing column metadata"))
    }

    /// Byte range of the serialized offset index, if the chunk has one.
    pub fn offset_index_range(&self) -> Result<Option<Range<u64>>> {
        index_range(
            "offset index",
            self.offset_index_offset,
            self.offset_index_length,
        )
    }

    /// Byte range of the serialized column index, if the chunk has one.
    pub fn column_index_range(&self) -> Result<Option<Range<u64>>> {
        index_range(
            "column index",
            self.column_index_offset,
            self.column_index_length,
        )
    }
}

impl ColumnMetaData {
    /// Byte range of the chunk's pages: from the dictionary page (or the first data page
    /// when there is none) spanning `total_compressed_size` bytes.
    pub fn page_range(&self) -> Result<Range<u64>> {
        let start = self
            .dictionary_page_offset
            .filter(|&offset| offset > 0)
            .unwrap_or(self.data_page_offset);
        let start = non_negative("column chunk offset", start)?;
        let len = non_negative("column chunk size", self.total_compressed_size)?;
        Ok(start..start + len)
    }
}

impl PageLocation {
    pub fn first_row(&self) -> Result<u64> {
        non_negative("page location row index", self.first_row_index)
    }

    pub fn file_offset(&self) -> Result<u64> {
        non_negative("page location offset", self.offset)
    }
}

fn index_range(
    element: &str,
    offset: Option<i64>,
    length: Option<i32>,
) -> Result<Option<Range<u64>>> {
    match (offset, length) {
        (Some(offset), Some(length)) => {
            let offset = non_negative(element, offset)?;
            let length = non_negative(element, length as i64)?;
            Ok(Some(offset..offset + length))
        }
        _ => Ok(None),
    }
}

fn non_negative(element: &str, value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| Error::invalid_format(element, format!("negative value {value}")))
}
