use strata_common::{Result, error::Error};

use super::{Encoding, PageHeader, PageType, Statistics};

impl PageHeader {
    /// Returns the page type, rejecting unknown values.
    pub fn kind(&self) -> Result<PageType> {
        PageType::try_from(self.page_type).map_err(|_| {
            Error::invalid_format(
                "page header",
                format!("unknown page type {}", self.page_type),
            )
        })
    }

    /// Size of the (possibly compressed) page body following the header.
    pub fn compressed_size(&self) -> Result<usize> {
        usize::try_from(self.compressed_page_size).map_err(|_| {
            Error::invalid_format(
                "page header",
                format!("negative compressed page size {}", self.compressed_page_size),
            )
        })
    }

    /// Size of the page body after decompression.
    pub fn uncompressed_size(&self) -> Result<usize> {
        usize::try_from(self.uncompressed_page_size).map_err(|_| {
            Error::invalid_format(
                "page header",
                format!(
                    "negative uncompressed page size {}",
                    self.uncompressed_page_size
                ),
            )
        })
    }

    /// Statistics embedded in a V1 or V2 data page header.
    pub fn statistics(&self) -> Option<&Statistics> {
        if let Some(header) = &self.data_page_header_v2 {
            header.statistics.as_ref()
        } else {
            self.data_page_header
                .as_ref()
                .and_then(|header| header.statistics.as_ref())
        }
    }
}

impl Encoding {
    /// Maps the legacy dictionary tag of a data page to the canonical
    /// dictionary-indices encoding.
    pub fn normalize_data(self) -> Encoding {
        match self {
            Encoding::PlainDictionary => Encoding::RleDictionary,
            other => other,
        }
    }

    /// Maps the legacy dictionary tag of a dictionary page to plain encoding.
    pub fn normalize_dictionary(self) -> Encoding {
        match self {
            Encoding::PlainDictionary => Encoding::Plain,
            other => other,
        }
    }

    pub fn is_dictionary(self) -> bool {
        matches!(self, Encoding::PlainDictionary | Encoding::RleDictionary)
    }

    /// Parses a raw encoding tag, rejecting unknown values.
    pub fn from_tag(tag: i32) -> Result<Encoding> {
        Encoding::try_from(tag)
            .map_err(|_| Error::invalid_format("encoding", format!("unknown encoding {tag}")))
    }
}

impl Statistics {
    /// Minimum value bytes, preferring the current field over the deprecated one.
    pub fn min_bytes(&self) -> Option<&[u8]> {
        self.min_value.as_deref().or(self.min.as_deref())
    }

    /// Maximum value bytes, preferring the current field over the deprecated one.
    pub fn max_bytes(&self) -> Option<&[u8]> {
        self.max_value.as_deref().or(self.max.as_deref())
    }
}
