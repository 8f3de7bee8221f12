//! Decoding of data pages: checksum verification, V1/V2 body layouts, decompression,
//! row and null counting and min/max bounds resolution.

use std::{ops::Range, sync::Arc};

use strata_common::{Result, error::Error};
use strata_encodings::{
    BuffersPool, Dictionary, LevelStream, PooledBuffer, ValueDecoder, compression::Codec,
    dictionary::read_dictionary,
};
use strata_format::{
    checksum,
    defs::{
        ColumnIndex, CompressionCodec, DataPageHeaderV2, Encoding, PageHeader, PageType,
        Statistics,
    },
    schema::LeafColumn,
    value::{Kind, Value},
};

use super::page_values::PageValues;

/// Body layout of a data page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    /// Levels and values compressed together, each level block prefixed with its
    /// `u32` length.
    V1,
    /// Uncompressed levels of declared lengths followed by (optionally compressed)
    /// values.
    V2,
}

/// Minimum and maximum value of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageBounds {
    pub min: Value,
    pub max: Value,
}

/// Decoded view of one data page of a column chunk.
///
/// The page owns its decompressed body (a buffer borrowed from the cursor's pool) and
/// decodes values lazily through [`Page::values`]. After a seek, `row_offset` leading
/// rows of the page are skipped by every read.
#[derive(Debug)]
pub struct Page {
    column: Arc<LeafColumn>,
    index: usize,
    format: PageFormat,
    encoding: Encoding,
    num_values: usize,
    num_rows: usize,
    num_nulls: usize,
    bounds: Option<PageBounds>,
    dictionary: Option<Arc<dyn Dictionary>>,
    data: PooledBuffer,
    repetition_levels: Range<usize>,
    definition_levels: Range<usize>,
    values: Range<usize>,
    row_offset: usize,
    batch_size: usize,
}

impl Page {
    pub fn column(&self) -> &Arc<LeafColumn> {
        &self.column
    }

    /// Ordinal of the page among the data pages of its column chunk.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn format(&self) -> PageFormat {
        self.format
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Number of values in the page, nulls included.
    pub fn num_values(&self) -> usize {
        self.num_values
    }

    /// Number of rows in the page, excluding skipped leading rows.
    pub fn num_rows(&self) -> usize {
        self.num_rows - self.row_offset
    }

    pub fn num_nulls(&self) -> usize {
        self.num_nulls
    }

    /// Leading rows skipped by reads.
    pub fn row_offset(&self) -> usize {
        self.row_offset
    }

    pub fn bounds(&self) -> Option<&PageBounds> {
        self.bounds.as_ref()
    }

    pub fn is_indexed(&self) -> bool {
        self.encoding == Encoding::RleDictionary
    }

    pub fn dictionary(&self) -> Option<&Arc<dyn Dictionary>> {
        self.dictionary.as_ref()
    }

    /// Returns the page with its first `rows` rows skipped.
    pub fn slice(mut self, rows: usize) -> Result<Page> {
        if rows > self.num_rows {
            return Err(Error::out_of_range(
                "page slice",
                format!("cannot skip {rows} rows of a page with {}", self.num_rows),
            ));
        }
        self.row_offset = rows;
        Ok(self)
    }

    /// Creates a reader over the values of the page, positioned after the skipped
    /// leading rows.
    pub fn values(&self) -> Result<PageValues<'_>> {
        self.open_values().map_err(self.error_context())
    }

    /// Decodes the values of the remaining rows of the page into `out`.
    pub fn decode_into(&self, out: &mut Vec<Value>) -> Result<()> {
        let mut values = self.values()?;
        values
            .read_to_end(out, self.batch_size)
            .map_err(self.error_context())
    }

    /// Bounds of a dictionary-encoded page computed from its index stream, without
    /// materializing the values. `None` for pages that are not dictionary-encoded or
    /// hold only nulls.
    pub fn index_bounds(&self) -> Result<Option<PageBounds>> {
        self.compute_index_bounds().map_err(self.error_context())
    }

    fn compute_index_bounds(&self) -> Result<Option<PageBounds>> {
        let Some(dictionary) = self.dictionary.as_ref().filter(|_| self.is_indexed()) else {
            return Ok(None);
        };
        let non_null = self.count_definition_levels(|def, max| def == max)?;
        let mut decoder = ValueDecoder::new(
            self.column.kind(),
            self.column.index() as u16,
            self.column.type_length(),
            Some(dictionary.clone()),
        );
        decoder.reset(self.encoding, &self.data[self.values.clone()], non_null)?;
        let mut indexes = Vec::with_capacity(non_null);
        let n = decoder.read_indexes(&mut indexes, non_null)?;
        if n < non_null {
            return Err(Error::unexpected_eof("dictionary indexes"));
        }
        Ok(dictionary
            .bounds(&indexes)?
            .map(|(min, max)| PageBounds { min, max }))
    }

    fn open_values(&self) -> Result<PageValues<'_>> {
        let column = &self.column;
        let batch_size = self.batch_size;
        let repetition_levels = LevelStream::new(
            &self.data[self.repetition_levels.clone()],
            column.max_repetition_level(),
            self.num_values,
            batch_size,
        )?;
        let definition_levels = LevelStream::new(
            &self.data[self.definition_levels.clone()],
            column.max_definition_level(),
            self.num_values,
            batch_size,
        )?;
        let mut decoder = ValueDecoder::new(
            column.kind(),
            column.index() as u16,
            column.type_length(),
            self.dictionary.clone(),
        );
        decoder.reset(self.encoding, &self.data[self.values.clone()], self.num_values)?;
        let mut values = PageValues::new(
            column.index() as u16,
            column.max_repetition_level(),
            column.max_definition_level(),
            repetition_levels,
            definition_levels,
            decoder,
            self.num_values,
        );
        if self.row_offset > 0 {
            let skip = self.leading_values(self.row_offset)?;
            let mut scratch = vec![Value::null(); skip.min(batch_size)];
            let mut skipped = 0;
            while skipped < skip {
                let want = (skip - skipped).min(scratch.len());
                let n = values.read_values(&mut scratch[..want])?;
                if n == 0 {
                    break;
                }
                skipped += n;
            }
        }
        Ok(values)
    }

    /// Number of values spanned by the first `rows` rows.
    fn leading_values(&self, rows: usize) -> Result<usize> {
        if self.column.max_repetition_level() == 0 {
            return Ok(rows);
        }
        let mut levels = LevelStream::new(
            &self.data[self.repetition_levels.clone()],
            self.column.max_repetition_level(),
            self.num_values,
            self.batch_size,
        )?;
        let mut values = 0;
        let mut starts = 0;
        loop {
            let window = levels.peek()?;
            if window.is_empty() {
                return Ok(values);
            }
            for &level in window {
                if level == 0 {
                    if starts == rows {
                        return Ok(values);
                    }
                    starts += 1;
                }
                values += 1;
            }
            let n = window.len();
            levels.discard(n);
        }
    }

    fn count_definition_levels(&self, predicate: impl Fn(u8, u8) -> bool) -> Result<usize> {
        let max = self.column.max_definition_level();
        if max == 0 {
            return Ok(self.num_values);
        }
        LevelStream::new(
            &self.data[self.definition_levels.clone()],
            max,
            self.num_values,
            self.batch_size,
        )?
        .count(|level| predicate(level, max))
    }

    fn error_context(&self) -> impl FnOnce(Error) -> Error + '_ {
        self.column.error_context(Some(self.index), None)
    }
}

/// Collaborators needed to decode the data pages of one column chunk.
pub(crate) struct PageDecodeContext<'a> {
    pub column: &'a Arc<LeafColumn>,
    pub codec: &'static dyn Codec,
    pub codec_kind: CompressionCodec,
    pub column_index: Option<&'a ColumnIndex>,
    pub dictionary: Option<&'a Arc<dyn Dictionary>>,
    pub pool: &'a Arc<BuffersPool>,
    pub batch_size: usize,
}

/// Verifies the CRC-32 of the raw page bytes when the header declares one.
pub(crate) fn verify_checksum(
    header: &PageHeader,
    raw: &[u8],
    column: &LeafColumn,
    page: usize,
) -> Result<()> {
    let Some(expected) = header.crc else {
        return Ok(());
    };
    checksum::validate_buffer(raw, expected, Some("page")).inspect_err(|_| {
        log::warn!(
            "crc32 checksum mismatch in page {page} of column '{}': expected {expected:#010x}, \
             computed {:#010x}",
            column.path_string(),
            checksum::compute(raw)
        );
    })
}

/// Decodes a dictionary page into a dictionary for the column. Columns without a value
/// kind decode every value as null and need no dictionary.
pub(crate) fn decode_dictionary_page(
    ctx: &PageDecodeContext,
    header: &PageHeader,
    raw: &[u8],
) -> Result<Option<Arc<dyn Dictionary>>> {
    let page = header.dictionary_page_header.as_ref().ok_or_else(|| {
        Error::invalid_format("dictionary page", "missing dictionary page header")
    })?;
    let Some(kind) = ctx.column.kind() else {
        return Ok(None);
    };
    let num_values = non_negative("num_values", page.num_values)?;
    let encoding = Encoding::from_tag(page.encoding)?;

    let mut buffer = ctx.pool.get_buffer();
    let data: &[u8] = if ctx.codec_kind == CompressionCodec::Uncompressed {
        raw
    } else {
        ctx.codec.decode(raw, header.uncompressed_size()?, &mut buffer)?;
        &buffer
    };
    let dictionary = read_dictionary(kind, ctx.column.type_length(), encoding, data, num_values)?;
    Ok(Some(Arc::from(dictionary)))
}

/// Decodes a data page from its raw (possibly compressed) bytes.
pub(crate) fn decode_data_page(
    ctx: &PageDecodeContext,
    header: &PageHeader,
    raw: &[u8],
    index: usize,
) -> Result<Page> {
    let column = ctx.column;
    let mut data = ctx.pool.get_buffer();
    let (format, encoding, num_values, layout, statistics) = match header.kind()? {
        PageType::DataPage => {
            let page = header.data_page_header.as_ref().ok_or_else(|| {
                Error::invalid_format("data page", "missing data page header")
            })?;
            let layout = split_v1(ctx, header, raw, &mut data)?;
            let num_values = non_negative("num_values", page.num_values)?;
            let encoding = Encoding::from_tag(page.encoding)?.normalize_data();
            (PageFormat::V1, encoding, num_values, layout, page.statistics.as_ref())
        }
        PageType::DataPageV2 => {
            let page = header.data_page_header_v2.as_ref().ok_or_else(|| {
                Error::invalid_format("data page", "missing data page v2 header")
            })?;
            let layout = split_v2(ctx, header, page, raw, &mut data)?;
            let num_values = non_negative("num_values", page.num_values)?;
            let encoding = Encoding::from_tag(page.encoding)?.normalize_data();
            (PageFormat::V2, encoding, num_values, layout, page.statistics.as_ref())
        }
        other => {
            return Err(Error::invalid_format(
                "data page",
                format!("expected a data page, found {other:?}"),
            ));
        }
    };

    let resolved = resolve_statistics(column, statistics, ctx.column_index, index)?;

    let mut page = Page {
        column: column.clone(),
        index,
        format,
        encoding,
        num_values,
        num_rows: 0,
        num_nulls: 0,
        bounds: resolved.bounds,
        dictionary: ctx.dictionary.cloned(),
        data,
        repetition_levels: layout.repetition_levels,
        definition_levels: layout.definition_levels,
        values: layout.values,
        row_offset: 0,
        batch_size: ctx.batch_size,
    };

    match format {
        PageFormat::V2 => {
            let v2 = header.data_page_header_v2.as_ref();
            page.num_rows = v2.map_or(Ok(0), |h| non_negative("num_rows", h.num_rows))?;
            page.num_nulls = v2.map_or(Ok(0), |h| non_negative("num_nulls", h.num_nulls))?;
        }
        PageFormat::V1 => {
            page.num_rows = if column.max_repetition_level() > 0 {
                LevelStream::new(
                    &page.data[page.repetition_levels.clone()],
                    column.max_repetition_level(),
                    num_values,
                    ctx.batch_size,
                )?
                .count(|level| level == 0)?
            } else {
                num_values
            };
            page.num_nulls = match resolved.null_count {
                Some(null_count) => null_count,
                None if column.max_definition_level() == 0 => 0,
                None => page.count_definition_levels(|def, max| def < max)?,
            };
        }
    }

    log::trace!(
        "decoded {format:?} page {index} of column '{}': {} values, {} rows, {} nulls, {encoding:?}",
        column.path_string(),
        page.num_values,
        page.num_rows,
        page.num_nulls,
    );
    Ok(page)
}

struct PageLayout {
    repetition_levels: Range<usize>,
    definition_levels: Range<usize>,
    values: Range<usize>,
}

fn split_v1(
    ctx: &PageDecodeContext,
    header: &PageHeader,
    raw: &[u8],
    data: &mut PooledBuffer,
) -> Result<PageLayout> {
    if ctx.codec_kind == CompressionCodec::Uncompressed {
        data.extend_from_slice(raw);
    } else {
        ctx.codec.decode(raw, header.uncompressed_size()?, data)?;
    }

    let mut pos = 0;
    let repetition_levels = level_block(data, &mut pos, ctx.column.max_repetition_level())?;
    let definition_levels = level_block(data, &mut pos, ctx.column.max_definition_level())?;
    Ok(PageLayout {
        repetition_levels,
        definition_levels,
        values: pos..data.len(),
    })
}

/// Locates a `u32` length-prefixed level block at `*pos`. Columns whose max level is 0
/// have no block.
fn level_block(data: &[u8], pos: &mut usize, max_level: u8) -> Result<Range<usize>> {
    if max_level == 0 {
        return Ok(*pos..*pos);
    }
    let start = *pos + 4;
    let prefix = data
        .get(*pos..start)
        .ok_or_else(|| Error::unexpected_eof("level block length"))?;
    let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| Error::unexpected_eof("level block"))?;
    *pos = end;
    Ok(start..end)
}

fn split_v2(
    ctx: &PageDecodeContext,
    header: &PageHeader,
    page: &DataPageHeaderV2,
    raw: &[u8],
    data: &mut PooledBuffer,
) -> Result<PageLayout> {
    let rep_len = non_negative(
        "repetition_levels_byte_length",
        page.repetition_levels_byte_length,
    )?;
    let def_len = non_negative(
        "definition_levels_byte_length",
        page.definition_levels_byte_length,
    )?;
    let levels_len = rep_len + def_len;
    if levels_len > raw.len() {
        return Err(Error::unexpected_eof("page levels"));
    }
    data.extend_from_slice(&raw[..levels_len]);

    let values = &raw[levels_len..];
    let compressed =
        ctx.codec_kind != CompressionCodec::Uncompressed && page.is_compressed.unwrap_or(true);
    if compressed {
        let uncompressed = header
            .uncompressed_size()?
            .checked_sub(levels_len)
            .ok_or_else(|| {
                Error::invalid_format(
                    "data page v2",
                    "level lengths exceed the uncompressed page size",
                )
            })?;
        ctx.codec.decode(values, uncompressed, data)?;
    } else {
        data.extend_from_slice(values);
    }
    Ok(PageLayout {
        repetition_levels: 0..rep_len,
        definition_levels: rep_len..levels_len,
        values: levels_len..data.len(),
    })
}

struct ResolvedStatistics {
    bounds: Option<PageBounds>,
    null_count: Option<usize>,
}

/// Resolves page bounds and null count, preferring the column index entry of the page
/// and falling back to the page statistics.
fn resolve_statistics(
    column: &LeafColumn,
    statistics: Option<&Statistics>,
    column_index: Option<&ColumnIndex>,
    index: usize,
) -> Result<ResolvedStatistics> {
    let kind = column.kind();
    let stats_null_count = statistics
        .and_then(|s| s.null_count)
        .map(|n| non_negative_i64("null_count", n))
        .transpose()?;

    if let Some(column_index) = column_index {
        let null_page = *column_index
            .null_pages
            .get(index)
            .ok_or_else(|| exceeds_column_index("null pages", index))?;
        let min = column_index
            .min_values
            .get(index)
            .ok_or_else(|| exceeds_column_index("min values", index))?;
        let max = column_index
            .max_values
            .get(index)
            .ok_or_else(|| exceeds_column_index("max values", index))?;
        let null_count = if column_index.null_counts.is_empty() {
            None
        } else {
            let n = *column_index
                .null_counts
                .get(index)
                .ok_or_else(|| exceeds_column_index("null counts", index))?;
            Some(non_negative_i64("null_count", n)?)
        };
        let bounds = match kind {
            Some(kind) if !null_page => Some(parse_bounds(kind, min, max)?),
            _ => None,
        };
        return Ok(ResolvedStatistics {
            bounds,
            null_count: stats_null_count.or(null_count),
        });
    }

    let bounds = match (kind, statistics) {
        (Some(kind), Some(stats)) => match (stats.min_bytes(), stats.max_bytes()) {
            (Some(min), Some(max)) => Some(parse_bounds(kind, min, max)?),
            _ => None,
        },
        _ => None,
    };
    Ok(ResolvedStatistics {
        bounds,
        null_count: stats_null_count,
    })
}

fn parse_bounds(kind: Kind, min: &[u8], max: &[u8]) -> Result<PageBounds> {
    Ok(PageBounds {
        min: Value::parse(kind, min)?,
        max: Value::parse(kind, max)?,
    })
}

fn exceeds_column_index(what: &str, index: usize) -> Error {
    Error::invalid_format(
        "column index",
        format!("page index {index} exceeds column index {what}"),
    )
}

fn non_negative(name: &str, value: i32) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::invalid_format(name.to_string(), format!("negative value {value}")))
}

fn non_negative_i64(name: &str, value: i64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::invalid_format(name.to_string(), format!("negative value {value}")))
}
