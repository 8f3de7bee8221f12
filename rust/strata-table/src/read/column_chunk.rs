//! Sequential page cursor over one column chunk.

use std::{
    io::{BufReader, Read, Seek, SeekFrom},
    sync::Arc,
};

use strata_common::{Result, error::Error};
use strata_encodings::{
    BuffersPool, Dictionary,
    compression::{Codec, codec_from_tag, lookup_codec},
};
use strata_format::{
    defs::{
        ColumnChunk, ColumnIndex, CompressionCodec, MAX_PAGE_HEADER_SIZE, OffsetIndex, PageHeader,
        PageType,
    },
    message::read_delimited_message,
    schema::LeafColumn,
};
use strata_io::{ReadAdapter, ReadAt, SlicedReadAt, utils::io_error};

use super::{
    options::ReaderOptions,
    page::{Page, PageDecodeContext, decode_data_page, decode_dictionary_page, verify_checksum},
};

/// Number of idle decompression buffers retained per cursor.
const POOLED_BUFFERS: usize = 4;

type SectionReader = BufReader<ReadAdapter<SlicedReadAt<Arc<dyn ReadAt>>>>;

/// Cursor producing the data pages of a column chunk in order.
///
/// The dictionary page is loaded lazily on the first [`read_page`](Self::read_page).
/// When the chunk has an offset index, [`seek_to_row`](Self::seek_to_row) jumps
/// directly to the page containing the target row; otherwise it rewinds to the first
/// data page and skips whole pages.
pub struct ColumnChunkCursor {
    column: Arc<LeafColumn>,
    /// `None` once closed.
    reader: Option<SectionReader>,
    /// Absolute offset of the chunk's first page.
    base: u64,
    /// Position in the chunk, relative to `base`.
    pos: u64,
    /// Position of the page being read, relative to `base`.
    page_start: u64,
    /// Absolute offset of the first data page.
    data_offset: u64,
    /// Absolute offset of the dictionary page, when the metadata declares one.
    dictionary_offset: Option<u64>,
    dictionary: Option<Arc<dyn Dictionary>>,
    dictionary_probed: bool,
    codec: &'static dyn Codec,
    codec_kind: CompressionCodec,
    offset_index: Option<Arc<OffsetIndex>>,
    column_index: Option<Arc<ColumnIndex>>,
    /// Ordinal of the next data page.
    page_index: usize,
    /// Rows still to be skipped from the next pages.
    skip: u64,
    header_scratch: Vec<u8>,
    raw: Vec<u8>,
    pool: Arc<BuffersPool>,
    verify_checksums: bool,
    batch_size: usize,
}

impl ColumnChunkCursor {
    pub fn open(
        reader: Arc<dyn ReadAt>,
        column: Arc<LeafColumn>,
        chunk: &ColumnChunk,
        offset_index: Option<Arc<OffsetIndex>>,
        column_index: Option<Arc<ColumnIndex>>,
        options: &ReaderOptions,
    ) -> Result<ColumnChunkCursor> {
        let open = || -> Result<ColumnChunkCursor> {
            let meta = chunk.meta()?;
            let range = meta.page_range()?;
            let data_offset = u64::try_from(meta.data_page_offset).map_err(|_| {
                Error::invalid_format(
                    "column chunk",
                    format!("negative data page offset {}", meta.data_page_offset),
                )
            })?;
            let dictionary_offset = meta
                .dictionary_page_offset
                .filter(|&offset| offset > 0)
                .map(|offset| offset as u64);
            let codec_kind = codec_from_tag(meta.codec)?;
            let codec = lookup_codec(codec_kind)?;

            let buffer_size = options.effective_read_buffer_size(&reader.storage_profile());
            let base = range.start;
            let section = SlicedReadAt::new(reader, range);
            Ok(ColumnChunkCursor {
                column: column.clone(),
                reader: Some(BufReader::with_capacity(
                    buffer_size,
                    ReadAdapter::new(section),
                )),
                base,
                pos: 0,
                page_start: 0,
                data_offset,
                dictionary_offset,
                dictionary: None,
                dictionary_probed: false,
                codec,
                codec_kind,
                offset_index,
                column_index,
                page_index: 0,
                skip: 0,
                header_scratch: Vec::new(),
                raw: Vec::new(),
                pool: BuffersPool::new(POOLED_BUFFERS),
                verify_checksums: options.verify_checksums,
                batch_size: options.effective_value_batch_size(),
            })
        };
        open().map_err(column.error_context(None, None))
    }

    pub fn column(&self) -> &Arc<LeafColumn> {
        &self.column
    }

    /// The chunk's dictionary, once loaded.
    pub fn dictionary(&self) -> Option<&Arc<dyn Dictionary>> {
        self.dictionary.as_ref()
    }

    pub fn offset_index(&self) -> Option<&Arc<OffsetIndex>> {
        self.offset_index.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// Returns the next data page, or `None` at the end of the chunk or after
    /// [`close`](Self::close).
    pub fn read_page(&mut self) -> Result<Option<Page>> {
        if self.reader.is_none() {
            return Ok(None);
        }
        self.next_page().map_err(|e| {
            e.in_column(
                self.column.path_string(),
                Some(self.page_index),
                Some(self.base + self.page_start),
            )
        })
    }

    /// Hands a page back to the cursor, recycling its buffer for the next pages.
    pub fn release(&mut self, page: Page) {
        drop(page);
    }

    /// Positions the cursor so that the next page returned starts at `row` of the
    /// chunk.
    pub fn seek_to_row(&mut self, row: u64) -> Result<()> {
        if self.reader.is_none() {
            return Err(Error::invalid_operation("seek on a closed column chunk cursor"));
        }
        self.seek(row)
            .map_err(self.column.error_context(None, None))
    }

    /// Releases the underlying reader. Subsequent reads report the end of the chunk.
    pub fn close(&mut self) {
        self.reader = None;
        self.raw = Vec::new();
    }

    fn seek(&mut self, row: u64) -> Result<()> {
        let Some(offset_index) = self.offset_index.clone() else {
            let start = self.relative("data page offset", self.data_offset)?;
            self.seek_to(start)?;
            self.skip = row;
            self.page_index = 0;
            log::debug!(
                "seek to row {row} of column '{}': rescanning from the first page",
                self.column.path_string()
            );
            return Ok(());
        };

        let locations = &offset_index.page_locations;
        let i = locations.partition_point(|loc| loc.first_row_index <= row as i64);
        if i == 0 {
            return Err(Error::out_of_range(
                "row",
                format!("seek out of range: row {row}"),
            ));
        }
        let location = &locations[i - 1];
        let first_row = location.first_row()?;
        let start = self.relative("page location offset", location.file_offset()?)?;
        self.seek_to(start)?;
        self.skip = row - first_row;
        self.page_index = i - 1;
        log::debug!(
            "seek to row {row} of column '{}': page {} at offset {}, skipping {} rows",
            self.column.path_string(),
            i - 1,
            self.base + start,
            self.skip
        );
        Ok(())
    }

    fn next_page(&mut self) -> Result<Option<Page>> {
        if !self.dictionary_probed {
            self.probe_dictionary()?;
        }
        loop {
            let Some(header) = self.read_header()? else {
                return Ok(None);
            };
            self.read_body(&header)?;
            if self.verify_checksums {
                verify_checksum(&header, &self.raw, &self.column, self.page_index)?;
            }

            match header.kind()? {
                PageType::DictionaryPage => {
                    if self.dictionary.is_none() {
                        self.load_dictionary(&header)?;
                    } else if self.page_index != 0 {
                        return Err(Error::invalid_format(
                            "dictionary page",
                            "dictionary page after the first data page",
                        ));
                    }
                }
                PageType::IndexPage => {}
                PageType::DataPage | PageType::DataPageV2 => {
                    let index = self.page_index;
                    let page = decode_data_page(&self.decode_context(), &header, &self.raw, index)?;
                    self.page_index += 1;
                    if self.skip == 0 {
                        return Ok(Some(page));
                    }
                    let num_rows = page.num_rows() as u64;
                    if num_rows <= self.skip {
                        self.skip -= num_rows;
                        log::trace!(
                            "skipped page {index} of column '{}' ({num_rows} rows)",
                            self.column.path_string()
                        );
                        continue;
                    }
                    let page = page.slice(self.skip as usize)?;
                    self.skip = 0;
                    return Ok(Some(page));
                }
            }
        }
    }

    /// Loads the dictionary page if the chunk starts with one, then restores the
    /// cursor position. A position at the start of the chunk moves to the first data
    /// page instead.
    fn probe_dictionary(&mut self) -> Result<()> {
        self.dictionary_probed = true;
        let saved = self.pos;
        let probe_at = self.relative(
            "dictionary page offset",
            self.dictionary_offset.unwrap_or(self.data_offset),
        )?;
        self.seek_to(probe_at)?;

        if let Some(header) = self.read_header()? {
            if header.kind()? == PageType::DictionaryPage {
                self.read_body(&header)?;
                if self.verify_checksums {
                    verify_checksum(&header, &self.raw, &self.column, self.page_index)?;
                }
                self.load_dictionary(&header)?;
                if self.dictionary_offset.is_none() {
                    self.data_offset = self.base + self.pos;
                }
            } else if self.dictionary_offset.is_some() {
                return Err(Error::invalid_format(
                    "dictionary page",
                    format!("expected a dictionary page, found {:?}", header.kind()?),
                ));
            }
        }

        if saved == 0 {
            let start = self.relative("data page offset", self.data_offset)?;
            self.seek_to(start)
        } else {
            self.seek_to(saved)
        }
    }

    fn load_dictionary(&mut self, header: &PageHeader) -> Result<()> {
        let dictionary = decode_dictionary_page(&self.decode_context(), header, &self.raw)?;
        if let Some(dictionary) = &dictionary {
            log::debug!(
                "loaded dictionary of {} entries for column '{}'",
                dictionary.len(),
                self.column.path_string()
            );
        }
        self.dictionary = dictionary;
        Ok(())
    }

    fn decode_context(&self) -> PageDecodeContext<'_> {
        PageDecodeContext {
            column: &self.column,
            codec: self.codec,
            codec_kind: self.codec_kind,
            column_index: self.column_index.as_deref(),
            dictionary: self.dictionary.as_ref(),
            pool: &self.pool,
            batch_size: self.batch_size,
        }
    }

    fn read_header(&mut self) -> Result<Option<PageHeader>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        self.page_start = self.pos;
        let Some((header, consumed)) = read_delimited_message::<PageHeader, _>(
            reader,
            &mut self.header_scratch,
            MAX_PAGE_HEADER_SIZE,
            "page header",
        )?
        else {
            return Ok(None);
        };
        self.pos += consumed as u64;
        Ok(Some(header))
    }

    fn read_body(&mut self, header: &PageHeader) -> Result<()> {
        let size = header.compressed_size()?;
        let Some(reader) = self.reader.as_mut() else {
            return Err(Error::invalid_operation("read on a closed column chunk cursor"));
        };
        self.raw.clear();
        self.raw.resize(size, 0);
        reader.read_exact(&mut self.raw).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::unexpected_eof("page body")
            } else {
                io_error("page body", e)
            }
        })?;
        self.pos += size as u64;
        Ok(())
    }

    fn seek_to(&mut self, pos: u64) -> Result<()> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(());
        };
        if pos != self.pos {
            reader
                .seek(SeekFrom::Start(pos))
                .map_err(|e| io_error("column chunk seek", e))?;
            self.pos = pos;
        }
        Ok(())
    }

    fn relative(&self, element: &str, offset: u64) -> Result<u64> {
        offset.checked_sub(self.base).ok_or_else(|| {
            Error::invalid_format(
                element.to_string(),
                format!("offset {offset} precedes the column chunk start {}", self.base),
            )
        })
    }
}

impl std::fmt::Debug for ColumnChunkCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnChunkCursor")
            .field("column", &self.column.path_string())
            .field("base", &self.base)
            .field("pos", &self.pos)
            .field("page_index", &self.page_index)
            .field("skip", &self.skip)
            .field("closed", &self.reader.is_none())
            .finish_non_exhaustive()
    }
}
