use std::sync::Arc;

use strata_common::error::{ErrorCategory, ErrorKind};
use strata_format::{
    defs::{
        ColumnChunk, ColumnIndex, CompressionCodec, Encoding, OffsetIndex, PageHeader,
        PageLocation, PhysicalType,
    },
    message::read_delimited_message,
    schema::{LeafColumn, Schema},
    value::Value,
};
use strata_io::ReadAt;

use crate::{
    read::{ColumnChunkCursor, ReaderOptions, page::PageFormat},
    tests::table_writer::{ChunkOptions, TableWriter, optional, repeated, required},
};

fn int_column() -> Arc<LeafColumn> {
    Schema::new("t", vec![LeafColumn::optional("x", PhysicalType::Int32)])
        .unwrap()
        .columns()[0]
        .clone()
}

/// Every third row is null, the others hold the row number.
fn int_rows(count: usize) -> Vec<Vec<Value>> {
    (0..count)
        .map(|i| {
            let value = (i % 3 != 0).then(|| Value::int32(i as i32));
            vec![optional(0, value)]
        })
        .collect()
}

fn write(
    column: &LeafColumn,
    rows: &[Vec<Value>],
    options: &ChunkOptions,
) -> (Arc<dyn ReadAt>, ColumnChunk) {
    let mut writer = TableWriter::new();
    let chunk = writer.write_chunk(column, rows, options);
    (writer.finish(), chunk)
}

fn open(
    reader: Arc<dyn ReadAt>,
    column: &Arc<LeafColumn>,
    chunk: &ColumnChunk,
    options: &ReaderOptions,
) -> ColumnChunkCursor {
    let offset_index = chunk.offset_index_range().unwrap().map(|range| {
        let bytes = reader_bytes(&reader, range.start, range.end);
        Arc::new(strata_format::message::decode_message::<OffsetIndex>(&bytes, "offset index").unwrap())
    });
    let column_index = chunk.column_index_range().unwrap().map(|range| {
        let bytes = reader_bytes(&reader, range.start, range.end);
        Arc::new(strata_format::message::decode_message::<ColumnIndex>(&bytes, "column index").unwrap())
    });
    ColumnChunkCursor::open(reader, column.clone(), chunk, offset_index, column_index, options)
        .unwrap()
}

fn reader_bytes(reader: &Arc<dyn ReadAt>, start: u64, end: u64) -> Vec<u8> {
    use strata_io::ReadAtExt;
    reader.read_vec_at(start, (end - start) as usize).unwrap()
}

fn read_all(cursor: &mut ColumnChunkCursor) -> Vec<Value> {
    let mut values = Vec::new();
    while let Some(page) = cursor.read_page().unwrap() {
        page.decode_into(&mut values).unwrap();
        cursor.release(page);
    }
    values
}

fn assert_int_rows(values: &[Value], first_row: usize) {
    for (i, value) in values.iter().enumerate() {
        let row = first_row + i;
        if row % 3 == 0 {
            assert!(value.is_null(), "row {row}");
            assert_eq!(value.definition_level(), 0);
        } else {
            assert_eq!(value.as_i32(), Some(row as i32), "row {row}");
            assert_eq!(value.definition_level(), 1);
        }
        assert_eq!(value.column(), 0);
    }
}

#[test]
fn test_read_pages_in_all_layouts() {
    let column = int_column();
    let rows = int_rows(1000);
    for format in [PageFormat::V1, PageFormat::V2] {
        for codec in [
            CompressionCodec::Uncompressed,
            CompressionCodec::Zstd,
            CompressionCodec::Lz4Raw,
        ] {
            for dictionary in [false, true] {
                let options = ChunkOptions {
                    format,
                    codec,
                    dictionary,
                    rows_per_page: 128,
                    ..Default::default()
                };
                let (reader, chunk) = write(&column, &rows, &options);
                let mut cursor = open(reader, &column, &chunk, &ReaderOptions::default());

                let mut values = Vec::new();
                let mut pages = 0;
                while let Some(page) = cursor.read_page().unwrap() {
                    assert_eq!(page.index(), pages);
                    assert_eq!(page.format(), format);
                    assert_eq!(page.is_indexed(), dictionary);
                    let first_row = pages * 128;
                    let expected_rows = 128.min(1000 - first_row);
                    assert_eq!(page.num_rows(), expected_rows);
                    assert_eq!(page.num_values(), expected_rows);
                    let expected_nulls = (first_row..first_row + expected_rows)
                        .filter(|r| r % 3 == 0)
                        .count();
                    assert_eq!(page.num_nulls(), expected_nulls);
                    page.decode_into(&mut values).unwrap();
                    cursor.release(page);
                    pages += 1;
                }
                assert_eq!(pages, 8, "{format:?} {codec:?} {dictionary}");
                assert_eq!(values.len(), 1000);
                assert_int_rows(&values, 0);
                assert!(cursor.read_page().unwrap().is_none());
                assert_eq!(cursor.dictionary().is_some(), dictionary);
            }
        }
    }
}

#[test]
fn test_page_bounds_from_statistics_and_column_index() {
    let column = int_column();
    let rows = int_rows(300);
    for column_index in [false, true] {
        let options = ChunkOptions {
            column_index,
            ..Default::default()
        };
        let (reader, chunk) = write(&column, &rows, &options);
        let mut cursor = open(reader, &column, &chunk, &ReaderOptions::default());
        let page = cursor.read_page().unwrap().unwrap();
        let bounds = page.bounds().unwrap();
        assert_eq!(bounds.min.as_i32(), Some(1));
        assert_eq!(bounds.max.as_i32(), Some(98));
        assert_eq!(page.num_nulls(), 34);
    }

    // Column index entries take precedence over the page statistics.
    let options = ChunkOptions::default();
    let (reader, chunk) = write(&column, &rows, &options);
    let column_index = ColumnIndex {
        null_pages: vec![false, true, false],
        min_values: vec![(-5i32).to_le_bytes().to_vec(), vec![], 7i32.to_le_bytes().to_vec()],
        max_values: vec![500i32.to_le_bytes().to_vec(), vec![], 9i32.to_le_bytes().to_vec()],
        boundary_order: 0,
        null_counts: vec![],
    };
    let mut cursor = ColumnChunkCursor::open(
        reader,
        column.clone(),
        &chunk,
        None,
        Some(Arc::new(column_index)),
        &ReaderOptions::default(),
    )
    .unwrap();
    let page = cursor.read_page().unwrap().unwrap();
    assert_eq!(page.bounds().unwrap().min.as_i32(), Some(-5));
    assert_eq!(page.bounds().unwrap().max.as_i32(), Some(500));
    let page = cursor.read_page().unwrap().unwrap();
    assert!(page.bounds().is_none());
}

#[test]
fn test_short_column_index_is_corruption() {
    let column = int_column();
    let (reader, chunk) = write(&column, &int_rows(300), &ChunkOptions::default());
    let column_index = ColumnIndex {
        null_pages: vec![false],
        min_values: vec![0i32.to_le_bytes().to_vec()],
        max_values: vec![1i32.to_le_bytes().to_vec()],
        ..Default::default()
    };
    let mut cursor = ColumnChunkCursor::open(
        reader,
        column,
        &chunk,
        None,
        Some(Arc::new(column_index)),
        &ReaderOptions::default(),
    )
    .unwrap();
    assert!(cursor.read_page().unwrap().is_some());
    let err = cursor.read_page().unwrap_err();
    assert!(err.is_corruption());
    assert!(err.to_string().contains("page index 1 exceeds column index"));
}

#[test]
fn test_index_bounds() {
    let column = Schema::new("t", vec![LeafColumn::optional("s", PhysicalType::ByteArray)])
        .unwrap()
        .columns()[0]
        .clone();
    let words = ["pear", "apple", "fig", "quince", "banana"];
    let rows: Vec<Vec<Value>> = (0..50)
        .map(|i| {
            let value = (i % 7 != 0).then(|| Value::byte_array(words[i % words.len()].as_bytes()));
            vec![optional(0, value)]
        })
        .collect();
    let options = ChunkOptions {
        dictionary: true,
        ..Default::default()
    };
    let (reader, chunk) = write(&column, &rows, &options);
    let mut cursor = open(reader, &column, &chunk, &ReaderOptions::default());
    let page = cursor.read_page().unwrap().unwrap();
    let bounds = page.index_bounds().unwrap().unwrap();
    assert_eq!(bounds.min.as_bytes(), Some(&b"apple"[..]));
    assert_eq!(bounds.max.as_bytes(), Some(&b"quince"[..]));
    let stats = page.bounds().unwrap();
    assert_eq!(stats.min.as_bytes(), bounds.min.as_bytes());
}

#[test]
fn test_seek_with_offset_index() {
    let column = int_column();
    let rows = int_rows(400);
    let options = ChunkOptions {
        page_rows: vec![100, 150, 150],
        ..Default::default()
    };
    let (reader, chunk) = write(&column, &rows, &options);
    let mut cursor = open(reader, &column, &chunk, &ReaderOptions::default());
    let locations = &cursor.offset_index().unwrap().page_locations;
    assert_eq!(
        locations.iter().map(|l| l.first_row_index).collect::<Vec<_>>(),
        vec![0, 100, 250]
    );

    cursor.seek_to_row(150).unwrap();
    let page = cursor.read_page().unwrap().unwrap();
    assert_eq!(page.index(), 1);
    assert_eq!(page.row_offset(), 50);
    assert_eq!(page.num_rows(), 100);
    let mut values = Vec::new();
    page.decode_into(&mut values).unwrap();
    assert_eq!(values.len(), 100);
    assert_int_rows(&values, 150);
    cursor.release(page);

    let page = cursor.read_page().unwrap().unwrap();
    assert_eq!(page.index(), 2);
    assert_eq!(page.row_offset(), 0);

    // Seeking backward is allowed on a cursor.
    cursor.seek_to_row(0).unwrap();
    let values = read_all(&mut cursor);
    assert_eq!(values.len(), 400);
    assert_int_rows(&values, 0);

    cursor.seek_to_row(250).unwrap();
    let page = cursor.read_page().unwrap().unwrap();
    assert_eq!((page.index(), page.row_offset()), (2, 0));
}

#[test]
fn test_seek_without_offset_index() {
    let column = int_column();
    let rows = int_rows(400);
    let options = ChunkOptions {
        page_rows: vec![100, 150, 150],
        offset_index: false,
        dictionary: true,
        ..Default::default()
    };
    let (reader, chunk) = write(&column, &rows, &options);
    let mut cursor = open(reader, &column, &chunk, &ReaderOptions::default());
    assert!(cursor.offset_index().is_none());

    // Seeking before the first read still loads the dictionary.
    cursor.seek_to_row(399).unwrap();
    let page = cursor.read_page().unwrap().unwrap();
    assert_eq!(page.index(), 2);
    assert_eq!(page.num_rows(), 1);
    let mut values = Vec::new();
    page.decode_into(&mut values).unwrap();
    assert_int_rows(&values, 399);
    cursor.release(page);
    assert!(cursor.read_page().unwrap().is_none());

    cursor.seek_to_row(150).unwrap();
    let values = read_all(&mut cursor);
    assert_eq!(values.len(), 250);
    assert_int_rows(&values, 150);

    // Seeking past the end yields no pages.
    cursor.seek_to_row(1000).unwrap();
    assert!(cursor.read_page().unwrap().is_none());
}

#[test]
fn test_seek_before_first_location() {
    let column = int_column();
    let (reader, chunk) = write(&column, &int_rows(100), &ChunkOptions::default());
    let offset = chunk.meta().unwrap().data_page_offset;
    let offset_index = OffsetIndex {
        page_locations: vec![PageLocation {
            offset,
            compressed_page_size: 10,
            first_row_index: 10,
        }],
    };
    let mut cursor = ColumnChunkCursor::open(
        reader,
        column,
        &chunk,
        Some(Arc::new(offset_index)),
        None,
        &ReaderOptions::default(),
    )
    .unwrap();
    let err = cursor.seek_to_row(5).unwrap_err();
    assert!(err.is_out_of_range());
    assert!(err.to_string().contains("seek out of range"));
}

#[test]
fn test_checksum_mismatch() {
    let column = int_column();
    let mut writer = TableWriter::new();
    let chunk = writer.write_chunk(&column, &int_rows(300), &ChunkOptions::default());
    let location = {
        let bytes = writer.data_mut();
        let range = chunk.offset_index_range().unwrap().unwrap();
        strata_format::message::decode_message::<OffsetIndex>(
            &bytes[range.start as usize..range.end as usize],
            "offset index",
        )
        .unwrap()
        .page_locations[1]
        .clone()
    };
    let last = (location.offset + location.compressed_page_size as i64 - 1) as usize;
    writer.data_mut()[last] ^= 0x40;
    let reader = writer.finish();

    let mut cursor = open(reader.clone(), &column, &chunk, &ReaderOptions::default());
    assert!(cursor.read_page().unwrap().is_some());
    let err = cursor.read_page().unwrap_err();
    assert!(matches!(err.root_kind(), ErrorKind::ChecksumMismatch { .. }));
    assert_eq!(err.category(), ErrorCategory::StructuralCorruption);
    assert!(err.to_string().contains("page 1"));

    // Forensic reads skip the verification.
    let options = ReaderOptions::default().with_verify_checksums(false);
    let mut cursor = open(reader, &column, &chunk, &options);
    assert_eq!(read_all(&mut cursor).len(), 300);
}

/// Byte ranges of the bodies of every page of the chunk, dictionary page first.
fn page_bodies(bytes: &[u8], chunk: &ColumnChunk) -> Vec<std::ops::Range<usize>> {
    let meta = chunk.meta_data.as_ref().unwrap();
    let start = meta.dictionary_page_offset.unwrap_or(meta.data_page_offset) as usize;
    let end = start + meta.total_compressed_size as usize;
    let mut input = std::io::Cursor::new(&bytes[..end]);
    input.set_position(start as u64);
    let mut scratch = Vec::new();
    let mut bodies = Vec::new();
    while let Some((header, _)) = read_delimited_message::<PageHeader, _>(
        &mut input,
        &mut scratch,
        1 << 20,
        "page header",
    )
    .unwrap()
    {
        let body_start = input.position() as usize;
        let body_end = body_start + header.compressed_page_size as usize;
        bodies.push(body_start..body_end);
        input.set_position(body_end as u64);
    }
    bodies
}

#[test]
fn test_any_corrupted_body_byte_fails_checksum() {
    let column = int_column();
    let rows = int_rows(60);
    for format in [PageFormat::V1, PageFormat::V2] {
        let options = ChunkOptions {
            format,
            codec: CompressionCodec::Zstd,
            dictionary: true,
            rows_per_page: 20,
            ..Default::default()
        };
        let mut writer = TableWriter::new();
        let chunk = writer.write_chunk(&column, &rows, &options);
        let pristine = writer.into_bytes();
        let bodies = page_bodies(&pristine, &chunk);
        assert_eq!(bodies.len(), 4);

        for (page, body) in bodies.iter().enumerate() {
            for pos in body.clone() {
                let mut bytes = pristine.clone();
                bytes[pos] ^= 0x01;
                let reader = strata_io::memory::shared_buffer(bytes);
                let mut cursor = open(reader, &column, &chunk, &ReaderOptions::default());
                let err = loop {
                    match cursor.read_page() {
                        Ok(Some(page)) => cursor.release(page),
                        Ok(None) => panic!("{format:?} page {page} byte {pos}: no error"),
                        Err(err) => break err,
                    }
                };
                assert!(
                    matches!(err.root_kind(), ErrorKind::ChecksumMismatch { .. }),
                    "{format:?} page {page} byte {pos}: {err}"
                );
            }
        }
    }
}

#[test]
fn test_delta_binary_packed_pages() {
    let schema = Schema::new(
        "t",
        vec![
            LeafColumn::optional("x", PhysicalType::Int32),
            LeafColumn::required("y", PhysicalType::Int64),
        ],
    )
    .unwrap();
    let small = schema.columns()[0].clone();
    let wide = schema.columns()[1].clone();
    let wide_rows: Vec<Vec<Value>> = (0..700i64)
        .map(|i| vec![required(1, Value::int64(i * i * 1_000_003 - 7_000_000_000))])
        .collect();

    for format in [PageFormat::V2, PageFormat::V1] {
        let options = ChunkOptions {
            format,
            codec: CompressionCodec::Lz4Raw,
            delta_binary_packed: true,
            rows_per_page: 150,
            ..Default::default()
        };

        let (reader, chunk) = write(&small, &int_rows(1000), &options);
        assert_eq!(
            chunk.meta_data.as_ref().unwrap().encodings,
            vec![Encoding::DeltaBinaryPacked as i32]
        );
        let mut cursor = open(reader, &small, &chunk, &ReaderOptions::default());
        let page = cursor.read_page().unwrap().unwrap();
        assert_eq!(page.encoding(), Encoding::DeltaBinaryPacked);
        assert!(!page.is_indexed());
        cursor.release(page);
        cursor.seek_to_row(0).unwrap();
        let values = read_all(&mut cursor);
        assert_eq!(values.len(), 1000);
        assert_int_rows(&values, 0);

        let (reader, chunk) = write(&wide, &wide_rows, &options);
        let mut cursor = open(reader, &wide, &chunk, &ReaderOptions::default());
        let values = read_all(&mut cursor);
        let expected: Vec<Option<i64>> = wide_rows.iter().map(|r| r[0].as_i64()).collect();
        let actual: Vec<Option<i64>> = values.iter().map(Value::as_i64).collect();
        assert_eq!(actual, expected, "{format:?}");
        assert!(values.iter().all(|v| v.column() == 1));
    }
}

#[test]
fn test_lazy_dictionary_detection() {
    let column = int_column();
    let rows = int_rows(500);
    for legacy_dictionary_tags in [false, true] {
        let options = ChunkOptions {
            dictionary: true,
            record_dictionary_offset: false,
            legacy_dictionary_tags,
            format: PageFormat::V2,
            codec: CompressionCodec::Zstd,
            ..Default::default()
        };
        let (reader, chunk) = write(&column, &rows, &options);
        assert!(chunk.meta().unwrap().dictionary_page_offset.is_none());

        let mut cursor = open(reader, &column, &chunk, &ReaderOptions::default());
        let page = cursor.read_page().unwrap().unwrap();
        assert_eq!(page.encoding(), Encoding::RleDictionary);
        assert!(cursor.dictionary().is_some());
        cursor.release(page);

        cursor.seek_to_row(0).unwrap();
        let values = read_all(&mut cursor);
        assert_eq!(values.len(), 500);
        assert_int_rows(&values, 0);
    }
}

#[test]
fn test_declared_dictionary_offset_must_hold_a_dictionary() {
    let column = int_column();
    let (reader, mut chunk) = write(&column, &int_rows(10), &ChunkOptions::default());
    let meta = chunk.meta_data.as_mut().unwrap();
    meta.dictionary_page_offset = Some(meta.data_page_offset);
    let mut cursor = open(reader, &column, &chunk, &ReaderOptions::default());
    let err = cursor.read_page().unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn test_nested_column_levels() {
    let column = Schema::new("t", vec![LeafColumn::repeated("list", PhysicalType::Int64)])
        .unwrap()
        .columns()[0]
        .clone();
    let rows: Vec<Vec<Value>> = (0..200)
        .map(|i: i64| repeated(0, (0..i % 4).map(|j| Value::int64(i * 10 + j)).collect()))
        .collect();
    let total_values: usize = rows.iter().map(Vec::len).sum();
    for format in [PageFormat::V1, PageFormat::V2] {
        let options = ChunkOptions {
            format,
            rows_per_page: 64,
            ..Default::default()
        };
        let (reader, chunk) = write(&column, &rows, &options);
        let mut cursor = open(reader, &column, &chunk, &ReaderOptions::default());
        let page = cursor.read_page().unwrap().unwrap();
        assert_eq!(page.num_rows(), 64);
        assert_eq!(page.num_nulls(), 16);
        cursor.release(page);

        cursor.seek_to_row(0).unwrap();
        let values = read_all(&mut cursor);
        assert_eq!(values.len(), total_values);
        let expected: Vec<Value> = rows.iter().flatten().cloned().collect();
        for (actual, expected) in values.iter().zip(&expected) {
            assert_eq!(actual.repetition_level(), expected.repetition_level());
            assert_eq!(actual.definition_level(), expected.definition_level());
            assert_eq!(actual.as_i64(), expected.as_i64());
        }

        // A seek into the middle of a page skips whole rows.
        cursor.seek_to_row(70).unwrap();
        let page = cursor.read_page().unwrap().unwrap();
        let mut values = Vec::new();
        page.decode_into(&mut values).unwrap();
        let expected: Vec<Value> = rows[70..128].iter().flatten().cloned().collect();
        assert_eq!(values.len(), expected.len());
        assert_eq!(values[0].repetition_level(), 0);
        assert_eq!(values.last().unwrap().as_i64(), expected.last().unwrap().as_i64());
    }
}

#[test]
fn test_null_only_column() {
    let column = Schema::new("t", vec![LeafColumn::optional("ts", PhysicalType::Int96)])
        .unwrap()
        .columns()[0]
        .clone();
    let rows: Vec<Vec<Value>> = (0..20)
        .map(|i| {
            vec![optional(0, (i % 2 == 0).then(Value::null))]
        })
        .collect();
    let options = ChunkOptions {
        statistics: false,
        ..Default::default()
    };
    let (reader, chunk) = write(&column, &rows, &options);
    let mut cursor = open(reader, &column, &chunk, &ReaderOptions::default());
    let page = cursor.read_page().unwrap().unwrap();
    assert!(page.bounds().is_none());
    assert_eq!(page.num_nulls(), 10);
    let mut values = Vec::new();
    page.decode_into(&mut values).unwrap();
    assert_eq!(values.len(), 20);
    assert!(values.iter().all(Value::is_null));
}

#[test]
fn test_required_column_without_levels() {
    let column = Schema::new("t", vec![LeafColumn::required("b", PhysicalType::Boolean)])
        .unwrap()
        .columns()[0]
        .clone();
    let rows: Vec<Vec<Value>> = (0..77)
        .map(|i| vec![required(0, Value::boolean(i % 5 == 0))])
        .collect();
    let (reader, chunk) = write(&column, &rows, &ChunkOptions::default());
    let mut cursor = open(reader, &column, &chunk, &ReaderOptions::default().with_value_batch_size(8));
    let values = read_all(&mut cursor);
    let expected: Vec<Option<bool>> = (0..77).map(|i| Some(i % 5 == 0)).collect();
    assert_eq!(values.iter().map(Value::as_bool).collect::<Vec<_>>(), expected);
}

#[test]
fn test_close() {
    let column = int_column();
    let (reader, chunk) = write(&column, &int_rows(300), &ChunkOptions::default());
    let mut cursor = open(reader, &column, &chunk, &ReaderOptions::default());
    assert!(cursor.read_page().unwrap().is_some());
    cursor.close();
    assert!(cursor.is_closed());
    assert!(cursor.read_page().unwrap().is_none());
    assert!(cursor.read_page().unwrap().is_none());
    assert!(cursor.seek_to_row(0).is_err());
}

#[test]
fn test_truncated_chunk() {
    let column = int_column();
    let mut writer = TableWriter::new();
    let chunk = writer.write_chunk(&column, &int_rows(300), &ChunkOptions::default());
    let mut bytes = writer.into_bytes();
    let end = chunk.meta().unwrap().page_range().unwrap().end as usize;
    bytes.truncate(end - 5);
    let reader = strata_io::memory::shared_buffer(bytes);
    let mut cursor = open_without_indexes(reader, &column, &chunk);
    let err = (0..3).find_map(|_| cursor.read_page().err()).unwrap();
    assert!(matches!(err.root_kind(), ErrorKind::UnexpectedEof { .. }));
}

#[test]
fn test_unsupported_codec() {
    let column = int_column();
    let (reader, mut chunk) = write(&column, &int_rows(10), &ChunkOptions::default());
    chunk.meta_data.as_mut().unwrap().codec = CompressionCodec::Snappy as i32;
    let err = ColumnChunkCursor::open(reader, column, &chunk, None, None, &ReaderOptions::default())
        .unwrap_err();
    assert!(matches!(err.root_kind(), ErrorKind::NotImplemented { .. }));
}

fn open_without_indexes(
    reader: Arc<dyn ReadAt>,
    column: &Arc<LeafColumn>,
    chunk: &ColumnChunk,
) -> ColumnChunkCursor {
    ColumnChunkCursor::open(reader, column.clone(), chunk, None, None, &ReaderOptions::default())
        .unwrap()
}
