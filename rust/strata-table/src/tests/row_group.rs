use std::{io::Write, sync::Arc};

use strata_common::error::ErrorKind;
use strata_format::{
    defs::{self, CompressionCodec, PhysicalType},
    schema::{LeafColumn, Schema},
    value::Value,
};

use crate::{
    read::{ReaderOptions, Row, RowGroup, Rows, page::PageFormat},
    tests::table_writer::{ChunkOptions, TableWriter, optional, repeated, required},
};

fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::new(
            "events",
            vec![
                LeafColumn::required("id", PhysicalType::Int64),
                LeafColumn::optional("name", PhysicalType::ByteArray),
                LeafColumn::repeated("tags", PhysicalType::Int32),
            ],
        )
        .unwrap(),
    )
}

fn make_row(i: i64) -> Row {
    let mut row = vec![required(0, Value::int64(i))];
    let name = (i % 4 != 1).then(|| Value::byte_array(format!("name-{}", i % 9)));
    row.push(optional(1, name));
    row.extend(repeated(
        2,
        (0..i % 3).map(|j| Value::int32((i * 3 + j) as i32)).collect(),
    ));
    row
}

fn chunk_options(column: &LeafColumn) -> ChunkOptions {
    match column.index() {
        0 => ChunkOptions {
            rows_per_page: 100,
            ..Default::default()
        },
        1 => ChunkOptions {
            rows_per_page: 37,
            dictionary: true,
            codec: CompressionCodec::Zstd,
            ..Default::default()
        },
        _ => ChunkOptions {
            rows_per_page: 64,
            format: PageFormat::V2,
            codec: CompressionCodec::Lz4Raw,
            ..Default::default()
        },
    }
}

fn write_group(rows: &[Row]) -> (Arc<dyn strata_io::ReadAt>, defs::RowGroup) {
    let mut writer = TableWriter::new();
    let meta = writer.write_row_group(&schema(), rows, chunk_options, &[]);
    (writer.finish(), meta)
}

fn read_all(reader: &mut crate::read::RowGroupReader, batch: usize) -> Vec<Row> {
    let mut out = Vec::new();
    let mut buf = vec![Row::new(); batch];
    loop {
        let n = reader.read_rows(&mut buf).unwrap();
        if n == 0 {
            return out;
        }
        out.extend(buf[..n].iter_mut().map(std::mem::take));
    }
}

#[test]
fn test_read_rows() {
    let rows: Vec<Row> = (0..500).map(make_row).collect();
    let (reader, meta) = write_group(&rows);
    let group = RowGroup::open(reader, schema(), &meta, ReaderOptions::default()).unwrap();
    assert_eq!(group.num_rows(), 500);
    assert_eq!(group.column_chunks().len(), 3);
    assert!(group.offset_index(1).is_some());
    assert!(group.column_index(1).is_none());
    assert!(group.sorting_columns().is_empty());

    let mut reader = group.reader().unwrap();
    let mut buf = vec![Row::new(); 1000];
    // A batch never crosses a page boundary of any column.
    assert_eq!(reader.read_rows(&mut buf).unwrap(), 37);
    assert_eq!(buf[..37], rows[..37]);
    assert!(buf[37].is_empty());

    let rest = read_all(&mut reader, 50);
    assert_eq!(rest.len(), 463);
    assert_eq!(rest, rows[37..]);

    assert_eq!(reader.read_rows(&mut buf).unwrap(), 0);
    assert_eq!(reader.read_rows(&mut buf).unwrap(), 0);
}

#[test]
fn test_seek_and_close() {
    let rows: Vec<Row> = (0..300).map(make_row).collect();
    let (reader, meta) = write_group(&rows);
    let group = RowGroup::open(reader, schema(), &meta, ReaderOptions::default()).unwrap();
    let mut reader = group.reader().unwrap();

    reader.seek_to_row(250).unwrap();
    assert_eq!(read_all(&mut reader, 7), rows[250..]);

    reader.seek_to_row(10).unwrap();
    let mut buf = vec![Row::new(); 5];
    assert_eq!(reader.read_rows(&mut buf).unwrap(), 5);
    assert_eq!(buf, rows[10..15]);

    reader.close();
    assert_eq!(reader.read_rows(&mut buf).unwrap(), 0);
    let err = reader.seek_to_row(0).unwrap_err();
    assert!(matches!(err.root_kind(), ErrorKind::InvalidOperation { .. }));
}

#[test]
fn test_rows_iterator() {
    let rows: Vec<Row> = (0..120).map(make_row).collect();
    let (reader, meta) = write_group(&rows);
    let group = RowGroup::open(reader, schema(), &meta, ReaderOptions::default()).unwrap();
    let read = Rows::new(group.reader().unwrap(), 16)
        .collect::<strata_common::Result<Vec<_>>>()
        .unwrap();
    assert_eq!(read, rows);
}

#[test]
fn test_empty_row_group() {
    let (reader, meta) = write_group(&[]);
    let group = RowGroup::open(reader, schema(), &meta, ReaderOptions::default()).unwrap();
    assert_eq!(group.num_rows(), 0);
    let mut reader = group.reader().unwrap();
    let mut buf = vec![Row::new(); 4];
    assert_eq!(reader.read_rows(&mut buf).unwrap(), 0);
}

#[test]
fn test_open_validation() {
    let rows: Vec<Row> = (0..10).map(make_row).collect();
    let (reader, meta) = write_group(&rows);

    let mut short = meta.clone();
    short.columns.pop();
    let err = RowGroup::open(reader.clone(), schema(), &short, ReaderOptions::default())
        .unwrap_err();
    assert!(err.is_corruption());

    let mut negative = meta.clone();
    negative.num_rows = -1;
    assert!(
        RowGroup::open(reader.clone(), schema(), &negative, ReaderOptions::default())
            .unwrap_err()
            .is_corruption()
    );

    let mut retyped = meta.clone();
    retyped.columns[0].meta_data.as_mut().unwrap().physical_type = PhysicalType::Double as i32;
    let err = RowGroup::open(reader.clone(), schema(), &retyped, ReaderOptions::default())
        .unwrap_err();
    assert!(err.is_corruption());
    assert_eq!(err.to_string().matches("column 'id'").count(), 1);

    let mut renamed = meta.clone();
    renamed.columns[1].meta_data.as_mut().unwrap().path_in_schema = vec!["other".into()];
    assert!(
        RowGroup::open(reader.clone(), schema(), &renamed, ReaderOptions::default()).is_err()
    );

    let mut sorted = meta.clone();
    sorted.sorting_columns = vec![defs::SortingColumn {
        column_idx: 7,
        descending: false,
        nulls_first: false,
    }];
    assert!(RowGroup::open(reader.clone(), schema(), &sorted, ReaderOptions::default()).is_err());

    let mut sorted = meta;
    sorted.sorting_columns = vec![defs::SortingColumn {
        column_idx: 1,
        descending: true,
        nulls_first: true,
    }];
    let group = RowGroup::open(reader, schema(), &sorted, ReaderOptions::default()).unwrap();
    let sorting = &group.sorting_columns()[0];
    assert_eq!(sorting.path(), ["name"]);
    assert!(sorting.is_descending());
    assert!(sorting.is_nulls_first());
}

#[test]
fn test_open_column_out_of_range() {
    let (reader, meta) = write_group(&[make_row(0)]);
    let group = RowGroup::open(reader, schema(), &meta, ReaderOptions::default()).unwrap();
    assert!(group.open_column(2).is_ok());
    let err = group.open_column(3).unwrap_err();
    assert!(matches!(err.root_kind(), ErrorKind::InvalidArgument { .. }));
}

#[test]
fn test_read_from_file() {
    let rows: Vec<Row> = (0..200).map(make_row).collect();
    let mut writer = TableWriter::new();
    let meta = writer.write_row_group(&schema(), &rows, chunk_options, &[]);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&writer.into_bytes()).unwrap();
    file.flush().unwrap();
    let reader = Arc::new(strata_io::FileReader::open(file.path()).unwrap());

    let options = ReaderOptions::default()
        .with_read_buffer_size(256)
        .with_value_batch_size(16);
    let group = RowGroup::open(reader, schema(), &meta, options).unwrap();
    let mut reader = group.reader().unwrap();
    assert_eq!(read_all(&mut reader, 64), rows);

    reader.seek_to_row(199).unwrap();
    assert_eq!(read_all(&mut reader, 64), rows[199..]);
}

#[test]
fn test_corrupt_page_reports_column() {
    let rows: Vec<Row> = (0..50).map(make_row).collect();
    let mut writer = TableWriter::new();
    let meta = writer.write_row_group(&schema(), &rows, chunk_options, &[]);
    let chunk = meta.columns[2].meta_data.as_ref().unwrap();
    let end = (chunk.data_page_offset + chunk.total_compressed_size) as usize;
    writer.data_mut()[end - 1] ^= 0xff;
    let group =
        RowGroup::open(writer.finish(), schema(), &meta, ReaderOptions::default()).unwrap();
    let mut reader = group.reader().unwrap();
    let mut buf = vec![Row::new(); 64];
    let err = reader.read_rows(&mut buf).unwrap_err();
    assert!(matches!(err.root_kind(), ErrorKind::ChecksumMismatch { .. }));
    // One context layer names the column, page and offset.
    let ErrorKind::Context { source, page, .. } = err.kind() else {
        panic!("expected a column context: {err}");
    };
    assert!(!matches!(source.kind(), ErrorKind::Context { .. }));
    assert_eq!(*page, Some(0));
    assert_eq!(err.to_string().matches("column 'tags'").count(), 1);
}
