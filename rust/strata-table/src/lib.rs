//! Read path of the Strata columnar table format: page decoding, column chunk
//! cursors with page-index seek, row group readers and the k-way sorted merge of
//! row groups.

pub mod read;

#[cfg(test)]
mod tests;
