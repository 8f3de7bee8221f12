//! Metadata definitions of the table format (page headers, column chunk and row group
//! metadata, page indexes, schema elements) and thin wrappers on top of those:
//! logical values, the leaf-column schema, page checksums and message framing.

pub mod checksum;
pub mod defs;
pub mod message;
pub mod schema;
pub mod value;
