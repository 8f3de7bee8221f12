//! Value and level encodings of the table format: the hybrid RLE/bit-packed codec,
//! level streams, plain and delta values, dictionaries and page compression codecs.

pub mod buffers_pool;
pub mod compression;
pub mod delta;
pub mod dictionary;
pub mod levels;
pub mod plain;
pub mod rle;
pub mod value_decoder;

pub use buffers_pool::{BuffersPool, PooledBuffer};
pub use dictionary::Dictionary;
pub use levels::LevelStream;
pub use value_decoder::ValueDecoder;
