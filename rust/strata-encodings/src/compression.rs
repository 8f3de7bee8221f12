//! Page compression codecs.

use std::io::{Read, Write};

use strata_common::{Result, error::Error};
use strata_format::defs::CompressionCodec;

/// Block codec applied to page bodies.
pub trait Codec: Send + Sync {
    fn codec(&self) -> CompressionCodec;

    fn name(&self) -> &'static str;

    /// Decompresses `src` and appends exactly `uncompressed_size` bytes to `dst`.
    /// Any other resulting size is a decompression error.
    fn decode(&self, src: &[u8], uncompressed_size: usize, dst: &mut Vec<u8>) -> Result<()>;

    /// Compresses `src`, appending the result to `dst`.
    fn encode(&self, src: &[u8], dst: &mut Vec<u8>) -> Result<()>;
}

/// Returns the codec registered for `codec`.
pub fn lookup_codec(codec: CompressionCodec) -> Result<&'static dyn Codec> {
    match codec {
        CompressionCodec::Uncompressed => Ok(&UncompressedCodec),
        CompressionCodec::Zstd => Ok(&ZstdCodec),
        CompressionCodec::Lz4Raw => Ok(&Lz4RawCodec),
        other => Err(Error::not_implemented(format!("{other:?} compression"))),
    }
}

/// Looks a codec up by its case-insensitive name (`"zstd"`, `"lz4_raw"`, ...).
pub fn lookup_codec_by_name(name: &str) -> Result<&'static dyn Codec> {
    let codec = match name.to_ascii_lowercase().as_str() {
        "uncompressed" | "none" => CompressionCodec::Uncompressed,
        "snappy" => CompressionCodec::Snappy,
        "gzip" => CompressionCodec::Gzip,
        "lzo" => CompressionCodec::Lzo,
        "brotli" => CompressionCodec::Brotli,
        "lz4" => CompressionCodec::Lz4,
        "zstd" => CompressionCodec::Zstd,
        "lz4_raw" => CompressionCodec::Lz4Raw,
        _ => {
            return Err(Error::invalid_arg(
                "name",
                format!("unknown compression codec '{name}'"),
            ));
        }
    };
    lookup_codec(codec)
}

/// Parses a raw codec tag from column metadata.
pub fn codec_from_tag(tag: i32) -> Result<CompressionCodec> {
    CompressionCodec::try_from(tag).map_err(|_| {
        Error::invalid_format("compression codec", format!("unknown codec {tag}"))
    })
}

fn check_size(codec: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::decompression(
            codec,
            format!("expected {expected} bytes, decompressed {actual}"),
        ));
    }
    Ok(())
}

pub struct UncompressedCodec;

impl Codec for UncompressedCodec {
    fn codec(&self) -> CompressionCodec {
        CompressionCodec::Uncompressed
    }

    fn name(&self) -> &'static str {
        "uncompressed"
    }

    fn decode(&self, src: &[u8], uncompressed_size: usize, dst: &mut Vec<u8>) -> Result<()> {
        check_size(self.name(), uncompressed_size, src.len())?;
        dst.extend_from_slice(src);
        Ok(())
    }

    fn encode(&self, src: &[u8], dst: &mut Vec<u8>) -> Result<()> {
        dst.extend_from_slice(src);
        Ok(())
    }
}

pub struct ZstdCodec;

const ZSTD_LEVEL: i32 = 3;
const ZSTD_RESERVE_RATIO: usize = 64;

impl Codec for ZstdCodec {
    fn codec(&self) -> CompressionCodec {
        CompressionCodec::Zstd
    }

    fn name(&self) -> &'static str {
        "zstd"
    }

    fn decode(&self, src: &[u8], uncompressed_size: usize, dst: &mut Vec<u8>) -> Result<()> {
        let start = dst.len();
        // The declared size only sizes the initial allocation when the input could
        // plausibly inflate to it; `read_to_end` grows the buffer past that.
        dst.reserve(uncompressed_size.min(src.len().saturating_mul(ZSTD_RESERVE_RATIO)));
        let decoder = zstd::stream::read::Decoder::new(src)
            .map_err(|e| Error::decompression(self.name(), e.to_string()))?;
        // One extra byte detects frames that inflate beyond the declared size.
        decoder
            .take(uncompressed_size as u64 + 1)
            .read_to_end(dst)
            .map_err(|e| Error::decompression(self.name(), e.to_string()))?;
        check_size(self.name(), uncompressed_size, dst.len() - start)
    }

    fn encode(&self, src: &[u8], dst: &mut Vec<u8>) -> Result<()> {
        let mut encoder = zstd::stream::write::Encoder::new(dst, ZSTD_LEVEL)
            .map_err(|e| Error::io("failed to create zstd encoder", e))?;
        encoder
            .write_all(src)
            .map_err(|e| Error::io("failed to write zstd compressed data", e))?;
        encoder
            .finish()
            .map_err(|e| Error::io("failed to finish zstd encoder", e))?;
        Ok(())
    }
}

/// LZ4 block format without any framing or size prefix.
pub struct Lz4RawCodec;

const LZ4_MAX_SEQUENCE: usize = 64;

impl Codec for Lz4RawCodec {
    fn codec(&self) -> CompressionCodec {
        CompressionCodec::Lz4Raw
    }

    fn name(&self) -> &'static str {
        "lz4_raw"
    }

    fn decode(&self, src: &[u8], uncompressed_size: usize, dst: &mut Vec<u8>) -> Result<()> {
        let size = i32::try_from(uncompressed_size).map_err(|_| {
            Error::decompression(self.name(), "uncompressed size exceeds the block limit")
        })?;
        // Each input byte of a block expands to at most 255 output bytes.
        let limit = src.len().saturating_mul(255).saturating_add(LZ4_MAX_SEQUENCE);
        if uncompressed_size > limit {
            return Err(Error::decompression(
                self.name(),
                format!(
                    "declared size {uncompressed_size} exceeds what {} input bytes can hold",
                    src.len()
                ),
            ));
        }
        let start = dst.len();
        dst.resize(start + uncompressed_size, 0);
        let decompressed = lz4::block::decompress_to_buffer(src, Some(size), &mut dst[start..])
            .map_err(|e| Error::decompression(self.name(), e.to_string()))?;
        dst.truncate(start + decompressed);
        check_size(self.name(), uncompressed_size, decompressed)
    }

    fn encode(&self, src: &[u8], dst: &mut Vec<u8>) -> Result<()> {
        let bound = lz4::block::compress_bound(src.len())
            .map_err(|e| Error::io("failed to size lz4 block", e))?;
        let start = dst.len();
        dst.resize(start + bound, 0);
        let size = lz4::block::compress_to_buffer(
            src,
            Some(lz4::block::CompressionMode::DEFAULT),
            false,
            &mut dst[start..],
        )
        .map_err(|e| Error::io("failed to compress block with lz4", e))?;
        dst.truncate(start + size);
        Ok(())
    }
}
