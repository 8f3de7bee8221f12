use strata_common::error::Error;

/// Validates a buffer by comparing its computed checksum with the expected one.
///
/// # Arguments
///
/// * `buf` - The raw bytes covered by the checksum (for pages, the bytes as stored,
///   before any decompression).
/// * `checksum` - The expected checksum.
/// * `name` - An optional name of the element being validated, used for error reporting.
///
/// # Errors
///
/// Returns `ErrorKind::ChecksumMismatch` if the computed checksum does not match.
pub fn validate_buffer(buf: &[u8], checksum: u32, name: Option<&str>) -> strata_common::Result<()> {
    let actual = compute(buf);
    if actual == checksum {
        Ok(())
    } else {
        Err(Error::checksum_mismatch(
            name.unwrap_or_default(),
            checksum,
            actual,
        ))
    }
}

/// Computes the CRC-32 (IEEE polynomial) of a buffer.
pub fn compute(buf: &[u8]) -> u32 {
    crc32fast::hash(buf)
}
