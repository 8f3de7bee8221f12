//! Framing of metadata messages: plain messages stored at known byte ranges (page
//! indexes) and varint length-delimited messages interleaved with page data (page
//! headers).

use std::io::Read;

use prost::Message;
use strata_common::{
    Result,
    error::{Error, ErrorKind},
};

/// Decodes a message occupying the whole of `buf`.
pub fn decode_message<M: Message + Default>(buf: &[u8], element: &str) -> Result<M> {
    M::decode(buf).map_err(|source| {
        ErrorKind::InvalidMessage {
            element: element.to_string(),
            source,
        }
        .into()
    })
}

/// Reads an unsigned LEB128 varint from `reader`.
///
/// Returns `Ok(None)` when the reader is exhausted before the first byte, which marks a
/// clean end of the stream. A varint cut short, or longer than ten bytes, is an error.
pub fn read_varint<R: Read>(reader: &mut R, element: &str) -> Result<Option<(u64, usize)>> {
    let mut value = 0u64;
    let mut byte = [0u8; 1];
    for i in 0..10 {
        let n = read_byte(reader, &mut byte, element)?;
        if n == 0 {
            return if i == 0 {
                Ok(None)
            } else {
                Err(Error::unexpected_eof(element))
            };
        }
        value |= u64::from(byte[0] & 0x7f) << (7 * i);
        if byte[0] & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
    }
    Err(Error::invalid_format(element, "varint is too long"))
}

fn read_byte<R: Read>(reader: &mut R, byte: &mut [u8; 1], element: &str) -> Result<usize> {
    loop {
        match reader.read(byte) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(Error::io(element, e)),
        }
    }
}

/// Reads a varint length-delimited message from `reader`, using `scratch` as the
/// staging buffer.
///
/// Returns the message together with the total number of bytes consumed (prefix and
/// body), or `Ok(None)` at a clean end of the stream.
pub fn read_delimited_message<M, R>(
    reader: &mut R,
    scratch: &mut Vec<u8>,
    max_len: usize,
    element: &str,
) -> Result<Option<(M, usize)>>
where
    M: Message + Default,
    R: Read,
{
    let Some((len, prefix_len)) = read_varint(reader, element)? else {
        return Ok(None);
    };
    let len = usize::try_from(len)
        .ok()
        .filter(|&len| len <= max_len)
        .ok_or_else(|| {
            Error::invalid_format(element, format!("message length {len} exceeds {max_len}"))
        })?;
    scratch.clear();
    scratch.resize(len, 0);
    reader.read_exact(scratch).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::unexpected_eof(element)
        } else {
            Error::io(element, e)
        }
    })?;
    let message = decode_message(scratch, element)?;
    Ok(Some((message, prefix_len + len)))
}

/// Appends `message` to `out` as a varint length-delimited record.
pub fn write_delimited_message<M: Message>(message: &M, out: &mut Vec<u8>) {
    let len = message.encoded_len();
    out.reserve(len + prost::length_delimiter_len(len));
    // Encoding into a vector that reserved the required capacity cannot fail.
    let _ = message.encode_length_delimited(out);
}
