#[macro_export]
macro_rules! verify {
    ($expr:expr) => {{
        let result = $expr;
        $crate::utils::verify(result, stringify!($expr))?;
    }};
}

pub fn verify(predicate: bool, condition: &str) -> std::io::Result<()> {
    if predicate {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            condition,
        ))
    }
}

/// Reads from `read` until `buffer` is full or the reader reports end of input.
/// Returns the number of bytes placed into `buffer`.
pub fn read_fully<R: std::io::Read>(mut read: R, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut pos: usize = 0;
    while pos < buffer.len() {
        match read.read(&mut buffer[pos..]) {
            Ok(0) => break,
            Ok(bytes) => pos += bytes,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(pos)
}

/// Converts an I/O error into the crate-wide error, attaching `context`.
///
/// Short reads keep their own kind so callers can tell a truncated structure
/// from a failing source.
pub fn io_error(context: impl Into<String>, e: std::io::Error) -> strata_common::error::Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        strata_common::error::Error::unexpected_eof(context)
    } else {
        strata_common::error::Error::io(context, e)
    }
}

#[cfg(test)]
mod tests {
    use strata_common::error::ErrorKind;

    #[test]
    fn test_read_fully_stops_at_eof() {
        let mut buf = [0u8; 8];
        let n = super::read_fully(&b"abc"[..], &mut buf).unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn test_io_error_kinds() {
        let err = super::io_error(
            "page header",
            std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
        );
        assert!(matches!(err.kind(), ErrorKind::UnexpectedEof { element } if element == "page header"));

        let err = super::io_error("page header", std::io::Error::other("disk"));
        assert!(matches!(err.kind(), ErrorKind::Io { .. }));
    }
}
