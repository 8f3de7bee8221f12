use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns the innermost error kind, looking through any
    /// [`ErrorKind::Context`] layers attached while the error propagated.
    pub fn root_kind(&self) -> &ErrorKind {
        let mut kind = self.kind();
        while let ErrorKind::Context { source, .. } = kind {
            kind = source.kind();
        }
        kind
    }

    /// Classifies the error into one of the broad failure categories
    /// callers are expected to branch on.
    pub fn category(&self) -> ErrorCategory {
        match self.root_kind() {
            ErrorKind::ChecksumMismatch { .. }
            | ErrorKind::InvalidFormat { .. }
            | ErrorKind::UnexpectedEof { .. }
            | ErrorKind::InvalidMessage { .. }
            | ErrorKind::Decompression { .. } => ErrorCategory::StructuralCorruption,
            ErrorKind::OutOfRange { .. } => ErrorCategory::OutOfRange,
            ErrorKind::SchemaMismatch { .. } | ErrorKind::SortingColumnsMismatch { .. } => {
                ErrorCategory::SchemaMismatch
            }
            ErrorKind::Io { .. } => ErrorCategory::UpstreamIo,
            ErrorKind::InvalidArgument { .. }
            | ErrorKind::InvalidOperation { .. }
            | ErrorKind::NotImplemented { .. }
            | ErrorKind::DestBufferTooSmall
            | ErrorKind::Context { .. } => ErrorCategory::Usage,
        }
    }

    pub fn is_corruption(&self) -> bool {
        self.category() == ErrorCategory::StructuralCorruption
    }

    pub fn is_out_of_range(&self) -> bool {
        self.category() == ErrorCategory::OutOfRange
    }

    /// Wraps the error with the identity of the column (and optionally the page
    /// ordinal and byte offset) it was raised for.
    pub fn in_column(
        self,
        column: impl Into<String>,
        page: Option<usize>,
        offset: Option<u64>,
    ) -> Error {
        Error(
            ErrorKind::Context {
                column: column.into(),
                page,
                offset,
                source: self,
            }
            .into(),
        )
    }

    pub fn invalid_format(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn not_implemented(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::NotImplemented {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn unexpected_eof(element: impl Into<String>) -> Error {
        Error(
            ErrorKind::UnexpectedEof {
                element: element.into(),
            }
            .into(),
        )
    }

    pub fn out_of_range(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::OutOfRange {
                element: element.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn checksum_mismatch(element: impl Into<String>, expected: u32, actual: u32) -> Error {
        Error(
            ErrorKind::ChecksumMismatch {
                element: element.into(),
                expected,
                actual,
            }
            .into(),
        )
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::SchemaMismatch {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn sorting_columns_mismatch(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::SortingColumnsMismatch {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn decompression(codec: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::Decompression {
                codec: codec.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }
}

/// Broad failure classes. End of stream is not an error and has no category:
/// readers report it through `Ok(None)` or `Ok(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Checksum mismatch, truncated blocks, malformed headers or messages.
    StructuralCorruption,
    /// Index or seek target outside the valid range.
    OutOfRange,
    /// Incompatible schemas or sorting declarations.
    SchemaMismatch,
    /// Failure of the underlying byte source.
    UpstreamIo,
    /// Caller misuse.
    Usage,
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("not yet implemented: {message}")]
    NotImplemented { message: String },

    #[error("checksum mismatch for '{element}': expected {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch {
        element: String,
        expected: u32,
        actual: u32,
    },

    #[error("invalid storage format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("unexpected end of input while reading '{element}'")]
    UnexpectedEof { element: String },

    #[error("invalid metadata message '{element}'")]
    InvalidMessage {
        element: String,
        source: prost::DecodeError,
    },

    #[error("failed to decompress {codec} data: {message}")]
    Decompression { codec: String, message: String },

    #[error("{element} out of range: {message}")]
    OutOfRange { element: String, message: String },

    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    #[error("sorting columns mismatch: {message}")]
    SortingColumnsMismatch { message: String },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error(
        "column '{column}'{}{}: {source}",
        page.map(|p| format!(", page {p}")).unwrap_or_default(),
        offset.map(|o| format!(", offset {o}")).unwrap_or_default())]
    Context {
        column: String,
        page: Option<usize>,
        offset: Option<u64>,
        source: Error,
    },

    #[error("destination buffer is too small")]
    DestBufferTooSmall,
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<prost::DecodeError> for Error {
    fn from(e: prost::DecodeError) -> Self {
        ErrorKind::InvalidMessage {
            element: String::new(),
            source: e,
        }
        .into()
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::unexpected_eof(e.to_string())
        } else {
            Error::io("", e)
        }
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(_: std::convert::Infallible) -> Self {
        Error::invalid_operation("conversion")
    }
}
