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

    /// Returns `true` if this error only reports that the surrounding operation
    /// was cancelled, as opposed to the failure that triggered the cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self.kind() {
            ErrorKind::Cancelled => true,
            ErrorKind::Io { source, .. } => is_cancelled_io(source),
            _ => false,
        }
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

    pub fn invalid_reference(segment: u32, segment_count: usize) -> Error {
        Error(
            ErrorKind::InvalidReference {
                segment,
                segment_count,
            }
            .into(),
        )
    }

    pub fn malformed_chunk_header(segment: u32, offset: u32, reason: impl Into<String>) -> Error {
        Error(
            ErrorKind::MalformedChunkHeader {
                segment,
                offset,
                reason: reason.into(),
            }
            .into(),
        )
    }

    pub fn short_read(segment: u32, offset: u32, expected: usize, actual: usize) -> Error {
        Error(
            ErrorKind::ShortRead {
                segment,
                offset,
                expected,
                actual,
            }
            .into(),
        )
    }

    pub fn pool_exhausted(requested: usize, limit: u64) -> Error {
        Error(ErrorKind::PoolExhausted { requested, limit }.into())
    }

    pub fn cancelled() -> Error {
        Error(ErrorKind::Cancelled.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        if is_cancelled_io(&source) {
            return Error::cancelled();
        }
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("invalid storage format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("reference sequence {segment} out of range (block has {segment_count} segments)")]
    InvalidReference { segment: u32, segment_count: usize },

    #[error("malformed chunk header at segment {segment} offset {offset:#x}: {reason}")]
    MalformedChunkHeader {
        segment: u32,
        offset: u32,
        reason: String,
    },

    #[error(
        "preloaded chunk too small at segment {segment} offset {offset:#x}: \
         expected {expected} bytes, fetched {actual}"
    )]
    ShortRead {
        segment: u32,
        offset: u32,
        expected: usize,
        actual: usize,
    },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("chunk pool exhausted: requested {requested} bytes, limit {limit} bytes")]
    PoolExhausted { requested: usize, limit: u64 },

    #[error("operation cancelled")]
    Cancelled,
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

/// Marker payload carried by `std::io::Error`s produced when a blocking call
/// observes a cancelled scope.
#[derive(Debug, Error)]
#[error("operation cancelled")]
pub struct CancelledIo;

/// Creates an `std::io::Error` signalling cancellation, recognized by
/// [`Error::is_cancelled`] after conversion.
pub fn cancelled_io() -> std::io::Error {
    std::io::Error::other(CancelledIo)
}

fn is_cancelled_io(e: &std::io::Error) -> bool {
    e.get_ref()
        .is_some_and(|inner| inner.downcast_ref::<CancelledIo>().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_io_roundtrip() {
        let err = Error::io("range read", cancelled_io());
        assert!(err.is_cancelled());
        assert!(matches!(err.kind(), ErrorKind::Cancelled));

        let err = Error::io(
            "range read",
            std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
        );
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::invalid_reference(3, 2);
        assert_eq!(
            err.to_string(),
            "reference sequence 3 out of range (block has 2 segments)"
        );
        let err = Error::short_read(0, 0x40, 100, 64);
        assert!(err.to_string().contains("expected 100 bytes, fetched 64"));
    }
}
