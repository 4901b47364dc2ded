use std::io;

/// Result type used throughout this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Error type for buffered readers, writers and the data codecs.
///
/// Every error aborts the operation in progress. Nothing is retried and the position is not
/// rolled back; the only state that is always restored is the bound narrowed by a
/// [`Window`](crate::Window).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying stream failed. This includes cancellation reported by
    /// [`SocketStream`](crate::socket::SocketStream).
    #[error("stream I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The stream ran out of data before a read could be satisfied, or a read went past the end
    /// of a seekable stream while no window was open.
    #[error("unexpected end of stream at position {position}")]
    EndOfStream {
        /// The logical position at which more data was needed.
        position: u64,
    },

    /// A read, skip or window inside an open window would go past the window's bound. This is a
    /// sign of malformed input (a length field that lies) or of a parser bug.
    #[error("attempt to consume {requested} bytes with only {remaining} bytes left before the bound")]
    BoundExceeded {
        /// Number of bytes the operation needed.
        requested: u64,
        /// Number of bytes left before the bound.
        remaining: u64,
    },

    /// A scoped read did not consume exactly the number of bytes that it declared.
    #[error("scoped read declared {declared} bytes but consumed {consumed}")]
    ScopeConsumptionMismatch {
        /// Length given to [`BufferedReader::read_scoped`](crate::BufferedReader::read_scoped).
        declared: u64,
        /// Number of bytes the action actually consumed.
        consumed: u64,
    },

    /// The bytes left before the bound are not a whole number of elements.
    #[error("{remaining} remaining bytes is not a multiple of {width}")]
    MisalignedRegion {
        /// Bytes left before the bound.
        remaining: u64,
        /// Element width that was asked for.
        width: usize,
    },

    /// The element type has no byte-swap rule, so it can only be transferred in native order.
    #[error("cannot convert byte order of {type_name}")]
    UnsupportedConversion {
        /// Name of the element type.
        type_name: &'static str,
    },
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(inner) => inner,
            other => {
                let kind = match other {
                    Error::EndOfStream { .. } => io::ErrorKind::UnexpectedEof,
                    _ => io::ErrorKind::InvalidData,
                };
                io::Error::new(kind, other)
            }
        }
    }
}
