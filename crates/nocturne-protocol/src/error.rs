//! Errors raised while framing or unframing a message.

use std::io;

use nocturne_pipeline::Dimensions;

/// A fragment or parameter block could not be written or read.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The stream ended before a complete record arrived.
    #[error("stream ended in the middle of {what}")]
    Truncated {
        /// Which record was being read.
        what: &'static str,
    },

    /// The underlying channel failed.
    #[error("channel I/O failed: {0}")]
    Io(#[source] io::Error),

    /// A reserved field of the info record held an unexpected value.
    #[error("bad info record: {field} is {actual}, expected {expected}")]
    BadInfoRecord {
        /// Name of the offending field.
        field: &'static str,
        /// Value required by the protocol.
        expected: u64,
        /// Value received.
        actual: u64,
    },

    /// The declared dimensions are non-positive or too large.
    #[error("declared fragment size {width}x{height} is not acceptable")]
    BadDimensions {
        /// Declared width.
        width: i32,
        /// Declared height.
        height: i32,
    },

    /// The declared dimensions differ from what the reader expected.
    #[error("expected a {expected} fragment, stream declares {actual}")]
    DimensionMismatch {
        /// Size the reader knows out of band.
        expected: Dimensions,
        /// Size declared on the wire.
        actual: Dimensions,
    },

    /// Bytes were left over after a complete message.
    #[error("{count} unexpected bytes after the end of the message")]
    TrailingBytes {
        /// Number of surplus bytes.
        count: usize,
    },
}

impl ProtocolError {
    /// Map an I/O error, turning end-of-stream into [`Self::Truncated`].
    pub(crate) fn from_io(err: io::Error, what: &'static str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated { what }
        } else {
            Self::Io(err)
        }
    }
}
