//! A reader for the metadata block chain of FLAC streams.
//!
//! A FLAC stream begins with the 4-byte `fLaC` marker followed by
//! one or more self-describing metadata blocks, the last of which
//! has a flag set in its header.  The compressed audio frames
//! follow the final block.  This crate decodes the marker and the
//! block chain from any forward-only byte source; it does not
//! decode audio frames, write metadata, or seek.
//!
//! # Example
//!
//! ```
//! use flac_metadata::metadata::{Block, read_blocks};
//!
//! // the "fLaC" marker followed by a zero-length PADDING block
//! // flagged as the last block in the stream
//! let data: &[u8] = b"fLaC\x81\x00\x00\x00";
//!
//! let blocks = read_blocks(data).collect::<Result<Vec<_>, _>>().unwrap();
//!
//! assert_eq!(blocks.len(), 1);
//! assert!(blocks[0].header.last);
//! assert!(matches!(blocks[0].data, Block::Skipped));
//! ```

pub mod metadata;

/// An error encountered while reading metadata blocks
#[derive(Debug)]
pub enum Error {
    /// A non-end-of-stream I/O error from the underlying source
    Io(std::io::Error),
    /// The stream does not begin with the `fLaC` marker
    InvalidMarker,
    /// The source ended before a field or record was complete
    UnexpectedEndOfStream,
    /// A block's declared length is inconsistent with its contents
    MalformedLength,
    /// A string field is not valid UTF-8
    InvalidUtf8,
}

impl Error {
    /// Returns our error's kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(e) => ErrorKind::Io(e.kind()),
            Self::InvalidMarker => ErrorKind::InvalidMarker,
            Self::UnexpectedEndOfStream => ErrorKind::UnexpectedEndOfStream,
            Self::MalformedLength => ErrorKind::MalformedLength,
            Self::InvalidUtf8 => ErrorKind::InvalidUtf8,
        }
    }
}

impl From<std::io::Error> for Error {
    /// The sole conversion point for source errors.
    ///
    /// Running out of bytes mid-field is terminal for the whole
    /// reader, so end-of-input is remapped to a dedicated kind
    /// here rather than tagged at each call site.
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::UnexpectedEndOfStream,
            _ => Self::Io(error),
        }
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(_: std::string::FromUtf8Error) -> Self {
        Self::InvalidUtf8
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Io(e) => e.fmt(f),
            Self::InvalidMarker => "missing fLaC marker at beginning of stream".fmt(f),
            Self::UnexpectedEndOfStream => "stream ended in the middle of a metadata block".fmt(f),
            Self::MalformedLength => "metadata block length inconsistent with contents".fmt(f),
            Self::InvalidUtf8 => "string field is not valid UTF-8".fmt(f),
        }
    }
}

/// A copyable classification of [`Error`]
///
/// Once a [`metadata::BlockReader`] fails, it holds the failure's
/// kind and surfaces it again on every subsequent read attempt.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// A non-end-of-stream I/O error from the underlying source
    Io(std::io::ErrorKind),
    /// The stream does not begin with the `fLaC` marker
    InvalidMarker,
    /// The source ended before a field or record was complete
    UnexpectedEndOfStream,
    /// A block's declared length is inconsistent with its contents
    MalformedLength,
    /// A string field is not valid UTF-8
    InvalidUtf8,
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Io(kind) => Self::Io(kind.into()),
            ErrorKind::InvalidMarker => Self::InvalidMarker,
            ErrorKind::UnexpectedEndOfStream => Self::UnexpectedEndOfStream,
            ErrorKind::MalformedLength => Self::MalformedLength,
            ErrorKind::InvalidUtf8 => Self::InvalidUtf8,
        }
    }
}
