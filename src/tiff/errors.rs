//! Custom error types for TIFF processing
//!
//! Every failure in the crate is a `TiffError`. Callers that need to react
//! to a class of failure rather than a specific variant use [`TiffError::kind`].

use std::fmt;
use std::io;

/// Coarse classification of a [`TiffError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed header, corrupt or cyclic IFD chain, inconsistent tag values
    Format,
    /// Structurally valid, but not supported by this engine
    UnsupportedFormat,
    /// Out-of-range tile, plane, IFD or pixel index
    Index,
    /// Error reported by the underlying byte stream
    Io,
    /// Operation not allowed in the current state of a session or tile
    InvalidState,
    /// Anything else
    Other,
}

/// TIFF-specific error types
#[derive(Debug)]
pub enum TiffError {
    /// I/O error
    IoError(io::Error),
    /// I/O error with the operation and file position where it happened
    IoContext {
        operation: String,
        offset: u64,
        source: io::Error,
    },
    /// Invalid TIFF header
    InvalidHeader,
    /// Invalid byte order marker
    InvalidByteOrder(u16),
    /// Invalid BigTIFF header
    InvalidBigTIFFHeader,
    /// Unsupported TIFF version
    UnsupportedVersion(u16),
    /// Tag not found
    TagNotFound(u16),
    /// Unsupported field type
    UnsupportedFieldType(u16),
    /// Unsupported compression method
    UnsupportedCompression(u64),
    /// Bits per sample that cannot be accessed directly
    UnsupportedBitDepth(Vec<u16>),
    /// Image dimensions not found
    MissingDimensions,
    /// Malformed or inconsistent file structure
    FormatError(String),
    /// Valid structure that this engine cannot process
    UnsupportedFormat(String),
    /// Out-of-range index or rectangle
    IndexError(String),
    /// Operation not permitted in the current state
    InvalidState(String),
    /// Generic error with message
    GenericError(String),
}

impl TiffError {
    /// Wraps an I/O error with the operation and offset it happened at
    pub fn io_at(operation: &str, offset: u64, source: io::Error) -> Self {
        TiffError::IoContext {
            operation: operation.to_string(),
            offset,
            source,
        }
    }

    /// Returns the error class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TiffError::IoError(_) | TiffError::IoContext { .. } => ErrorKind::Io,
            TiffError::InvalidHeader
            | TiffError::InvalidByteOrder(_)
            | TiffError::InvalidBigTIFFHeader
            | TiffError::UnsupportedVersion(_)
            | TiffError::TagNotFound(_)
            | TiffError::MissingDimensions
            | TiffError::FormatError(_) => ErrorKind::Format,
            TiffError::UnsupportedFieldType(_)
            | TiffError::UnsupportedCompression(_)
            | TiffError::UnsupportedBitDepth(_)
            | TiffError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            TiffError::IndexError(_) => ErrorKind::Index,
            TiffError::InvalidState(_) => ErrorKind::InvalidState,
            TiffError::GenericError(_) => ErrorKind::Other,
        }
    }
}

impl fmt::Display for TiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TiffError::IoError(e) => write!(f, "I/O error: {}", e),
            TiffError::IoContext { operation, offset, source } =>
                write!(f, "I/O error while {} at offset {}: {}", operation, offset, source),
            TiffError::InvalidHeader => write!(f, "Invalid TIFF header"),
            TiffError::InvalidByteOrder(v) => write!(f, "Invalid byte order marker: {:#06x}", v),
            TiffError::InvalidBigTIFFHeader => write!(f, "Invalid BigTIFF header"),
            TiffError::UnsupportedVersion(v) => write!(f, "Unsupported TIFF version: {}", v),
            TiffError::TagNotFound(tag) => write!(f, "Tag not found: {}", tag),
            TiffError::UnsupportedFieldType(ft) => write!(f, "Unsupported field type: {}", ft),
            TiffError::UnsupportedCompression(c) => write!(f, "Unsupported compression method: {}", c),
            TiffError::UnsupportedBitDepth(bits) =>
                write!(f, "Unsupported bits per sample: {:?}", bits),
            TiffError::MissingDimensions => write!(f, "Image dimensions not found"),
            TiffError::FormatError(msg) => write!(f, "Invalid TIFF: {}", msg),
            TiffError::UnsupportedFormat(msg) => write!(f, "Unsupported TIFF: {}", msg),
            TiffError::IndexError(msg) => write!(f, "Index out of range: {}", msg),
            TiffError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            TiffError::GenericError(msg) => write!(f, "TIFF error: {}", msg),
        }
    }
}

impl std::error::Error for TiffError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TiffError::IoError(e) => Some(e),
            TiffError::IoContext { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for TiffError {
    fn from(error: io::Error) -> Self {
        TiffError::IoError(error)
    }
}

/// Result type for TIFF operations
pub type TiffResult<T> = Result<T, TiffError>;

impl From<String> for TiffError {
    fn from(msg: String) -> Self {
        TiffError::GenericError(msg)
    }
}
