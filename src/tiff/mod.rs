//! TIFF file structure
//!
//! IFD model, reader and writer sessions for TIFF and BigTIFF files.

pub mod errors;
pub mod ifd;
pub mod reader;
pub mod writer;
pub mod constants;
pub mod tag_names;
pub(crate) mod validation;
#[cfg(test)]
mod tests;

pub use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};
pub use errors::{ErrorKind, TiffError, TiffResult};
pub use ifd::{BitDepthSupport, IFDEntry, TagValue, IFD};
pub use reader::{ChainMode, OpenMode, ReaderOptions, TiffReader};
pub use writer::{TiffWriter, WriterOptions};
