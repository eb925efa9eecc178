//! TIFF format utilities
//!
//! Header parsing: byte order detection and TIFF/BigTIFF format
//! detection.

use log::debug;
use std::io::SeekFrom;

use crate::io::byte_order::ByteOrder;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::header;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::validation;

/// Parsed file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order of the file
    pub byte_order: ByteOrder,
    /// Whether the file is BigTIFF
    pub is_big_tiff: bool,
    /// Offset of the first IFD (0 when the file has no images yet)
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Length of the header in bytes
    pub fn size(&self) -> u64 {
        if self.is_big_tiff {
            header::BIG_TIFF_HEADER_SIZE
        } else {
            header::TIFF_HEADER_SIZE
        }
    }
}

/// Reads and validates the header at the start of the stream
///
/// # Arguments
/// * `reader` - The seekable reader to use
///
/// # Returns
/// The parsed header
pub fn read_header(reader: &mut dyn SeekableReader) -> TiffResult<TiffHeader> {
    reader.seek(SeekFrom::Start(0))?;
    let byte_order = ByteOrder::detect(reader)?;
    debug!("Detected byte order: {}", byte_order.name());

    let handler = byte_order.create_handler();
    let version = handler.read_u16(reader)?;
    debug!("TIFF version: {}", version);

    let is_big_tiff = match version {
        header::BIG_TIFF_VERSION => {
            debug!("Detected BigTIFF format");
            validation::validate_bigtiff_header(reader, handler.as_ref())?;
            true
        },
        header::TIFF_VERSION => {
            debug!("Detected standard TIFF format");
            false
        },
        _ => return Err(TiffError::UnsupportedVersion(version)),
    };

    let first_ifd_offset = if is_big_tiff {
        handler.read_u64(reader)?
    } else {
        handler.read_u32(reader)? as u64
    };

    Ok(TiffHeader { byte_order, is_big_tiff, first_ifd_offset })
}
