//! TIFF validation utilities
//!
//! Checks applied to header fields, IFD offsets and geometry before the
//! engine trusts them.

use log::{debug, error};

use crate::io::byte_order::ByteOrderHandler;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{header, limits};
use crate::tiff::errors::{TiffError, TiffResult};

/// Validates an IFD offset to ensure it points inside the file
///
/// # Arguments
/// * `offset` - The offset to validate
/// * `header_size` - Size of the file header
/// * `file_size` - The file size
pub fn validate_ifd_offset(offset: u64, header_size: u64, file_size: u64) -> TiffResult<()> {
    if offset < header_size || offset >= file_size {
        return Err(TiffError::FormatError(format!(
            "Invalid IFD offset: {} (file size: {})", offset, file_size)));
    }
    if offset % 2 != 0 {
        debug!("IFD offset {} is odd; accepting it", offset);
    }
    Ok(())
}

/// Validates the BigTIFF header
///
/// After the version number (43) comes the offset size, which must be 8,
/// and a reserved word, which must be 0.
pub fn validate_bigtiff_header(
    reader: &mut dyn SeekableReader,
    byte_order_handler: &dyn ByteOrderHandler,
) -> TiffResult<()> {
    let offset_size = byte_order_handler.read_u16(reader)?;
    let zeros = byte_order_handler.read_u16(reader)?;

    debug!("BigTIFF offset size: {}", offset_size);

    if offset_size != header::BIGTIFF_OFFSET_SIZE || zeros != 0 {
        error!("Invalid BigTIFF header: offset_size={}, zeros={}", offset_size, zeros);
        return Err(TiffError::InvalidBigTIFFHeader);
    }

    Ok(())
}

/// Validates a tile size for writing
pub fn validate_tile_size(tile_width: u32, tile_length: u32) -> TiffResult<()> {
    let granularity = limits::TILE_SIZE_GRANULARITY;
    if tile_width == 0 || tile_length == 0
        || tile_width % granularity != 0 || tile_length % granularity != 0 {
        return Err(TiffError::FormatError(format!(
            "Illegal tile size {}x{}: must be positive multiples of {}",
            tile_width, tile_length, granularity)));
    }
    Ok(())
}
