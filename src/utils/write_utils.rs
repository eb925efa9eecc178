//! TIFF writing utilities
//!
//! Helper functions for writing TIFF files: alignment, offsets and
//! headers.

use log::trace;
use std::io::{Seek, SeekFrom, Write};

use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::tiff::constants::{header, limits};
use crate::tiff::errors::{TiffError, TiffResult};

/// Align an offset to an even (word) boundary
///
/// IFDs must start on a word boundary; tile data is kept aligned too.
pub fn align_to_even(offset: u64) -> u64 {
    offset + (offset & 1)
}

/// Calculate padding required to reach an even boundary
pub fn calculate_padding(offset: u64) -> usize {
    (offset & 1) as usize
}

/// Seeks to the end of the stream, writing one pad byte if it is odd
///
/// # Returns
/// The even end-of-file position
pub fn seek_to_even_end<S: Write + Seek + ?Sized>(stream: &mut S) -> TiffResult<u64> {
    let end = stream.seek(SeekFrom::End(0))?;
    let padding = calculate_padding(end);
    if padding > 0 {
        trace!("Padding end of file at {} to even position", end);
        stream.write_all(&[0u8])?;
    }
    Ok(end + padding as u64)
}

/// Ensures an offset can be stored in the file format
pub fn check_offset(offset: u64, is_big_tiff: bool) -> TiffResult<()> {
    if !is_big_tiff && offset > limits::MAX_CLASSIC_OFFSET {
        return Err(TiffError::FormatError(format!(
            "Offset {} exceeds the 4 GB limit of classic TIFF; use BigTIFF", offset)));
    }
    Ok(())
}

/// Writes a 4- or 8-byte offset
pub fn write_offset(
    writer: &mut dyn Write,
    handler: &dyn ByteOrderHandler,
    offset: u64,
    is_big_tiff: bool,
) -> TiffResult<()> {
    check_offset(offset, is_big_tiff)?;
    if is_big_tiff {
        handler.write_u64(writer, offset)?;
    } else {
        handler.write_u32(writer, offset as u32)?;
    }
    Ok(())
}

/// Encodes a file header whose first-IFD offset is `first_ifd_offset`
pub fn encode_header(byte_order: ByteOrder, is_big_tiff: bool, first_ifd_offset: u64) -> TiffResult<Vec<u8>> {
    let handler = byte_order.create_handler();
    let mut out = Vec::with_capacity(header::BIG_TIFF_HEADER_SIZE as usize);
    out.extend_from_slice(&byte_order.marker());
    if is_big_tiff {
        handler.write_u16(&mut out, header::BIG_TIFF_VERSION)?;
        handler.write_u16(&mut out, header::BIGTIFF_OFFSET_SIZE)?;
        handler.write_u16(&mut out, 0)?;
    } else {
        handler.write_u16(&mut out, header::TIFF_VERSION)?;
    }
    write_offset(&mut out, handler.as_ref(), first_ifd_offset, is_big_tiff)?;
    Ok(out)
}

/// Position of the first-IFD offset field in the header
pub fn first_offset_position(is_big_tiff: bool) -> u64 {
    if is_big_tiff {
        header::BIG_TIFF_FIRST_OFFSET_POSITION
    } else {
        header::TIFF_FIRST_OFFSET_POSITION
    }
}
