//! IFD utilities
//!
//! Wire-level reading and serialization of Image File Directories, shared
//! by the reader and by the writer when it appends to an existing file.

use log::{debug, trace};
use std::io::{Read, Seek, SeekFrom};

use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{field_types, limits};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFDEntry, IFD};
use crate::utils::tag_utils;
use crate::utils::write_utils;

/// Size of one entry in bytes
pub fn entry_size(is_big_tiff: bool) -> u64 {
    if is_big_tiff {
        limits::BIG_TIFF_BYTES_PER_ENTRY
    } else {
        limits::BYTES_PER_ENTRY
    }
}

/// Size of an offset field in bytes
pub fn offset_size(is_big_tiff: bool) -> u64 {
    if is_big_tiff { 8 } else { 4 }
}

/// Size of the entries block: entry count, entries and next-IFD offset
///
/// # Arguments
/// * `entry_count` - Number of entries in the IFD
/// * `is_big_tiff` - Whether the file is in BigTIFF format
pub fn entries_block_size(entry_count: u64, is_big_tiff: bool) -> u64 {
    if is_big_tiff {
        8 + entry_count * limits::BIG_TIFF_BYTES_PER_ENTRY + 8
    } else {
        2 + entry_count * limits::BYTES_PER_ENTRY + 4
    }
}

/// Reads a 4- or 8-byte offset at the current position
///
/// # Arguments
/// * `reader` - The seekable reader to use
/// * `is_big_tiff` - Whether the file is in BigTIFF format
/// * `handler` - Handler for the file's byte order
pub fn read_offset(
    reader: &mut dyn SeekableReader,
    is_big_tiff: bool,
    handler: &dyn ByteOrderHandler,
) -> TiffResult<u64> {
    if is_big_tiff {
        Ok(handler.read_u64(reader)?)
    } else {
        Ok(handler.read_u32(reader)? as u64)
    }
}

/// Reads the entry count of the IFD at `offset`
pub fn read_entry_count(
    reader: &mut dyn SeekableReader,
    offset: u64,
    is_big_tiff: bool,
    handler: &dyn ByteOrderHandler,
) -> TiffResult<u64> {
    reader.seek(SeekFrom::Start(offset)).map_err(|e| TiffError::io_at("seek to IFD", offset, e))?;
    let count = if is_big_tiff {
        handler.read_u64(reader)
    } else {
        handler.read_u16(reader).map(|v| v as u64)
    };
    let count = count.map_err(|e| TiffError::io_at("read IFD entry count", offset, e))?;
    if count > limits::MAX_NUMBER_OF_IFD_ENTRIES {
        return Err(TiffError::FormatError(format!(
            "Too many IFD entries: {} at offset {}", count, offset)));
    }
    Ok(count)
}

/// Position of the next-IFD offset field of the IFD at `offset`
pub fn next_offset_position(
    reader: &mut dyn SeekableReader,
    offset: u64,
    is_big_tiff: bool,
    handler: &dyn ByteOrderHandler,
) -> TiffResult<u64> {
    let count = read_entry_count(reader, offset, is_big_tiff, handler)?;
    Ok(offset + entries_block_size(count, is_big_tiff) - offset_size(is_big_tiff))
}

/// Reads and decodes the IFD stored at `offset`
///
/// Out-of-line values are fetched from their offsets. Entries of unknown
/// field type are skipped. The returned IFD records the next-IFD link.
///
/// # Arguments
/// * `reader` - The seekable reader to use
/// * `offset` - Offset of the IFD
/// * `number` - Index of this IFD in the chain
/// * `byte_order` - Byte order of the file
/// * `is_big_tiff` - Whether the file is in BigTIFF format
/// * `file_length` - Stream length, used to reject out-of-file pointers
pub fn read_ifd(
    reader: &mut dyn SeekableReader,
    offset: u64,
    number: usize,
    byte_order: ByteOrder,
    is_big_tiff: bool,
    file_length: u64,
) -> TiffResult<IFD> {
    let handler = byte_order.create_handler();
    let count = read_entry_count(reader, offset, is_big_tiff, handler.as_ref())?;
    let block_size = entries_block_size(count, is_big_tiff);
    if offset + block_size > file_length {
        return Err(TiffError::FormatError(format!(
            "IFD at offset {} with {} entries extends past end of file ({} bytes)",
            offset, count, file_length)));
    }

    let entry_len = entry_size(is_big_tiff) as usize;
    let mut block = vec![0u8; count as usize * entry_len + offset_size(is_big_tiff) as usize];
    reader.read_exact(&mut block).map_err(|e| TiffError::io_at("read IFD entries", offset, e))?;

    let mut ifd = IFD::new(number, offset);
    ifd.set_format(byte_order, is_big_tiff);

    for i in 0..count as usize {
        let raw = &block[i * entry_len..(i + 1) * entry_len];
        let mut cursor = std::io::Cursor::new(raw);
        let tag = handler.read_u16(&mut cursor)?;
        let field_type = handler.read_u16(&mut cursor)?;
        let value_count = read_offset(&mut cursor, is_big_tiff, handler.as_ref())?;
        let inline_bytes = &raw[if is_big_tiff { 12 } else { 8 }..];

        let byte_len = match tag_utils::value_byte_len(field_type, value_count) {
            Ok(len) => len,
            Err(TiffError::UnsupportedFieldType(t)) => {
                debug!("Skipping tag {} with unknown field type {}", tag, t);
                continue;
            },
            Err(e) => return Err(e),
        };

        let value = if tag_utils::is_value_inline(byte_len, is_big_tiff) {
            tag_utils::decode_tag_value(field_type, value_count, inline_bytes, handler.as_ref())?
        } else {
            let value_offset = read_offset(&mut cursor, is_big_tiff, handler.as_ref())?;
            if value_offset.checked_add(byte_len).map_or(true, |end| end > file_length) {
                return Err(TiffError::FormatError(format!(
                    "Value of tag {} ({} bytes at offset {}) lies outside the file",
                    tag, byte_len, value_offset)));
            }
            let mut data = vec![0u8; byte_len as usize];
            reader.seek(SeekFrom::Start(value_offset))
                .map_err(|e| TiffError::io_at("seek to tag value", value_offset, e))?;
            reader.read_exact(&mut data)
                .map_err(|e| TiffError::io_at("read tag value", value_offset, e))?;
            tag_utils::decode_tag_value(field_type, value_count, &data, handler.as_ref())?
        };

        ifd.add_entry(IFDEntry::new(tag, field_type, value));
    }

    let mut cursor = std::io::Cursor::new(&block[count as usize * entry_len..]);
    ifd.next_ifd_offset = read_offset(&mut cursor, is_big_tiff, handler.as_ref())?;

    debug!("Read IFD #{} at offset {} with {} entries, next IFD at {}",
           number, offset, ifd.entry_count(), ifd.next_ifd_offset);
    Ok(ifd)
}

/// Maps 64-bit field types onto their classic equivalents
fn classic_field_type(field_type: u16) -> u16 {
    match field_type {
        field_types::LONG8 => field_types::LONG,
        field_types::SLONG8 => field_types::SLONG,
        field_types::IFD8 => field_types::IFD,
        other => other,
    }
}

/// Serialized IFD: the bytes to write at `offset` and where its next-IFD link lives
pub struct SerializedIfd {
    /// Entries block followed by out-of-line values
    pub bytes: Vec<u8>,
    /// Absolute position of the next-IFD offset field
    pub next_offset_position: u64,
}

/// Serializes `ifd` for storage at the (even) position `offset`
///
/// Entries are written in ascending tag order. Values that do not fit
/// inline follow the entries block, each starting at an even position.
pub fn serialize_ifd(ifd: &IFD, offset: u64, byte_order: ByteOrder, is_big_tiff: bool) -> TiffResult<SerializedIfd> {
    let handler = byte_order.create_handler();
    let count = ifd.entry_count() as u64;
    let block_size = entries_block_size(count, is_big_tiff);

    let mut block: Vec<u8> = Vec::with_capacity(block_size as usize);
    let mut extra: Vec<u8> = Vec::new();

    if is_big_tiff {
        handler.write_u64(&mut block, count)?;
    } else {
        let count = u16::try_from(count).map_err(|_| TiffError::FormatError(format!(
            "{} IFD entries do not fit classic TIFF", count)))?;
        handler.write_u16(&mut block, count)?;
    }

    for entry in ifd.entries() {
        let field_type = if is_big_tiff { entry.field_type } else { classic_field_type(entry.field_type) };
        let encoded_entry = IFDEntry { tag: entry.tag, field_type, value: entry.value.clone() };
        let data = tag_utils::encode_tag_value(&encoded_entry, handler.as_ref())?;
        let value_count = tag_utils::field_type_size(field_type)
            .map(|size| data.len() as u64 / size)
            .ok_or(TiffError::UnsupportedFieldType(field_type))?;

        handler.write_u16(&mut block, entry.tag)?;
        handler.write_u16(&mut block, field_type)?;
        if is_big_tiff {
            handler.write_u64(&mut block, value_count)?;
        } else {
            let value_count = u32::try_from(value_count).map_err(|_| TiffError::FormatError(format!(
                "Tag {} has too many values for classic TIFF", entry.tag)))?;
            handler.write_u32(&mut block, value_count)?;
        }

        let slot = offset_size(is_big_tiff) as usize;
        if tag_utils::is_value_inline(data.len() as u64, is_big_tiff) {
            block.extend_from_slice(&data);
            block.extend(std::iter::repeat(0u8).take(slot - data.len()));
        } else {
            let value_offset = offset + block_size + extra.len() as u64;
            write_utils::write_offset(&mut block, handler.as_ref(), value_offset, is_big_tiff)?;
            extra.extend_from_slice(&data);
            if extra.len() % 2 != 0 {
                extra.push(0);
            }
        }
        trace!("Serialized tag {} ({} bytes)", entry.tag, data.len());
    }

    let next_offset_position = offset + block.len() as u64;
    write_utils::write_offset(&mut block, handler.as_ref(), ifd.next_ifd_offset, is_big_tiff)?;
    block.extend_from_slice(&extra);

    Ok(SerializedIfd { bytes: block, next_offset_position })
}

/// Checks that a stream starts with a plausible header before parsing
pub fn ensure_minimal_length<R: Read + Seek + ?Sized>(reader: &mut R) -> TiffResult<u64> {
    let length = crate::io::seekable::stream_length(reader)?;
    if length < limits::MINIMAL_ALLOWED_TIFF_FILE_LENGTH {
        return Err(TiffError::FormatError(format!(
            "Too short TIFF file: only {} bytes (minimum {} bytes)",
            length, limits::MINIMAL_ALLOWED_TIFF_FILE_LENGTH)));
    }
    Ok(length)
}
