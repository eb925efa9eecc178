//! TIFF tag utilities
//!
//! Conversion between the raw bytes of an IFD entry and its typed value.

use byteorder::ReadBytesExt;
use std::io::Cursor;

use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::constants::field_types;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFDEntry, TagValue};

/// Size in bytes of one value of a field type
///
/// # Returns
/// None for field types this crate does not know
pub fn field_type_size(field_type: u16) -> Option<u64> {
    match field_type {
        field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED | field_types::ASCII => Some(1),
        field_types::SHORT | field_types::SSHORT => Some(2),
        field_types::LONG | field_types::SLONG | field_types::FLOAT | field_types::IFD => Some(4),
        field_types::RATIONAL | field_types::SRATIONAL | field_types::DOUBLE |
        field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => Some(8),
        _ => None,
    }
}

/// Determines if a value of `byte_len` bytes is stored inline in its entry
///
/// # Arguments
/// * `byte_len` - Total size of the value in bytes
/// * `is_big_tiff` - Whether the file is BigTIFF format
pub fn is_value_inline(byte_len: u64, is_big_tiff: bool) -> bool {
    if is_big_tiff {
        byte_len <= 8
    } else {
        byte_len <= 4
    }
}

/// Total size in bytes of a value with the given type and count
pub fn value_byte_len(field_type: u16, count: u64) -> TiffResult<u64> {
    let size = field_type_size(field_type).ok_or(TiffError::UnsupportedFieldType(field_type))?;
    count.checked_mul(size)
        .ok_or_else(|| TiffError::FormatError(format!("Entry value count {} is too large", count)))
}

fn integers(values: Vec<u64>) -> TagValue {
    if values.len() == 1 {
        TagValue::Int(values[0])
    } else {
        TagValue::IntArray(values)
    }
}

/// Decodes the raw bytes of an entry into a typed value
///
/// Signed integers are sign-extended and stored in two's complement, so
/// encoding them again with the same field type reproduces the input.
///
/// # Arguments
/// * `field_type` - TIFF field type of the entry
/// * `count` - Number of values
/// * `data` - Exactly the value bytes, in file byte order
/// * `handler` - Byte order handler of the file
pub fn decode_tag_value(
    field_type: u16,
    count: u64,
    data: &[u8],
    handler: &dyn ByteOrderHandler,
) -> TiffResult<TagValue> {
    let byte_len = value_byte_len(field_type, count)?;
    if (data.len() as u64) < byte_len {
        return Err(TiffError::FormatError(format!(
            "Entry value needs {} bytes, only {} available", byte_len, data.len())));
    }

    let mut cursor = Cursor::new(&data[..byte_len as usize]);
    let n = count as usize;

    let value = match field_type {
        field_types::BYTE | field_types::UNDEFINED => TagValue::Bytes(data[..n].to_vec()),
        field_types::ASCII => {
            let mut bytes = data[..n].to_vec();
            while bytes.last() == Some(&0) {
                bytes.pop();
            }
            TagValue::Str(String::from_utf8_lossy(&bytes).into_owned())
        },
        field_types::SBYTE => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                values.push(cursor.read_i8()? as i64 as u64);
            }
            integers(values)
        },
        field_types::SHORT | field_types::SSHORT => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                let v = handler.read_u16(&mut cursor)?;
                values.push(if field_type == field_types::SSHORT { v as i16 as i64 as u64 } else { v as u64 });
            }
            integers(values)
        },
        field_types::LONG | field_types::SLONG | field_types::IFD => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                let v = handler.read_u32(&mut cursor)?;
                values.push(if field_type == field_types::SLONG { v as i32 as i64 as u64 } else { v as u64 });
            }
            integers(values)
        },
        field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                values.push(handler.read_u64(&mut cursor)?);
            }
            integers(values)
        },
        field_types::RATIONAL | field_types::SRATIONAL => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                values.push(handler.read_rational(&mut cursor)?);
            }
            TagValue::Rational(values)
        },
        field_types::FLOAT => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                values.push(handler.read_f32(&mut cursor)? as f64);
            }
            TagValue::Float(values)
        },
        field_types::DOUBLE => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                values.push(handler.read_f64(&mut cursor)?);
            }
            TagValue::Float(values)
        },
        _ => return Err(TiffError::UnsupportedFieldType(field_type)),
    };

    Ok(value)
}

fn mismatch(entry: &IFDEntry) -> TiffError {
    TiffError::FormatError(format!(
        "Tag {} holds a value that cannot be stored as field type {}", entry.tag, entry.field_type))
}

fn checked_unsigned(entry: &IFDEntry, value: u64, max: u64) -> TiffResult<u64> {
    if value > max {
        return Err(TiffError::FormatError(format!(
            "Value {} of tag {} does not fit field type {}", value, entry.tag, entry.field_type)));
    }
    Ok(value)
}

/// Encodes the value of an entry into bytes in file byte order
///
/// # Returns
/// The value bytes; their length is `count * field_type_size`
pub fn encode_tag_value(entry: &IFDEntry, handler: &dyn ByteOrderHandler) -> TiffResult<Vec<u8>> {
    let mut out: Vec<u8> = Vec::new();

    match entry.field_type {
        field_types::ASCII => match &entry.value {
            TagValue::Str(s) => {
                out.extend_from_slice(s.as_bytes());
                out.push(0);
            },
            TagValue::Bytes(b) => out.extend_from_slice(b),
            _ => return Err(mismatch(entry)),
        },
        field_types::BYTE | field_types::UNDEFINED | field_types::SBYTE => match &entry.value {
            TagValue::Bytes(b) => out.extend_from_slice(b),
            other => {
                let values = other.as_u64_vec().ok_or_else(|| mismatch(entry))?;
                for v in values {
                    if entry.field_type == field_types::SBYTE {
                        out.push(v as u8);
                    } else {
                        out.push(checked_unsigned(entry, v, u8::MAX as u64)? as u8);
                    }
                }
            },
        },
        field_types::SHORT | field_types::SSHORT => {
            let values = entry.value.as_u64_vec().ok_or_else(|| mismatch(entry))?;
            for v in values {
                let v = if entry.field_type == field_types::SHORT {
                    checked_unsigned(entry, v, u16::MAX as u64)?
                } else {
                    v
                };
                handler.write_u16(&mut out, v as u16)?;
            }
        },
        field_types::LONG | field_types::SLONG | field_types::IFD => {
            let values = entry.value.as_u64_vec().ok_or_else(|| mismatch(entry))?;
            for v in values {
                let v = if entry.field_type == field_types::SLONG {
                    v
                } else {
                    checked_unsigned(entry, v, u32::MAX as u64)?
                };
                handler.write_u32(&mut out, v as u32)?;
            }
        },
        field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => {
            let values = entry.value.as_u64_vec().ok_or_else(|| mismatch(entry))?;
            for v in values {
                handler.write_u64(&mut out, v)?;
            }
        },
        field_types::RATIONAL | field_types::SRATIONAL => match &entry.value {
            TagValue::Rational(values) => {
                for (num, den) in values {
                    handler.write_u32(&mut out, *num)?;
                    handler.write_u32(&mut out, *den)?;
                }
            },
            _ => return Err(mismatch(entry)),
        },
        field_types::FLOAT => match &entry.value {
            TagValue::Float(values) => {
                for v in values {
                    handler.write_f32(&mut out, *v as f32)?;
                }
            },
            _ => return Err(mismatch(entry)),
        },
        field_types::DOUBLE => match &entry.value {
            TagValue::Float(values) => {
                for v in values {
                    handler.write_f64(&mut out, *v)?;
                }
            },
            _ => return Err(mismatch(entry)),
        },
        other => return Err(TiffError::UnsupportedFieldType(other)),
    }

    Ok(out)
}
