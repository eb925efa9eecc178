//! Handler for PackBits compressed data
//!
//! Byte-oriented run-length encoding. Each row is encoded separately.

use log::debug;

use crate::compression::options::CodecOptions;
use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;

/// PackBits compression handler (compression code 32773)
pub struct PackBitsHandler;

fn encode_row(row: &[u8], out: &mut Vec<u8>) {
    let len = row.len();
    let mut i = 0;
    while i < len {
        let mut run = 1;
        while i + run < len && run < 128 && row[i + run] == row[i] {
            run += 1;
        }
        if run >= 3 {
            out.push((1 - run as i16) as i8 as u8);
            out.push(row[i]);
            i += run;
            continue;
        }

        let start = i;
        while i < len && i - start < 128 {
            if i + 2 < len && row[i] == row[i + 1] && row[i + 1] == row[i + 2] {
                break;
            }
            i += 1;
        }
        out.push((i - start - 1) as u8);
        out.extend_from_slice(&row[start..i]);
    }
}

impl CompressionHandler for PackBitsHandler {
    fn decompress(&self, data: &[u8], options: &CodecOptions) -> TiffResult<Vec<u8>> {
        let mut out = Vec::with_capacity(options.expected_len);
        let mut i = 0;
        while i < data.len() {
            let n = data[i] as i8;
            i += 1;
            if n >= 0 {
                let count = n as usize + 1;
                let end = i + count;
                if end > data.len() {
                    return Err(TiffError::FormatError("Truncated PackBits literal run".to_string()));
                }
                out.extend_from_slice(&data[i..end]);
                i = end;
            } else if n != -128 {
                let count = (1 - n as i16) as usize;
                let value = *data.get(i)
                    .ok_or_else(|| TiffError::FormatError("Truncated PackBits repeat run".to_string()))?;
                out.extend(std::iter::repeat(value).take(count));
                i += 1;
            }
            if options.expected_len > 0 && out.len() >= options.expected_len {
                break;
            }
        }
        Ok(out)
    }

    fn compress(&self, data: &[u8], options: &CodecOptions) -> TiffResult<Vec<u8>> {
        let row_bytes = options.row_bytes().max(1);
        let mut out = Vec::with_capacity(data.len() + data.len() / 128 + 1);
        for row in data.chunks(row_bytes) {
            encode_row(row, &mut out);
        }
        debug!("PackBits compressed {} bytes to {}", data.len(), out.len());
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "PackBits"
    }

    fn code(&self) -> u64 {
        compression::PACKBITS as u64
    }
}
