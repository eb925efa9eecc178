//! Horizontal differencing predictor (Predictor = 2)
//!
//! Applied to each row of a tile before compression and undone after
//! decompression. Samples are read and written in the file byte order.

use crate::compression::options::CodecOptions;
use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::predictor;
use crate::tiff::errors::{TiffError, TiffResult};

fn load(bytes: &[u8], byte_order: ByteOrder) -> u64 {
    let mut value = 0u64;
    match byte_order {
        ByteOrder::BigEndian => {
            for b in bytes {
                value = (value << 8) | *b as u64;
            }
        },
        ByteOrder::LittleEndian => {
            for b in bytes.iter().rev() {
                value = (value << 8) | *b as u64;
            }
        },
    }
    value
}

fn store(value: u64, bytes: &mut [u8], byte_order: ByteOrder) {
    let n = bytes.len();
    for (i, b) in bytes.iter_mut().enumerate() {
        let shift = match byte_order {
            ByteOrder::BigEndian => 8 * (n - 1 - i),
            ByteOrder::LittleEndian => 8 * i,
        };
        *b = (value >> shift) as u8;
    }
}

fn check(options: &CodecOptions) -> TiffResult<Option<usize>> {
    match options.predictor {
        predictor::NONE => Ok(None),
        predictor::HORIZONTAL_DIFFERENCING => match options.bits_per_sample {
            8 | 16 | 32 | 64 => Ok(Some(options.bits_per_sample as usize / 8)),
            bits => Err(TiffError::UnsupportedFormat(format!(
                "Horizontal differencing is not supported for {}-bit samples", bits))),
        },
        other => Err(TiffError::UnsupportedFormat(format!("Unsupported predictor {}", other))),
    }
}

fn mask(bytes_per_sample: usize) -> u64 {
    if bytes_per_sample >= 8 { u64::MAX } else { (1u64 << (bytes_per_sample * 8)) - 1 }
}

/// Reverses the predictor after decoding
pub fn undo(data: &mut [u8], options: &CodecOptions) -> TiffResult<()> {
    let bytes_per_sample = match check(options)? {
        Some(n) => n,
        None => return Ok(()),
    };
    let row_bytes = options.row_bytes();
    let step = options.samples_per_pixel as usize * bytes_per_sample;
    let mask = mask(bytes_per_sample);
    if row_bytes == 0 {
        return Ok(());
    }

    for row in data.chunks_exact_mut(row_bytes) {
        let mut k = step;
        while k + bytes_per_sample <= row.len() {
            let prev = load(&row[k - step..k - step + bytes_per_sample], options.byte_order);
            let cur = load(&row[k..k + bytes_per_sample], options.byte_order);
            store(cur.wrapping_add(prev) & mask, &mut row[k..k + bytes_per_sample], options.byte_order);
            k += bytes_per_sample;
        }
    }
    Ok(())
}

/// Applies the predictor before encoding
pub fn apply(data: &mut [u8], options: &CodecOptions) -> TiffResult<()> {
    let bytes_per_sample = match check(options)? {
        Some(n) => n,
        None => return Ok(()),
    };
    let row_bytes = options.row_bytes();
    let step = options.samples_per_pixel as usize * bytes_per_sample;
    let mask = mask(bytes_per_sample);
    if row_bytes == 0 {
        return Ok(());
    }

    for row in data.chunks_exact_mut(row_bytes) {
        let samples = row.len() / bytes_per_sample;
        for s in (options.samples_per_pixel as usize..samples).rev() {
            let k = s * bytes_per_sample;
            let prev = load(&row[k - step..k - step + bytes_per_sample], options.byte_order);
            let cur = load(&row[k..k + bytes_per_sample], options.byte_order);
            store(cur.wrapping_sub(prev) & mask, &mut row[k..k + bytes_per_sample], options.byte_order);
        }
    }
    Ok(())
}
