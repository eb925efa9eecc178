//! Byte order utilities for sample data
//!
//! Tile payloads are kept in file byte order. When data moves between
//! files of different byte order, multi-byte samples are swapped in place.

use crate::tiff::errors::{TiffError, TiffResult};

/// Reverses the byte order of every sample in `data`
///
/// # Arguments
/// * `data` - Sample bytes, a whole number of samples
/// * `bytes_per_sample` - Size of one sample (1 leaves data unchanged)
pub fn swap_sample_bytes(data: &mut [u8], bytes_per_sample: usize) -> TiffResult<()> {
    if bytes_per_sample <= 1 {
        return Ok(());
    }
    if data.len() % bytes_per_sample != 0 {
        return Err(TiffError::FormatError(format!(
            "Data length {} is not a multiple of sample size {}", data.len(), bytes_per_sample)));
    }
    for sample in data.chunks_exact_mut(bytes_per_sample) {
        sample.reverse();
    }
    Ok(())
}
