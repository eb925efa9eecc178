//! Options passed to codecs
//!
//! Built from the tile grid of an image, then adjusted by the compression
//! kind before each decode or encode.

use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::predictor;
use crate::tiles::grid::TileGrid;

/// Parameters of one tile encode or decode
#[derive(Debug, Clone, PartialEq)]
pub struct CodecOptions {
    /// Pixel width of the tile buffer
    pub width: u32,
    /// Pixel height of the tile buffer
    pub height: u32,
    pub bits_per_sample: u16,
    /// Samples interleaved in one plane
    pub samples_per_pixel: u16,
    pub photometric: Option<u16>,
    pub byte_order: ByteOrder,
    pub predictor: u16,
    /// Quality hint in [0, 1], from writer options
    pub quality: Option<f64>,
    /// Codec-specific compression level chosen from the quality hint
    pub level: Option<i32>,
    /// Decoded size the tile should have
    pub expected_len: usize,
}

impl CodecOptions {
    /// Options for a tile buffer of `width`×`height` pixels in `grid`
    pub fn for_tile(grid: &TileGrid, width: u32, height: u32) -> Self {
        CodecOptions {
            width,
            height,
            bits_per_sample: grid.bits_per_sample,
            samples_per_pixel: grid.samples_per_plane(),
            photometric: None,
            byte_order: grid.byte_order,
            predictor: predictor::NONE,
            quality: None,
            level: None,
            expected_len: grid.plane_bytes(width, height) as usize,
        }
    }

    /// Bytes of one decoded row
    pub fn row_bytes(&self) -> usize {
        ((self.width as u64 * self.samples_per_pixel as u64 * self.bits_per_sample as u64 + 7) / 8) as usize
    }
}
