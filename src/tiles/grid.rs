//! Tile grid geometry
//!
//! A `TileGrid` is computed once from an IFD and copied into every map,
//! so later changes to the IFD cannot disturb a map in use. Strips are
//! treated as tiles whose width is the image width.
//!
//! Region buffers use the on-disk sample layout: chunky pixels are
//! interleaved, and separated images store each plane contiguously one
//! after another. Every row starts on a byte boundary.

use log::trace;

use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::limits;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiles::index::TileIndex;
use crate::tiles::region::Region;
use crate::utils::bit_utils;

/// Geometry of one image's tile or strip grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    pub ifd_id: u64,
    pub dim_x: u32,
    pub dim_y: u32,
    pub tile_size_x: u32,
    pub tile_size_y: u32,
    pub tile_count_x: u32,
    pub tile_count_y: u32,
    pub planes: u16,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    pub is_tiled: bool,
    pub byte_order: ByteOrder,
}

/// Dimensions of one block copied between two row-packed buffers
#[derive(Debug, Clone, Copy)]
pub struct BlockCopy {
    pub width: u64,
    pub height: u64,
    pub bits_per_pixel: u64,
}

/// Copies a block of pixels between two row-packed buffers
///
/// `src_at` and `dst_at` are (x, y) pixel origins; strides are row sizes
/// in bytes.
pub fn copy_block(
    src: &[u8],
    src_stride: u64,
    src_at: (u64, u64),
    dst: &mut [u8],
    dst_stride: u64,
    dst_at: (u64, u64),
    block: BlockCopy,
) {
    let bpp = block.bits_per_pixel;
    let row_bits = block.width * bpp;
    for row in 0..block.height {
        let src_bit = (src_at.1 + row) * src_stride * 8 + src_at.0 * bpp;
        let dst_bit = (dst_at.1 + row) * dst_stride * 8 + dst_at.0 * bpp;
        bit_utils::copy_bits(src, src_bit, dst, dst_bit, row_bits);
    }
}

fn ceil_div(a: u32, b: u32) -> u32 {
    ((a as u64 + b as u64 - 1) / b as u64) as u32
}

impl TileGrid {
    /// Computes the grid of `ifd`
    ///
    /// Fails with a format error for zero or inconsistent dimensions and
    /// with `UnsupportedBitDepth` when samples are not uniformly 1, 8, 16,
    /// 24, 32 or 64 bits.
    pub fn from_ifd(ifd: &IFD) -> TiffResult<Self> {
        let dim_x = ifd.image_width()?;
        let dim_y = ifd.image_height()?;
        let tile_size_x = ifd.tile_size_x()?;
        let tile_size_y = ifd.tile_size_y()?;
        let samples_per_pixel = ifd.samples_per_pixel()?;
        let bits_per_sample = ifd.uniform_bits_per_sample()?;
        let planes = ifd.number_of_separated_planes()?;

        let grid = TileGrid {
            ifd_id: ifd.id(),
            dim_x,
            dim_y,
            tile_size_x,
            tile_size_y,
            tile_count_x: ceil_div(dim_x, tile_size_x),
            tile_count_y: ceil_div(dim_y, tile_size_y),
            planes,
            samples_per_pixel,
            bits_per_sample,
            is_tiled: ifd.is_tiled(),
            byte_order: ifd.byte_order(),
        };

        if grid.tile_count() > limits::MAX_TILE_INDEX {
            return Err(TiffError::FormatError(format!(
                "Too many tiles: {}x{}x{}", grid.tile_count_x, grid.tile_count_y, planes)));
        }
        if grid.plane_bytes(grid.tile_size_x, grid.tile_size_y) > limits::MAX_REGION_BYTES {
            return Err(TiffError::FormatError(format!(
                "Tile {}x{} is too large", grid.tile_size_x, grid.tile_size_y)));
        }

        trace!("Grid for IFD {}: {}x{} image, {}x{} tiles of {}x{}, {} plane(s)",
               grid.ifd_id, dim_x, dim_y, grid.tile_count_x, grid.tile_count_y,
               tile_size_x, tile_size_y, planes);
        Ok(grid)
    }

    /// Image bounds as a region
    pub fn image_region(&self) -> Region {
        Region::new(0, 0, self.dim_x, self.dim_y)
    }

    /// Total number of tile slots, over all planes
    pub fn tile_count(&self) -> u64 {
        self.tile_count_x as u64 * self.tile_count_y as u64 * self.planes as u64
    }

    /// Tile slots of one plane
    pub fn tile_count_per_plane(&self) -> u64 {
        self.tile_count_x as u64 * self.tile_count_y as u64
    }

    /// Samples stored together in one plane
    pub fn samples_per_plane(&self) -> u16 {
        if self.planes > 1 { 1 } else { self.samples_per_pixel }
    }

    /// Bits of one pixel within one plane
    pub fn bits_per_pixel(&self) -> u64 {
        self.samples_per_plane() as u64 * self.bits_per_sample as u64
    }

    /// Bytes per sample when samples are byte aligned, else 1
    pub fn bytes_per_sample(&self) -> usize {
        ((self.bits_per_sample as usize) / 8).max(1)
    }

    /// Row size in bytes for a row of `width` pixels in one plane
    pub fn row_bytes(&self, width: u32) -> u64 {
        bit_utils::row_bytes(width as u64, self.bits_per_pixel())
    }

    /// Bytes of one plane of a `width`×`height` block
    pub fn plane_bytes(&self, width: u32, height: u32) -> u64 {
        self.row_bytes(width) * height as u64
    }

    /// Bytes of a region buffer covering all planes
    pub fn region_bytes(&self, region: &Region) -> TiffResult<usize> {
        let bytes = self.plane_bytes(region.width, region.height) * self.planes as u64;
        if bytes > limits::MAX_REGION_BYTES {
            return Err(TiffError::FormatError(format!(
                "Region {} needs {} bytes, more than a single buffer allows", region, bytes)));
        }
        Ok(bytes as usize)
    }

    /// Validated index of one tile
    pub fn index_of(&self, plane: u16, x: u32, y: u32) -> TiffResult<TileIndex> {
        if plane >= self.planes {
            return Err(TiffError::IndexError(format!(
                "Plane index {} out of range 0..{}", plane, self.planes)));
        }
        if x >= self.tile_count_x || y >= self.tile_count_y {
            return Err(TiffError::IndexError(format!(
                "Tile ({}, {}) out of range {}x{}", x, y, self.tile_count_x, self.tile_count_y)));
        }
        Ok(TileIndex::new(self.ifd_id, plane, x, y))
    }

    /// Position of a tile in the offsets and byte-counts arrays
    pub fn linear_index(&self, index: &TileIndex) -> usize {
        ((index.plane as u64 * self.tile_count_y as u64 + index.y as u64) * self.tile_count_x as u64
            + index.x as u64) as usize
    }

    /// Inverse of `linear_index`
    pub fn index_at(&self, linear: usize) -> TiffResult<TileIndex> {
        if linear as u64 >= self.tile_count() {
            return Err(TiffError::IndexError(format!(
                "Tile number {} out of range 0..{}", linear, self.tile_count())));
        }
        let per_plane = self.tile_count_per_plane() as usize;
        let plane = (linear / per_plane) as u16;
        let rest = linear % per_plane;
        let y = (rest / self.tile_count_x as usize) as u32;
        let x = (rest % self.tile_count_x as usize) as u32;
        Ok(TileIndex::new(self.ifd_id, plane, x, y))
    }

    /// All tile indices in linear order
    pub fn all_indices(&self) -> Vec<TileIndex> {
        let mut result = Vec::with_capacity(self.tile_count() as usize);
        for plane in 0..self.planes {
            for y in 0..self.tile_count_y {
                for x in 0..self.tile_count_x {
                    result.push(TileIndex::new(self.ifd_id, plane, x, y));
                }
            }
        }
        result
    }

    /// Pixel footprint of a tile, not clipped to the image
    pub fn tile_bounds(&self, index: &TileIndex) -> Region {
        Region::new(index.x * self.tile_size_x, index.y * self.tile_size_y,
                    self.tile_size_x, self.tile_size_y)
    }

    /// Pixel footprint of a tile clipped to the image
    pub fn tile_region(&self, index: &TileIndex) -> Region {
        let bounds = self.tile_bounds(index);
        bounds.intersection(&self.image_region()).unwrap_or(Region::new(bounds.x, bounds.y, 0, 0))
    }

    /// Pixel size of the decoded buffer of a tile
    ///
    /// Tiles are always full size; the last strip is cropped to the image.
    pub fn tile_buffer_size(&self, index: &TileIndex) -> (u32, u32) {
        if self.is_tiled {
            (self.tile_size_x, self.tile_size_y)
        } else {
            (self.tile_size_x, self.tile_region(index).height)
        }
    }

    /// Expected decoded byte length of a tile
    pub fn tile_buffer_bytes(&self, index: &TileIndex) -> usize {
        let (w, h) = self.tile_buffer_size(index);
        self.plane_bytes(w, h) as usize
    }

    /// Tiles overlapping `region`, ordered by plane, then row, then column
    ///
    /// `region` must lie inside the image.
    pub fn tiles_in_region(&self, region: &Region) -> Vec<TileIndex> {
        if region.is_empty() {
            return Vec::new();
        }
        let min_x = region.x / self.tile_size_x;
        let min_y = region.y / self.tile_size_y;
        let max_x = ((region.end_x() - 1) / self.tile_size_x as u64) as u32;
        let max_y = ((region.end_y() - 1) / self.tile_size_y as u64) as u32;
        let max_x = max_x.min(self.tile_count_x - 1);
        let max_y = max_y.min(self.tile_count_y - 1);

        let mut result = Vec::new();
        for plane in 0..self.planes {
            for y in min_y..=max_y {
                for x in min_x..=max_x {
                    result.push(TileIndex::new(self.ifd_id, plane, x, y));
                }
            }
        }
        result
    }

    /// Clips `region` to the image, or rejects it when it leaves the image
    pub fn check_region(&self, region: &Region, crop_to_image: bool) -> TiffResult<Region> {
        let image = self.image_region();
        if image.contains(region) {
            return Ok(*region);
        }
        if !crop_to_image {
            return Err(TiffError::IndexError(format!(
                "Region {} is outside the {}x{} image", region, self.dim_x, self.dim_y)));
        }
        Ok(region.intersection(&image).unwrap_or(Region::new(
            region.x.min(self.dim_x), region.y.min(self.dim_y), 0, 0)))
    }
}
