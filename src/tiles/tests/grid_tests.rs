//! Tests for the tile grid

extern crate std;

use super::test_utils::image_ifd;
use crate::tiff::errors::TiffError;
use crate::tiles::grid::{copy_block, BlockCopy, TileGrid};
use crate::tiles::index::TileIndex;
use crate::tiles::region::Region;

#[test]
fn test_tile_counts_use_ceiling_division() {
    let grid = TileGrid::from_ifd(&image_ifd(1000, 1000, Some((256, 256)), 1, 8)).unwrap();
    std::assert_eq!(grid.tile_count_x, 4);
    std::assert_eq!(grid.tile_count_y, 4);
    std::assert_eq!(grid.tile_count(), 16);
}

#[test]
fn test_planar_grid_counts_every_plane() {
    let mut ifd = image_ifd(800, 600, Some((256, 256)), 3, 8);
    ifd.set_planar_separated(true);
    let grid = TileGrid::from_ifd(&ifd).unwrap();
    std::assert_eq!(grid.planes, 3);
    std::assert_eq!(grid.tile_count(), 4 * 3 * 3);
    std::assert_eq!(grid.bits_per_pixel(), 8);
}

#[test]
fn test_strip_grid() {
    let mut ifd = image_ifd(100, 50, None, 1, 8);
    ifd.set_rows_per_strip(16);
    let grid = TileGrid::from_ifd(&ifd).unwrap();
    std::assert!(!grid.is_tiled);
    std::assert_eq!((grid.tile_size_x, grid.tile_size_y), (100, 16));
    std::assert_eq!((grid.tile_count_x, grid.tile_count_y), (1, 4));

    // the last strip is cropped to the image
    let last = grid.index_of(0, 0, 3).unwrap();
    std::assert_eq!(grid.tile_buffer_size(&last), (100, 2));
    std::assert_eq!(grid.tile_buffer_bytes(&last), 200);
}

#[test]
fn test_rows_per_strip_larger_than_image() {
    let mut ifd = image_ifd(10, 5, None, 1, 8);
    ifd.set_rows_per_strip(1000);
    let grid = TileGrid::from_ifd(&ifd).unwrap();
    std::assert_eq!(grid.tile_size_y, 5);
    std::assert_eq!(grid.tile_count(), 1);
}

#[test]
fn test_edge_tiles_keep_full_buffers() {
    let grid = TileGrid::from_ifd(&image_ifd(300, 300, Some((256, 256)), 1, 8)).unwrap();
    let edge = grid.index_of(0, 1, 1).unwrap();
    std::assert_eq!(grid.tile_buffer_size(&edge), (256, 256));
    std::assert_eq!(grid.tile_region(&edge), Region::new(256, 256, 44, 44));
}

#[test]
fn test_linear_index_round_trip() {
    let mut ifd = image_ifd(100, 100, Some((32, 32)), 2, 16);
    ifd.set_planar_separated(true);
    let grid = TileGrid::from_ifd(&ifd).unwrap();
    let index = grid.index_of(1, 2, 3).unwrap();
    let linear = grid.linear_index(&index);
    std::assert_eq!(linear, (1 * 4 + 3) * 4 + 2);
    std::assert_eq!(grid.index_at(linear).unwrap(), index);
    std::assert!(grid.index_at(grid.tile_count() as usize).is_err());
}

#[test]
fn test_index_out_of_range() {
    let grid = TileGrid::from_ifd(&image_ifd(100, 100, Some((64, 64)), 1, 8)).unwrap();
    std::assert!(matches!(grid.index_of(0, 2, 0), Err(TiffError::IndexError(_))));
    std::assert!(matches!(grid.index_of(1, 0, 0), Err(TiffError::IndexError(_))));
}

#[test]
fn test_tiles_in_region_is_stable_and_ordered() {
    let grid = TileGrid::from_ifd(&image_ifd(1000, 1000, Some((256, 256)), 1, 8)).unwrap();
    let region = Region::new(200, 300, 400, 100);
    let first = grid.tiles_in_region(&region);
    let second = grid.tiles_in_region(&region);
    std::assert_eq!(first, second);

    let id = grid.ifd_id;
    std::assert_eq!(first, vec![
        TileIndex::new(id, 0, 0, 1),
        TileIndex::new(id, 0, 1, 1),
        TileIndex::new(id, 0, 2, 1),
    ]);
    let mut sorted = first.clone();
    sorted.sort();
    std::assert_eq!(sorted, first);
}

#[test]
fn test_tiles_in_region_cover_every_pixel_once() {
    let grid = TileGrid::from_ifd(&image_ifd(500, 400, Some((128, 64)), 1, 8)).unwrap();
    let region = Region::new(100, 50, 300, 300);
    let covered: u64 = grid.tiles_in_region(&region)
        .iter()
        .filter_map(|index| grid.tile_region(index).intersection(&region))
        .map(|overlap| overlap.pixel_count())
        .sum();
    std::assert_eq!(covered, region.pixel_count());
}

#[test]
fn test_check_region_crop_policy() {
    let grid = TileGrid::from_ifd(&image_ifd(100, 80, Some((16, 16)), 1, 8)).unwrap();
    let outside = Region::new(90, 70, 20, 20);
    std::assert!(matches!(grid.check_region(&outside, false), Err(TiffError::IndexError(_))));
    std::assert_eq!(grid.check_region(&outside, true).unwrap(), Region::new(90, 70, 10, 10));

    let beyond = Region::new(200, 200, 5, 5);
    std::assert!(grid.check_region(&beyond, true).unwrap().is_empty());
}

#[test]
fn test_unsupported_bit_depth() {
    let ifd = image_ifd(10, 10, Some((16, 16)), 1, 12);
    std::assert!(matches!(TileGrid::from_ifd(&ifd), Err(TiffError::UnsupportedBitDepth(_))));
}

#[test]
fn test_one_bit_rows_are_byte_aligned() {
    let grid = TileGrid::from_ifd(&image_ifd(10, 3, None, 1, 1)).unwrap();
    std::assert_eq!(grid.row_bytes(10), 2);
    std::assert_eq!(grid.region_bytes(&Region::new(0, 0, 10, 3)).unwrap(), 6);
}

#[test]
fn test_copy_block_bytes() {
    let src: Vec<u8> = (0..16).collect();
    let mut dst = vec![0u8; 9];
    copy_block(&src, 4, (1, 1), &mut dst, 3, (1, 1),
               BlockCopy { width: 2, height: 2, bits_per_pixel: 8 });
    std::assert_eq!(dst, vec![0, 0, 0, 0, 5, 6, 0, 9, 10]);
}

#[test]
fn test_copy_block_bits() {
    let src = vec![0b1111_0000u8];
    let mut dst = vec![0u8];
    copy_block(&src, 1, (0, 0), &mut dst, 1, (2, 0),
               BlockCopy { width: 4, height: 1, bits_per_pixel: 1 });
    std::assert_eq!(dst, vec![0b0011_1100]);
}
