//! End-to-end tests over files on disk

extern crate std;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use tiffgrid::tiff::constants::{compression, tags};
use tiffgrid::tiff::{ByteOrder, ErrorKind, IFD};
use tiffgrid::{ReaderOptions, Region, TiffCopier, TiffError, TiffReader, TiffWriter, TileGrid, WriterOptions};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn tiled_ifd(width: u32, height: u32, tile: u32, samples: u16, bits: u16) -> IFD {
    let mut ifd = IFD::new(0, 0);
    ifd.set_image_dimensions(width, height);
    ifd.set_tile_sizes(tile, tile);
    ifd.set_samples_per_pixel(samples);
    ifd.set_bits_per_sample(bits).unwrap();
    ifd
}

fn pattern(len: usize, seed: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + seed * 17) % 253) as u8).collect()
}

/// Bytes of `region` cut from a chunky buffer `row_bytes` wide
fn crop(data: &[u8], row_bytes: usize, bytes_per_pixel: usize, region: Region) -> Vec<u8> {
    let mut out = Vec::new();
    for y in region.y..region.y + region.height {
        let start = y as usize * row_bytes + region.x as usize * bytes_per_pixel;
        out.extend_from_slice(&data[start..start + region.width as usize * bytes_per_pixel]);
    }
    out
}

/// Writes one complete 8-bit gray image per entry of `images`
fn write_gray_file(path: &Path, options: WriterOptions, images: &[(u32, u32, u64)]) -> Vec<Vec<u8>> {
    init_logging();
    let writer = TiffWriter::create(path, options).unwrap();
    let mut contents = Vec::new();
    for (i, (width, height, code)) in images.iter().enumerate() {
        let mut ifd = tiled_ifd(*width, *height, 16, 1, 8);
        ifd.set_compression(*code);
        let mut map = writer.new_map(ifd).unwrap();
        let pixels = pattern((*width * *height) as usize, i);
        map.update_region(0, 0, *width, *height, &pixels).unwrap();
        writer.write_completed_tiles(&mut map).unwrap();
        writer.complete(&mut map).unwrap();
        contents.push(pixels);
    }
    writer.close().unwrap();
    contents
}

#[test]
fn test_solid_image_round_trip() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("solid.tif");

    let writer = TiffWriter::create(&path, WriterOptions::default()).unwrap();
    let mut map = writer.new_map(tiled_ifd(800, 600, 256, 1, 8)).unwrap();
    let completed = map.update_region(0, 0, 800, 600, &vec![200u8; 800 * 600]).unwrap();
    std::assert_eq!(completed.len(), 12);
    writer.complete(&mut map).unwrap();
    writer.close().unwrap();

    let reader = TiffReader::open(&path).unwrap();
    let read = reader.map_of_image(0).unwrap();
    std::assert_eq!(read.grid().tile_count(), 12);
    let samples = read.read_region(0, 0, 800, 600).unwrap();
    std::assert_eq!(samples.region, Region::new(0, 0, 800, 600));
    std::assert!(samples.data.iter().all(|v| *v == 200));
}

#[test]
fn test_partial_image_filled_on_complete() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("partial.tif");

    let writer = TiffWriter::create(&path, WriterOptions::default().with_filler(0)).unwrap();
    let mut map = writer.new_map(tiled_ifd(800, 600, 256, 1, 8)).unwrap();
    map.update_region(0, 0, 100, 100, &vec![10u8; 100 * 100]).unwrap();
    map.update_region(700, 500, 100, 100, &vec![20u8; 100 * 100]).unwrap();
    writer.complete(&mut map).unwrap();
    writer.close().unwrap();

    let reader = TiffReader::open(&path).unwrap();
    let data = reader.map_of_image(0).unwrap().read_region(0, 0, 800, 600).unwrap().data;
    for y in 0..600usize {
        for x in 0..800usize {
            let expected = if x < 100 && y < 100 {
                10
            } else if x >= 700 && y >= 500 {
                20
            } else {
                0
            };
            std::assert_eq!(data[y * 800 + x], expected, "pixel ({}, {})", x, y);
        }
    }
}

#[test]
fn test_grid_math() {
    let grid = TileGrid::from_ifd(&tiled_ifd(1000, 1000, 256, 1, 8)).unwrap();
    std::assert_eq!(grid.tile_count_x, 4);
    std::assert_eq!(grid.tile_count_y, 4);
    std::assert_eq!(grid.tile_count(), 16);
}

#[test]
fn test_direct_copy_keeps_encoded_tiles() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("source.tif");
    let target = dir.path().join("target.tif");
    let contents = write_gray_file(&source, WriterOptions::default(),
                                   &[(64, 48, compression::DEFLATE as u64), (32, 32, compression::DEFLATE as u64)]);

    let outcome = TiffCopier::new()
        .with_direct_copy(true)
        .copy_file(&source, &target, WriterOptions::default())
        .unwrap();
    std::assert_eq!(outcome.images, 2);
    std::assert_eq!(outcome.direct_tiles, 12 + 4);
    std::assert!(!outcome.cancelled);

    let from = TiffReader::open(&source).unwrap();
    let to = TiffReader::open(&target).unwrap();
    std::assert_eq!(to.number_of_images().unwrap(), 2);
    for i in 0..2 {
        let (a, b) = (from.read_ifd(i).unwrap(), to.read_ifd(i).unwrap());
        std::assert_eq!(b.compression_code(), compression::DEFLATE as u64);
        std::assert_eq!(a.tile_byte_counts().unwrap(), b.tile_byte_counts().unwrap());

        let (width, height) = (b.image_width().unwrap(), b.image_height().unwrap());
        let data = to.map(b).unwrap().read_region(0, 0, width, height).unwrap().data;
        std::assert_eq!(data, contents[i]);
    }
}

#[test]
fn test_copy_recompresses_when_asked() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("plain.tif");
    let target = dir.path().join("zstd.tif");
    let contents = write_gray_file(&source, WriterOptions::default(), &[(48, 40, compression::NONE as u64)]);

    let described = Arc::new(AtomicUsize::new(0));
    let counter = described.clone();
    let outcome = TiffCopier::new()
        .with_compression(compression::ZSTD as u64)
        .with_ifd_corrector(move |ifd: &mut IFD| {
            counter.fetch_add(1, Ordering::SeqCst);
            ifd.put_string(tags::IMAGE_DESCRIPTION, "recompressed");
            Ok(())
        })
        .copy_file(&source, &target, WriterOptions::default())
        .unwrap();
    std::assert_eq!(outcome.direct_tiles, 0);
    std::assert_eq!(described.load(Ordering::SeqCst), 1);

    let reader = TiffReader::open(&target).unwrap();
    let ifd = reader.read_ifd(0).unwrap();
    std::assert_eq!(ifd.compression_code(), compression::ZSTD as u64);
    std::assert_eq!(ifd.get_string(tags::IMAGE_DESCRIPTION), Some("recompressed"));
    std::assert_eq!(reader.map(ifd).unwrap().read_region(0, 0, 48, 40).unwrap().data, contents[0]);
}

#[test]
fn test_region_outside_image() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("small.tif");
    let contents = write_gray_file(&path, WriterOptions::default(), &[(40, 30, compression::NONE as u64)]);

    let strict = TiffReader::open_with_options(&path, ReaderOptions::default().with_crop_to_image(false)).unwrap();
    let err = strict.map_of_image(0).unwrap().read_region(30, 20, 20, 20).unwrap_err();
    std::assert!(matches!(err, TiffError::IndexError(_)));

    let cropping = TiffReader::open_with_options(&path, ReaderOptions::default().with_crop_to_image(true)).unwrap();
    let samples = cropping.map_of_image(0).unwrap().read_region(30, 20, 20, 20).unwrap();
    std::assert_eq!(samples.region, Region::new(30, 20, 10, 10));
    std::assert_eq!(samples.data, crop(&contents[0], 40, 1, Region::new(30, 20, 10, 10)));
}

#[test]
fn test_flushed_tiles_survive_without_complete() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("unfinished.tif");

    let writer = TiffWriter::create(&path, WriterOptions::default()).unwrap();
    let mut map = writer.new_map(tiled_ifd(32, 32, 16, 1, 8)).unwrap();
    map.update_region(0, 0, 16, 16, &vec![77u8; 256]).unwrap();
    std::assert_eq!(writer.write_completed_tiles(&mut map).unwrap(), 1);
    let index = map.index_of(0, 0, 0).unwrap();
    let tile = map.tile(&index).unwrap();
    let (offset, byte_count) = (tile.stored_offset().unwrap(), tile.stored_byte_count().unwrap());
    writer.close().unwrap();
    drop(writer);

    let reader = TiffReader::open(&path).unwrap();
    std::assert_eq!(reader.number_of_images().unwrap(), 0);
    std::assert_eq!(reader.read_bytes_at(offset, byte_count).unwrap(), vec![77u8; 256]);
}

#[test]
fn test_big_endian_big_tiff_16_bit() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big.tif");
    let options = WriterOptions::default().with_big_tiff(true).with_byte_order(ByteOrder::BigEndian);

    let (width, height) = (40u32, 20u32);
    let pixels: Vec<u8> = (0..width * height)
        .flat_map(|i| ((i * 300) as u16).to_be_bytes())
        .collect();

    let writer = TiffWriter::create(&path, options).unwrap();
    let mut ifd = tiled_ifd(width, height, 16, 1, 16);
    ifd.set_compression(compression::ZSTD as u64);
    let mut map = writer.new_map(ifd).unwrap();
    map.update_region(0, 0, width, height, &pixels).unwrap();
    writer.complete(&mut map).unwrap();
    writer.close().unwrap();

    let reader = TiffReader::open(&path).unwrap();
    let header = reader.header().unwrap();
    std::assert!(header.is_big_tiff);
    std::assert_eq!(header.byte_order, ByteOrder::BigEndian);

    let read = reader.map_of_image(0).unwrap();
    std::assert_eq!(read.read_region(0, 0, width, height).unwrap().data, pixels);
    let part = Region::new(5, 3, 20, 15);
    std::assert_eq!(read.read_region(5, 3, 20, 15).unwrap().data, crop(&pixels, 80, 2, part));
}

#[test]
fn test_copy_to_other_byte_order_swaps_samples() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("little.tif");
    let target = dir.path().join("swapped.tif");
    let pixels: Vec<u8> = (0..32u16 * 16).flat_map(|v| (v * 7).to_le_bytes()).collect();

    let writer = TiffWriter::create(&source, WriterOptions::default()).unwrap();
    let mut map = writer.new_map(tiled_ifd(32, 16, 16, 1, 16)).unwrap();
    map.update_region(0, 0, 32, 16, &pixels).unwrap();
    writer.complete(&mut map).unwrap();
    writer.close().unwrap();

    let outcome = TiffCopier::new()
        .with_direct_copy(true)
        .copy_file(&source, &target, WriterOptions::default().with_byte_order(ByteOrder::BigEndian))
        .unwrap();
    std::assert_eq!(outcome.direct_tiles, 0);

    let reader = TiffReader::open(&target).unwrap();
    let data = reader.map_of_image(0).unwrap().read_region(0, 0, 32, 16).unwrap().data;
    let expected: Vec<u8> = pixels.chunks(2).flat_map(|c| [c[1], c[0]]).collect();
    std::assert_eq!(data, expected);
}

#[test]
fn test_planar_separated_regions() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("planar.tif");
    let (width, height) = (20u32, 20u32);
    let plane_len = (width * height) as usize;
    let pixels: Vec<u8> = (0..3).flat_map(|p| pattern(plane_len, p)).collect();

    let writer = TiffWriter::create(&path, WriterOptions::default()).unwrap();
    let mut ifd = tiled_ifd(width, height, 16, 3, 8);
    ifd.set_planar_separated(true);
    let mut map = writer.new_map(ifd).unwrap();
    std::assert_eq!(map.grid().tile_count(), 12);
    map.update_region(0, 0, width, height, &pixels).unwrap();
    writer.complete(&mut map).unwrap();
    writer.close().unwrap();

    let reader = TiffReader::open(&path).unwrap();
    let read = reader.map_of_image(0).unwrap();
    let part = Region::new(4, 4, 14, 8);
    let data = read.read_region(4, 4, 14, 8).unwrap().data;
    let expected: Vec<u8> = (0..3)
        .flat_map(|p| crop(&pixels[p * plane_len..(p + 1) * plane_len], width as usize, 1, part))
        .collect();
    std::assert_eq!(data, expected);
}

#[test]
fn test_bilevel_strips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bilevel.tif");
    // 20 pixels per row: 3 bytes, the last one half used
    let rows: Vec<u8> = (0..5u8).flat_map(|r| [r, 0xA0 | r, 0xF0]).collect();

    let writer = TiffWriter::create(&path, WriterOptions::default()).unwrap();
    let mut ifd = IFD::new(0, 0);
    ifd.set_image_dimensions(20, 5);
    ifd.set_bits_per_sample(1).unwrap();
    ifd.set_rows_per_strip(2);
    ifd.set_compression(compression::PACKBITS as u64);
    let mut map = writer.new_map(ifd).unwrap();
    map.update_region(0, 0, 20, 5, &rows).unwrap();
    writer.complete(&mut map).unwrap();
    writer.close().unwrap();

    let reader = TiffReader::open(&path).unwrap();
    let read = reader.map_of_image(0).unwrap();
    std::assert_eq!(read.grid().tile_count(), 3);
    let middle = read.read_region(8, 0, 8, 5).unwrap().data;
    std::assert_eq!(middle, (0..5u8).map(|r| 0xA0 | r).collect::<Vec<u8>>());
}

#[test]
fn test_missing_tiles_strict_and_lenient() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sparse.tif");

    let writer = TiffWriter::create(&path, WriterOptions::default().with_missing_tiles_allowed(true)).unwrap();
    let mut map = writer.new_map(tiled_ifd(32, 16, 16, 1, 8)).unwrap();
    map.update_region(0, 0, 16, 16, &vec![1u8; 256]).unwrap();
    writer.complete(&mut map).unwrap();
    writer.close().unwrap();

    let lenient = TiffReader::open_with_options(&path, ReaderOptions::default().with_filler(0xEE)).unwrap();
    let data = lenient.map_of_image(0).unwrap().read_region(0, 0, 32, 16).unwrap().data;
    std::assert_eq!(crop(&data, 32, 1, Region::new(0, 0, 16, 16)), vec![1u8; 256]);
    std::assert_eq!(crop(&data, 32, 1, Region::new(16, 0, 16, 16)), vec![0xEEu8; 256]);

    let strict = TiffReader::open_with_options(&path, ReaderOptions::default().with_missing_tiles_allowed(false)).unwrap();
    let err = strict.map_of_image(0).unwrap().read_region(0, 0, 32, 16).unwrap_err();
    std::assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_append_to_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("append.tif");
    let first = write_gray_file(&path, WriterOptions::default().with_big_tiff(true), &[(16, 16, compression::NONE as u64)]);

    // the file's own format wins over the options
    let writer = TiffWriter::open_for_append(&path, WriterOptions::default()).unwrap();
    std::assert!(writer.is_big_tiff());
    let mut map = writer.new_map(tiled_ifd(16, 16, 16, 1, 8)).unwrap();
    map.update_region(0, 0, 16, 16, &vec![42u8; 256]).unwrap();
    writer.complete(&mut map).unwrap();
    writer.close().unwrap();

    let reader = TiffReader::open(&path).unwrap();
    std::assert_eq!(reader.number_of_images().unwrap(), 2);
    std::assert_eq!(reader.map_of_image(0).unwrap().read_region(0, 0, 16, 16).unwrap().data, first[0]);
    std::assert_eq!(reader.map_of_image(1).unwrap().read_region(0, 0, 16, 16).unwrap().data, vec![42u8; 256]);
}

#[test]
fn test_reset_sees_appended_images() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("growing.tif");
    let first = write_gray_file(&path, WriterOptions::default(), &[(32, 32, compression::DEFLATE as u64)]);

    let reader = TiffReader::open(&path).unwrap();
    let length = reader.file_length();
    std::assert_eq!(reader.number_of_images().unwrap(), 1);
    let map = reader.map_of_image(0).unwrap();
    map.read_cached_tile(map.index_of(0, 0, 0).unwrap()).unwrap();
    std::assert_eq!(reader.options().tile_cache.len(), 1);

    let writer = TiffWriter::open_for_append(&path, WriterOptions::default()).unwrap();
    let mut appended = writer.new_map(tiled_ifd(16, 16, 16, 1, 8)).unwrap();
    appended.update_region(0, 0, 16, 16, &vec![77u8; 256]).unwrap();
    writer.complete(&mut appended).unwrap();
    writer.close().unwrap();

    // the chain stays cached until reset
    std::assert_eq!(reader.number_of_images().unwrap(), 1);
    reader.reset().unwrap();
    std::assert!(reader.file_length() > length);
    std::assert_eq!(reader.options().tile_cache.len(), 0);
    std::assert_eq!(reader.number_of_images().unwrap(), 2);
    std::assert_eq!(reader.map_of_image(0).unwrap().read_region(0, 0, 32, 32).unwrap().data, first[0]);
    std::assert_eq!(reader.map_of_image(1).unwrap().read_region(0, 0, 16, 16).unwrap().data, vec![77u8; 256]);
}

#[test]
fn test_edit_one_tile_of_existing_image() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("edit.tif");
    let original = write_gray_file(&path, WriterOptions::default(), &[(32, 32, compression::DEFLATE as u64)]);

    let reader = TiffReader::open(&path).unwrap();
    let ifd = reader.read_ifd(0).unwrap();
    let ifd_offset = reader.read_first_ifd_offset().unwrap();
    let writer = TiffWriter::open_for_append(&path, WriterOptions::default()).unwrap();
    let mut map = writer.existing_map(&ifd).unwrap();
    let replaced = Region::new(16, 16, 16, 16);
    map.update_region(replaced.x, replaced.y, replaced.width, replaced.height, &vec![250u8; 256]).unwrap();
    std::assert_eq!(writer.complete(&mut map).unwrap(), ifd_offset);
    writer.close().unwrap();

    reader.reset().unwrap();
    std::assert_eq!(reader.number_of_images().unwrap(), 1);
    let read = reader.map_of_image(0).unwrap();
    std::assert_eq!(read.ifd().compression_code(), compression::DEFLATE as u64);
    std::assert_eq!(read.read_region(16, 16, 16, 16).unwrap().data, vec![250u8; 256]);
    let untouched = Region::new(0, 0, 32, 16);
    std::assert_eq!(read.read_region(0, 0, 32, 16).unwrap().data, crop(&original[0], 32, 1, untouched));
}

#[test]
fn test_concurrent_region_reads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.tif");
    let images = write_gray_file(&path, WriterOptions::default(), &[(96, 80, compression::ZSTD as u64)]);
    let pixels = &images[0];

    let reader = TiffReader::open(&path).unwrap();
    let map = reader.map_of_image(0).unwrap();
    let regions = [
        Region::new(0, 0, 96, 80),
        Region::new(5, 7, 40, 33),
        Region::new(50, 20, 46, 60),
        Region::new(15, 60, 17, 20),
    ];
    std::thread::scope(|scope| {
        for (i, region) in regions.iter().enumerate() {
            let map = &map;
            scope.spawn(move || {
                for round in 0..20 {
                    let region = if round % 2 == 0 { *region } else { regions[(i + 1) % regions.len()] };
                    let data = map.read_region(region.x, region.y, region.width, region.height).unwrap().data;
                    std::assert_eq!(data, crop(pixels, 96, 1, region));
                }
            });
        }
    });
}

#[test]
fn test_compact_drops_orphaned_data() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wasteful.tif");

    // tiles flushed for an image that never completes
    let writer = TiffWriter::create(&path, WriterOptions::default()).unwrap();
    let mut abandoned = writer.new_map(tiled_ifd(64, 64, 16, 1, 8)).unwrap();
    abandoned.update_region(0, 0, 64, 64, &pattern(64 * 64, 9)).unwrap();
    writer.write_completed_tiles(&mut abandoned).unwrap();
    let mut kept = writer.new_map(tiled_ifd(16, 16, 16, 1, 8)).unwrap();
    kept.update_region(0, 0, 16, 16, &pattern(256, 3)).unwrap();
    writer.complete(&mut kept).unwrap();
    writer.close().unwrap();
    let before = std::fs::metadata(&path).unwrap().len();

    let outcome = TiffCopier::new().with_direct_copy(true).compact(&path).unwrap();
    std::assert_eq!(outcome.images, 1);
    std::assert!(std::fs::metadata(&path).unwrap().len() < before);
    std::assert!(!dir.path().join(".wasteful.tif.compact.tmp").exists());

    let reader = TiffReader::open(&path).unwrap();
    std::assert_eq!(reader.number_of_images().unwrap(), 1);
    std::assert_eq!(reader.map_of_image(0).unwrap().read_region(0, 0, 16, 16).unwrap().data, pattern(256, 3));
}

#[test]
fn test_cancelled_compact_leaves_file_alone() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keep.tif");
    write_gray_file(&path, WriterOptions::default(), &[(32, 32, compression::NONE as u64)]);
    let original = std::fs::read(&path).unwrap();

    let outcome = TiffCopier::new().with_cancellation(|| true).compact(&path).unwrap();
    std::assert!(outcome.cancelled);
    std::assert_eq!(std::fs::read(&path).unwrap(), original);
    std::assert!(!dir.path().join(".keep.tif.compact.tmp").exists());
}

#[test]
fn test_copy_progress_and_cancellation() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("two.tif");
    write_gray_file(&source, WriterOptions::default(),
                    &[(48, 32, compression::NONE as u64), (16, 16, compression::NONE as u64)]);

    let reports = Arc::new(AtomicUsize::new(0));
    let seen = reports.clone();
    let copier = TiffCopier::new()
        .with_progress(move |info| {
            std::assert_eq!(info.image_count, 2);
            std::assert_eq!(info.tile_count, 6);
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .with_cancellation({
            let reports = reports.clone();
            move || reports.load(Ordering::SeqCst) >= 2
        });

    let reader = TiffReader::open(&source).unwrap();
    let target = dir.path().join("cut.tif");
    let writer = TiffWriter::create(&target, WriterOptions::default()).unwrap();
    let outcome = copier.copy_all(&reader, &writer).unwrap();
    writer.close().unwrap();

    std::assert!(outcome.cancelled);
    std::assert_eq!(outcome.tiles, 2);
    // the interrupted image is still completed, the second one never started
    std::assert_eq!(outcome.images, 1);
    let copy = TiffReader::open(&target).unwrap();
    std::assert_eq!(copy.number_of_images().unwrap(), 1);
}

#[test]
fn test_copy_range_checked() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("one.tif");
    write_gray_file(&source, WriterOptions::default(), &[(16, 16, compression::NONE as u64)]);

    let reader = TiffReader::open(&source).unwrap();
    let writer = TiffWriter::create(dir.path().join("out.tif"), WriterOptions::default()).unwrap();
    let err = TiffCopier::new().copy_images(&reader, &writer, 0..2).unwrap_err();
    std::assert!(matches!(err, TiffError::IndexError(_)));
}

#[test]
fn test_is_tiff() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("probe.tif");
    write_gray_file(&path, WriterOptions::default(), &[(16, 16, compression::NONE as u64)]);
    std::assert!(TiffReader::is_tiff(&path));

    let text = dir.path().join("notes.txt");
    std::fs::write(&text, "just some text that is long enough to be probed").unwrap();
    std::assert!(!TiffReader::is_tiff(&text));
    std::assert!(!TiffReader::is_tiff(dir.path().join("absent.tif")));
}
