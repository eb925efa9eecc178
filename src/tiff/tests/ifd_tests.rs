//! Tests for IFD accessors and the IFD wire format

extern crate std;

use std::io::Cursor;

use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::{field_types, tags};
use crate::tiff::errors::TiffError;
use crate::tiff::ifd::{BitDepthSupport, TagValue, IFD};
use crate::utils::ifd_utils;

fn read_back(ifd: &IFD, byte_order: ByteOrder, big: bool) -> IFD {
    let offset = 16;
    let serialized = ifd_utils::serialize_ifd(ifd, offset, byte_order, big).unwrap();
    let mut bytes = vec![0u8; offset as usize];
    bytes.extend_from_slice(&serialized.bytes);
    let length = bytes.len() as u64;
    let mut cursor = Cursor::new(bytes);
    ifd_utils::read_ifd(&mut cursor, offset, 3, byte_order, big, length).unwrap()
}

fn sample_ifd() -> IFD {
    let mut ifd = IFD::new(0, 0);
    ifd.set_image_dimensions(70_000, 300);
    ifd.set_tile_sizes(256, 256);
    ifd.set_samples_per_pixel(3);
    ifd.set_bits_per_sample(16).unwrap();
    ifd.put_string(tags::IMAGE_DESCRIPTION, "tile map test");
    ifd.put(tags::X_RESOLUTION, field_types::RATIONAL, TagValue::Rational(vec![(72, 1)]));
    ifd.put_ints(tags::TILE_OFFSETS, field_types::LONG, vec![100, 200, 300]);
    ifd
}

#[test]
fn test_classic_and_big_round_trip() {
    for (byte_order, big) in [(ByteOrder::LittleEndian, false), (ByteOrder::BigEndian, false),
                              (ByteOrder::LittleEndian, true), (ByteOrder::BigEndian, true)] {
        let ifd = sample_ifd();
        let read = read_back(&ifd, byte_order, big);

        std::assert_eq!(read.number, 3);
        std::assert_eq!(read.offset, 16);
        std::assert_eq!(read.byte_order(), byte_order);
        std::assert_eq!(read.is_big_tiff(), big);
        std::assert_eq!(read.entry_count(), ifd.entry_count());
        std::assert_eq!(read.image_width().unwrap(), 70_000);
        std::assert_eq!(read.bits_per_sample().unwrap(), vec![16, 16, 16]);
        std::assert_eq!(read.get_string(tags::IMAGE_DESCRIPTION), Some("tile map test"));
        std::assert_eq!(read.get_value(tags::X_RESOLUTION), Some(&TagValue::Rational(vec![(72, 1)])));
        std::assert_eq!(read.get_tag_values(tags::TILE_OFFSETS), Some(vec![100, 200, 300]));
    }
}

#[test]
fn test_entries_serialized_in_tag_order() {
    let mut ifd = IFD::new(0, 0);
    ifd.put_int(tags::TILE_LENGTH, 16);
    ifd.put_int(tags::IMAGE_WIDTH, 16);
    ifd.put_int(tags::COMPRESSION, 1);
    let serialized = ifd_utils::serialize_ifd(&ifd, 8, ByteOrder::LittleEndian, false).unwrap();
    let bytes = &serialized.bytes;

    let tag_at = |i: usize| u16::from_le_bytes([bytes[2 + i * 12], bytes[3 + i * 12]]);
    std::assert_eq!((tag_at(0), tag_at(1), tag_at(2)),
                    (tags::IMAGE_WIDTH, tags::COMPRESSION, tags::TILE_LENGTH));
    std::assert_eq!(serialized.next_offset_position, 8 + 2 + 3 * 12);
}

#[test]
fn test_out_of_line_values_start_even() {
    let mut ifd = IFD::new(0, 0);
    ifd.put_string(tags::SOFTWARE, "odd");   // 4 bytes, inline
    ifd.put_string(tags::IMAGE_DESCRIPTION, "seven!"); // 7 bytes, padded
    ifd.put_ints(tags::TILE_OFFSETS, field_types::LONG, vec![1, 2]);
    let serialized = ifd_utils::serialize_ifd(&ifd, 8, ByteOrder::LittleEndian, false).unwrap();

    // entries block, 8 padded description bytes, then the offsets
    std::assert_eq!(serialized.bytes.len(), (2 + 3 * 12 + 4) + 8 + 8);
    let read = read_back(&ifd, ByteOrder::LittleEndian, false);
    std::assert_eq!(read.get_string(tags::SOFTWARE), Some("odd"));
    std::assert_eq!(read.get_string(tags::IMAGE_DESCRIPTION), Some("seven!"));
}

#[test]
fn test_long8_narrows_for_classic() {
    let mut ifd = IFD::new(0, 0);
    ifd.put_ints(tags::TILE_OFFSETS, field_types::LONG8, vec![10, 20]);
    let read = read_back(&ifd, ByteOrder::LittleEndian, false);
    std::assert_eq!(read.get_entry(tags::TILE_OFFSETS).unwrap().field_type, field_types::LONG);
    std::assert_eq!(read.get_tag_values(tags::TILE_OFFSETS), Some(vec![10, 20]));
}

#[test]
fn test_value_outside_file_rejected() {
    let ifd = sample_ifd();
    let serialized = ifd_utils::serialize_ifd(&ifd, 8, ByteOrder::LittleEndian, false).unwrap();
    let mut bytes = vec![0u8; 8];
    // keep the entries, drop the out-of-line values
    let entries = ifd_utils::entries_block_size(ifd.entry_count() as u64, false) as usize;
    bytes.extend_from_slice(&serialized.bytes[..entries]);
    let length = bytes.len() as u64;

    let result = ifd_utils::read_ifd(&mut Cursor::new(bytes), 8, 0, ByteOrder::LittleEndian, false, length);
    std::assert!(matches!(result, Err(TiffError::FormatError(_))));
}

#[test]
fn test_clone_gets_new_identity() {
    let ifd = sample_ifd();
    let copy = ifd.clone();
    std::assert_ne!(ifd.id(), copy.id());
    std::assert_eq!(copy.image_width().unwrap(), 70_000);
}

#[test]
fn test_renumbered_keeps_identity() {
    let ifd = sample_ifd();
    let numbered = ifd.renumbered(3);
    std::assert_eq!(numbered.id(), ifd.id());
    std::assert_eq!(numbered.number, 3);
}

#[test]
fn test_too_many_entries_for_classic() {
    let mut ifd = IFD::new(0, 0);
    for tag in 0..=u16::MAX {
        ifd.put_int(tag, 1);
    }
    std::assert_eq!(ifd.entry_count(), 65536);
    let classic = ifd_utils::serialize_ifd(&ifd, 8, ByteOrder::LittleEndian, false);
    std::assert!(matches!(classic, Err(TiffError::FormatError(_))));
    std::assert!(ifd_utils::serialize_ifd(&ifd, 16, ByteOrder::LittleEndian, true).is_ok());
}

#[test]
fn test_defaults() {
    let mut ifd = IFD::new(0, 0);
    ifd.set_image_dimensions(10, 20);
    std::assert!(!ifd.is_tiled());
    std::assert_eq!(ifd.samples_per_pixel().unwrap(), 1);
    std::assert_eq!(ifd.bits_per_sample().unwrap(), vec![1]);
    std::assert_eq!(ifd.compression_code(), 1);
    std::assert_eq!(ifd.tile_size_x().unwrap(), 10);
    std::assert_eq!(ifd.tile_size_y().unwrap(), 20);
    std::assert_eq!(ifd.data_tags(), (tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS));

    ifd.set_rows_per_strip(50);
    std::assert_eq!(ifd.tile_size_y().unwrap(), 20);
    ifd.set_rows_per_strip(0);
    std::assert!(ifd.tile_size_y().is_err());
}

#[test]
fn test_missing_dimensions() {
    let ifd = IFD::new(0, 0);
    std::assert!(matches!(ifd.image_width(), Err(TiffError::MissingDimensions)));
}

#[test]
fn test_bit_depth_support() {
    std::assert_eq!(BitDepthSupport::classify(&[8, 8, 8]), BitDepthSupport::Direct { bits: 8 });
    std::assert_eq!(BitDepthSupport::classify(&[1]), BitDepthSupport::Direct { bits: 1 });
    std::assert_eq!(BitDepthSupport::classify(&[12]), BitDepthSupport::NeedsUnpacking { bits: 12 });
    std::assert_eq!(BitDepthSupport::classify(&[5, 6, 5]), BitDepthSupport::NonUniform(vec![5, 6, 5]));

    let mut ifd = IFD::new(0, 0);
    ifd.set_samples_per_pixel(3);
    ifd.put_ints(tags::BITS_PER_SAMPLE, field_types::SHORT, vec![5, 6, 5]);
    std::assert!(matches!(ifd.uniform_bits_per_sample(), Err(TiffError::UnsupportedBitDepth(bits)) if bits == vec![5, 6, 5]));
}

#[test]
fn test_planar_configuration() {
    let mut ifd = IFD::new(0, 0);
    ifd.set_samples_per_pixel(4);
    std::assert_eq!(ifd.number_of_separated_planes().unwrap(), 1);
    ifd.set_planar_separated(true);
    std::assert_eq!(ifd.number_of_separated_planes().unwrap(), 4);
    ifd.put_int(tags::PLANAR_CONFIGURATION, 3);
    std::assert!(ifd.is_planar_separated().is_err());
}
