//! Tests for horizontal differencing

extern crate std;

use crate::compression::{predictor, CodecOptions, KnownCompression};
use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::predictor::HORIZONTAL_DIFFERENCING;
use crate::tiff::errors::TiffError;

fn options(width: u32, samples: u16, bits: u16, byte_order: ByteOrder) -> CodecOptions {
    CodecOptions {
        width,
        height: 2,
        bits_per_sample: bits,
        samples_per_pixel: samples,
        photometric: None,
        byte_order,
        predictor: HORIZONTAL_DIFFERENCING,
        quality: None,
        level: None,
        expected_len: (width as usize * samples as usize * bits as usize / 8) * 2,
    }
}

#[test]
fn test_apply_8_bit() {
    let opts = options(4, 1, 8, ByteOrder::LittleEndian);
    let mut data = vec![10, 12, 15, 15, 1, 0, 255, 0];
    predictor::apply(&mut data, &opts).unwrap();
    std::assert_eq!(data, vec![10, 2, 3, 0, 1, 255, 255, 1]);
    predictor::undo(&mut data, &opts).unwrap();
    std::assert_eq!(data, vec![10, 12, 15, 15, 1, 0, 255, 0]);
}

#[test]
fn test_rgb_differences_per_channel() {
    let opts = options(2, 3, 8, ByteOrder::LittleEndian);
    let mut data = vec![10, 20, 30, 11, 22, 33, 0, 0, 0, 1, 1, 1];
    predictor::apply(&mut data, &opts).unwrap();
    std::assert_eq!(&data[..6], &[10, 20, 30, 1, 2, 3]);
}

#[test]
fn test_16_bit_respects_byte_order() {
    let big = options(2, 1, 16, ByteOrder::BigEndian);
    // 0x0100 then 0x0102
    let mut data = vec![0x01, 0x00, 0x01, 0x02, 0, 0, 0, 0];
    predictor::apply(&mut data, &big).unwrap();
    std::assert_eq!(&data[..4], &[0x01, 0x00, 0x00, 0x02]);

    let little = options(2, 1, 16, ByteOrder::LittleEndian);
    let mut data = vec![0x00, 0x01, 0x02, 0x01, 0, 0, 0, 0];
    predictor::apply(&mut data, &little).unwrap();
    std::assert_eq!(&data[..4], &[0x00, 0x01, 0x02, 0x00]);
}

#[test]
fn test_predictor_with_deflate() {
    let opts = options(32, 1, 16, ByteOrder::BigEndian);
    let data: Vec<u8> = (0..128u32).flat_map(|i| ((i * 300) as u16).to_be_bytes()).collect();
    let encoded = KnownCompression::Deflate.encode(&data, &opts).unwrap();
    std::assert_eq!(KnownCompression::Deflate.decode(&encoded, &opts).unwrap(), data);
}

#[test]
fn test_unsupported_predictors() {
    let mut opts = options(4, 1, 12, ByteOrder::LittleEndian);
    std::assert!(matches!(predictor::apply(&mut [0u8; 12], &opts), Err(TiffError::UnsupportedFormat(_))));
    opts.bits_per_sample = 32;
    opts.predictor = 3;
    std::assert!(matches!(predictor::undo(&mut [0u8; 32], &opts), Err(TiffError::UnsupportedFormat(_))));
}
