//! Tests for the byte order module

extern crate std;

use std::io::Cursor;
use byteorder::{LittleEndian, BigEndian, WriteBytesExt};
use crate::io::byte_order::{ByteOrder, ByteOrderHandler, LittleEndianHandler, BigEndianHandler};

#[test]
fn test_byte_order_detection() {
    let mut cursor = Cursor::new(b"II".to_vec());
    std::assert_eq!(ByteOrder::detect(&mut cursor).unwrap(), ByteOrder::LittleEndian);

    let mut cursor = Cursor::new(b"MM".to_vec());
    std::assert_eq!(ByteOrder::detect(&mut cursor).unwrap(), ByteOrder::BigEndian);
}

#[test]
fn test_byte_order_detection_invalid() {
    let mut buffer = Vec::new();
    buffer.write_u16::<LittleEndian>(0x1234).unwrap();
    let mut cursor = Cursor::new(buffer);

    std::assert!(ByteOrder::detect(&mut cursor).is_err());
}

#[test]
fn test_marker_matches_detection() {
    for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
        let mut cursor = Cursor::new(order.marker().to_vec());
        std::assert_eq!(ByteOrder::detect(&mut cursor).unwrap(), order);
        std::assert_eq!(order.create_handler().byte_order(), order);
    }
}

#[test]
fn test_little_endian_handler() {
    let mut buffer = Vec::new();
    buffer.write_u16::<LittleEndian>(0x1234).unwrap();
    buffer.write_u32::<LittleEndian>(0x12345678).unwrap();
    buffer.write_u64::<LittleEndian>(0x1234567890ABCDEF).unwrap();
    let mut cursor = Cursor::new(buffer);

    let handler = LittleEndianHandler;

    std::assert_eq!(handler.read_u16(&mut cursor).unwrap(), 0x1234);
    std::assert_eq!(handler.read_u32(&mut cursor).unwrap(), 0x12345678);
    std::assert_eq!(handler.read_u64(&mut cursor).unwrap(), 0x1234567890ABCDEF);
}

#[test]
fn test_big_endian_handler() {
    let mut buffer = Vec::new();
    buffer.write_u16::<BigEndian>(0x1234).unwrap();
    buffer.write_u32::<BigEndian>(0x12345678).unwrap();
    buffer.write_u64::<BigEndian>(0x1234567890ABCDEF).unwrap();
    let mut cursor = Cursor::new(buffer);

    let handler = BigEndianHandler;

    std::assert_eq!(handler.read_u16(&mut cursor).unwrap(), 0x1234);
    std::assert_eq!(handler.read_u32(&mut cursor).unwrap(), 0x12345678);
    std::assert_eq!(handler.read_u64(&mut cursor).unwrap(), 0x1234567890ABCDEF);
}

#[test]
fn test_handlers_write_in_their_order() {
    let mut little = Vec::new();
    LittleEndianHandler.write_u32(&mut little, 0x01020304).unwrap();
    std::assert_eq!(little, vec![4, 3, 2, 1]);

    let mut big = Vec::new();
    BigEndianHandler.write_u32(&mut big, 0x01020304).unwrap();
    std::assert_eq!(big, vec![1, 2, 3, 4]);

    let mut cursor = Cursor::new(big);
    std::assert_eq!(BigEndianHandler.read_rational(&mut Cursor::new(vec![0, 0, 0, 1, 0, 0, 0, 2])).unwrap(), (1, 2));
    std::assert_eq!(BigEndianHandler.read_u32(&mut cursor).unwrap(), 0x01020304);
}
