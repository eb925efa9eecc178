//! Bit-level copying for pixel depths that are not whole bytes
//!
//! Bits are numbered from the most significant bit of each byte, which is
//! the TIFF default fill order.

/// Copies `bit_count` bits from `src` starting at bit `src_bit` into `dst`
/// starting at bit `dst_bit`
///
/// Byte-aligned runs are copied with a single slice copy.
pub fn copy_bits(src: &[u8], src_bit: u64, dst: &mut [u8], dst_bit: u64, bit_count: u64) {
    if bit_count == 0 {
        return;
    }
    if src_bit % 8 == 0 && dst_bit % 8 == 0 {
        let whole = (bit_count / 8) as usize;
        let s = (src_bit / 8) as usize;
        let d = (dst_bit / 8) as usize;
        dst[d..d + whole].copy_from_slice(&src[s..s + whole]);
        let rest = bit_count % 8;
        if rest > 0 {
            let mask = 0xFFu8 << (8 - rest);
            dst[d + whole] = (dst[d + whole] & !mask) | (src[s + whole] & mask);
        }
        return;
    }

    for i in 0..bit_count {
        let sb = src_bit + i;
        let db = dst_bit + i;
        let bit = (src[(sb / 8) as usize] >> (7 - sb % 8)) & 1;
        let byte = &mut dst[(db / 8) as usize];
        let shift = 7 - db % 8;
        *byte = (*byte & !(1 << shift)) | (bit << shift);
    }
}

/// Bytes needed for one packed row of `width` pixels
pub fn row_bytes(width: u64, bits_per_pixel: u64) -> u64 {
    (width * bits_per_pixel + 7) / 8
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn test_unaligned_copy() {
        let src = [0b1011_0000u8];
        let mut dst = [0u8; 1];
        copy_bits(&src, 0, &mut dst, 3, 4);
        std::assert_eq!(dst[0], 0b0001_0110);
    }

    #[test]
    fn test_aligned_copy_keeps_trailing_bits() {
        let src = [0xAB, 0xFF];
        let mut dst = [0x00, 0x0F];
        copy_bits(&src, 0, &mut dst, 0, 12);
        std::assert_eq!(dst, [0xAB, 0xFF]);

        let mut dst = [0x00, 0x00];
        copy_bits(&src, 0, &mut dst, 0, 12);
        std::assert_eq!(dst, [0xAB, 0xF0]);
    }

    #[test]
    fn test_row_bytes() {
        std::assert_eq!(row_bytes(10, 1), 2);
        std::assert_eq!(row_bytes(10, 24), 30);
    }
}
