use crate::tiff::ifd::IFD;

/// IFD of an uncompressed image with the given geometry
///
/// `tile` is `Some((w, h))` for a tiled image, `None` for strips of
/// `rows_per_strip` rows.
pub fn image_ifd(width: u32, height: u32, tile: Option<(u32, u32)>, samples: u16, bits: u16) -> IFD {
    let mut ifd = IFD::new(0, 0);
    ifd.set_image_dimensions(width, height);
    ifd.set_samples_per_pixel(samples);
    ifd.set_bits_per_sample(bits).unwrap();
    if let Some((tile_width, tile_height)) = tile {
        ifd.set_tile_sizes(tile_width, tile_height);
    }
    ifd
}
