//! Reading pixels through a tile map
//!
//! A `ReadMap` binds one IFD to the reader session that owns its stream.
//! Tiles are fetched and decoded on demand; decoded tiles go through the
//! reader's tile cache.

use std::sync::Arc;

use log::{debug, trace, warn};

use crate::compression::known::KnownCompression;
use crate::compression::options::CodecOptions;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::tiles::grid::{copy_block, BlockCopy, TileGrid};
use crate::tiles::index::TileIndex;
use crate::tiles::region::Region;
use crate::tiles::tile::Tile;
use crate::utils::diagnostics::{emit, Diagnostic};

/// Pixels of a region in the on-disk sample layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Samples {
    /// Region actually covered, after clipping
    pub region: Region,
    /// Row-packed sample bytes; separated planes follow one another
    pub data: Vec<u8>,
}

/// Map of one image being read
pub struct ReadMap<'r> {
    reader: &'r TiffReader,
    ifd: Arc<IFD>,
    grid: TileGrid,
    offsets: Vec<u64>,
    byte_counts: Vec<u64>,
}

impl<'r> ReadMap<'r> {
    /// Creates a map; the IFD must describe a readable image
    pub fn new(reader: &'r TiffReader, ifd: Arc<IFD>) -> TiffResult<Self> {
        let grid = TileGrid::from_ifd(&ifd)?;
        let offsets = ifd.tile_offsets()?;
        let byte_counts = ifd.tile_byte_counts()?;
        let needed = grid.tile_count() as usize;
        if offsets.len() < needed || byte_counts.len() < needed {
            return Err(TiffError::FormatError(format!(
                "IFD #{} lists {} offsets and {} byte counts for {} tiles",
                ifd.number, offsets.len(), byte_counts.len(), needed)));
        }
        debug!("Read map for IFD #{}: {} tiles", ifd.number, needed);

        Ok(ReadMap { reader, ifd, grid, offsets, byte_counts })
    }

    pub fn ifd(&self) -> &Arc<IFD> {
        &self.ifd
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn reader(&self) -> &'r TiffReader {
        self.reader
    }

    pub fn index_of(&self, plane: u16, x: u32, y: u32) -> TiffResult<TileIndex> {
        self.grid.index_of(plane, x, y)
    }

    /// Tiles overlapping `region` after clipping it to the image
    pub fn tiles_in_region(&self, region: &Region) -> TiffResult<Vec<TileIndex>> {
        let region = self.grid.check_region(region, self.reader.options().crop_to_image)?;
        Ok(self.grid.tiles_in_region(&region))
    }

    fn check_index(&self, index: &TileIndex) -> TiffResult<usize> {
        if index.ifd_id != self.grid.ifd_id {
            return Err(TiffError::IndexError(format!("Tile {} belongs to another image", index)));
        }
        self.grid.index_of(index.plane, index.x, index.y)?;
        Ok(self.grid.linear_index(index))
    }

    /// File offset of a tile (0 when missing)
    pub fn tile_offset(&self, index: &TileIndex) -> TiffResult<u64> {
        Ok(self.offsets[self.check_index(index)?])
    }

    /// Stored byte count of a tile (0 when missing)
    pub fn tile_byte_count(&self, index: &TileIndex) -> TiffResult<u64> {
        Ok(self.byte_counts[self.check_index(index)?])
    }

    /// Whether the file stores no data for a tile
    pub fn is_missing(&self, index: &TileIndex) -> TiffResult<bool> {
        let linear = self.check_index(index)?;
        Ok(self.offsets[linear] == 0 || self.byte_counts[linear] == 0)
    }

    /// Compression kind of the image
    pub fn compression(&self) -> TiffResult<KnownCompression> {
        KnownCompression::from_code(self.ifd.compression_code())
    }

    /// Codec options for decoding one tile
    pub fn codec_options(&self, index: &TileIndex) -> CodecOptions {
        let (width, height) = self.grid.tile_buffer_size(index);
        let mut options = CodecOptions::for_tile(&self.grid, width, height);
        options.predictor = self.ifd.predictor();
        options.photometric = self.ifd.photometric();
        options
    }

    fn new_tile(&self, index: TileIndex) -> Tile {
        let (width, height) = self.grid.tile_buffer_size(&index);
        Tile::new(index, self.grid.tile_region(&index), (width, height), self.grid.row_bytes(width))
    }

    /// Reads the stored bytes of a tile without decoding them
    ///
    /// A tile with zero offset or byte count comes back empty when missing
    /// tiles are allowed.
    pub fn read_encoded_tile(&self, index: TileIndex) -> TiffResult<Tile> {
        let linear = self.check_index(&index)?;
        let offset = self.offsets[linear];
        let byte_count = self.byte_counts[linear];
        let mut tile = self.new_tile(index);

        if offset == 0 || byte_count == 0 {
            if !self.reader.options().missing_tiles_allowed {
                return Err(TiffError::FormatError(format!(
                    "Tile {} has no data (offset {}, byte count {})", index, offset, byte_count)));
            }
            trace!("Tile {} is missing", index);
            tile.mark_empty();
            return Ok(tile);
        }

        let data = self.reader.read_bytes_at(offset, byte_count)?;
        tile.set_stored(offset, byte_count);
        tile.set_encoded(data);
        emit(self.reader.diagnostics(), Diagnostic::TileRead { index, offset, byte_count });
        Ok(tile)
    }

    /// Decodes the encoded bytes of `tile` into its decoded buffer
    ///
    /// Strips decoding to fewer rows than expected are padded with the
    /// filler byte; short tiles are a format error. Extra bytes are cut.
    pub fn decode_tile(&self, tile: &mut Tile) -> TiffResult<()> {
        let expected = tile.decoded_len();
        let filler = self.reader.options().filler;
        if tile.is_empty() {
            tile.set_decoded(vec![filler; expected]);
            return Ok(());
        }

        let encoded = tile.encoded_data().ok_or_else(|| TiffError::InvalidState(format!(
            "Tile {} has no encoded data to decode", tile.index())))?;
        let options = self.codec_options(&tile.index());
        let mut decoded = self.compression()?.decode(encoded, &options)?;

        if decoded.len() < expected {
            if self.grid.is_tiled {
                return Err(TiffError::FormatError(format!(
                    "Tile {} decoded to {} bytes, {} expected", tile.index(), decoded.len(), expected)));
            }
            warn!("Strip {} decoded to {} of {} bytes; filling the rest", tile.index(), decoded.len(), expected);
            decoded.resize(expected, filler);
        } else if decoded.len() > expected {
            decoded.truncate(expected);
        }

        emit(self.reader.diagnostics(), Diagnostic::TileDecoded { index: tile.index(), bytes: decoded.len() });
        tile.set_decoded(decoded);
        Ok(())
    }

    /// Reads and decodes a tile, bypassing the cache
    pub fn read_tile(&self, index: TileIndex) -> TiffResult<Tile> {
        let mut tile = self.read_encoded_tile(index)?;
        self.decode_tile(&mut tile)?;
        Ok(tile)
    }

    /// Returns the decoded tile from the cache, reading it on a miss
    pub fn read_cached_tile(&self, index: TileIndex) -> TiffResult<Arc<Tile>> {
        let cache = &self.reader.options().tile_cache;
        if let Some(tile) = cache.get(&index) {
            return Ok(tile);
        }

        let mut tile = self.read_tile(index)?;
        tile.take_encoded();
        let tile = Arc::new(tile);
        for (evicted, bytes) in cache.put(tile.clone()) {
            emit(self.reader.diagnostics(), Diagnostic::TileEvicted { index: evicted, bytes });
        }
        Ok(tile)
    }

    /// Reads a region of pixels
    ///
    /// The region is clipped to the image when cropping is enabled, and
    /// rejected with an index error otherwise.
    pub fn read_region(&self, x: u32, y: u32, width: u32, height: u32) -> TiffResult<Samples> {
        let region = self.grid.check_region(&Region::new(x, y, width, height),
                                            self.reader.options().crop_to_image)?;
        let mut data = vec![self.reader.options().filler; self.grid.region_bytes(&region)?];
        self.read_region_into(&region, &mut data)?;
        Ok(Samples { region, data })
    }

    /// Reads a region that lies inside the image into `dest`
    ///
    /// `dest` must hold `grid().region_bytes(region)` bytes; pixels of
    /// missing tiles are left untouched.
    pub fn read_region_into(&self, region: &Region, dest: &mut [u8]) -> TiffResult<()> {
        let region = self.grid.check_region(region, false)?;
        let needed = self.grid.region_bytes(&region)?;
        if dest.len() < needed {
            return Err(TiffError::IndexError(format!(
                "Buffer of {} bytes is too small for region {} ({} bytes)", dest.len(), region, needed)));
        }
        if region.is_empty() {
            return Ok(());
        }

        let plane_size = self.grid.plane_bytes(region.width, region.height) as usize;
        let dst_stride = self.grid.row_bytes(region.width);
        let bits_per_pixel = self.grid.bits_per_pixel();

        for index in self.grid.tiles_in_region(&region) {
            let overlap = match self.grid.tile_region(&index).intersection(&region) {
                Some(overlap) => overlap,
                None => continue,
            };
            let tile = self.read_cached_tile(index)?;
            if tile.is_empty() {
                continue;
            }
            let src = match tile.decoded_data() {
                Some(src) => src,
                None => continue,
            };
            let bounds = self.grid.tile_bounds(&index);
            let plane_start = index.plane as usize * plane_size;
            copy_block(
                src,
                tile.row_bytes(),
                ((overlap.x - bounds.x) as u64, (overlap.y - bounds.y) as u64),
                &mut dest[plane_start..plane_start + plane_size],
                dst_stride,
                ((overlap.x - region.x) as u64, (overlap.y - region.y) as u64),
                BlockCopy {
                    width: overlap.width as u64,
                    height: overlap.height as u64,
                    bits_per_pixel,
                },
            );
        }
        Ok(())
    }
}
