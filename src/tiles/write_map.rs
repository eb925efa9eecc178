//! Building an image through a tile map
//!
//! A `WriteMap` owns the IFD of an image under construction and the tiles
//! filled so far. Filling is pure memory work; the `TiffWriter` that made
//! the map flushes tiles and finalizes the IFD.

use std::collections::BTreeMap;

use log::{debug, trace};

use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiles::grid::{copy_block, BlockCopy, TileGrid};
use crate::tiles::index::TileIndex;
use crate::tiles::read_map::Samples;
use crate::tiles::region::Region;
use crate::tiles::tile::{Tile, WriteState};

/// Where a forward-written IFD lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ForwardIfd {
    pub offset: u64,
    pub size: u64,
    pub next_offset_position: u64,
    /// Field whose value points at this IFD
    pub link_position: u64,
}

/// Map of one image being written
#[derive(Debug)]
pub struct WriteMap {
    ifd: IFD,
    grid: TileGrid,
    filler: u8,
    tiles: BTreeMap<TileIndex, Tile>,
    pub(crate) offsets: Vec<u64>,
    pub(crate) byte_counts: Vec<u64>,
    pub(crate) forward: Option<ForwardIfd>,
    pub(crate) completed_at: Option<u64>,
}

impl WriteMap {
    pub(crate) fn new(ifd: IFD, grid: TileGrid, filler: u8) -> Self {
        let count = grid.tile_count() as usize;
        WriteMap {
            ifd,
            grid,
            filler,
            tiles: BTreeMap::new(),
            offsets: vec![0; count],
            byte_counts: vec![0; count],
            forward: None,
            completed_at: None,
        }
    }

    /// IFD of the image; the offset arrays are final only after completion
    pub fn ifd(&self) -> &IFD {
        &self.ifd
    }

    pub(crate) fn ifd_mut(&mut self) -> &mut IFD {
        &mut self.ifd
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn filler(&self) -> u8 {
        self.filler
    }

    /// Offset of the finished IFD once the image is complete
    pub fn completed_ifd_offset(&self) -> Option<u64> {
        self.completed_at
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn index_of(&self, plane: u16, x: u32, y: u32) -> TiffResult<TileIndex> {
        self.grid.index_of(plane, x, y)
    }

    /// Tiles overlapping `region`, clipped to the image
    pub fn tiles_in_region(&self, region: &Region) -> Vec<TileIndex> {
        match region.intersection(&self.grid.image_region()) {
            Some(clipped) => self.grid.tiles_in_region(&clipped),
            None => Vec::new(),
        }
    }

    pub fn tile(&self, index: &TileIndex) -> Option<&Tile> {
        self.tiles.get(index)
    }

    /// Tiles created so far, in linear order
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub(crate) fn tile_mut(&mut self, index: &TileIndex) -> Option<&mut Tile> {
        self.tiles.get_mut(index)
    }

    /// Offset and byte count of the data stored for `index`, if any
    ///
    /// Covers tiles flushed through this map and, for maps of existing
    /// images, tiles already in the file.
    pub fn stored_tile(&self, index: &TileIndex) -> Option<(u64, u64)> {
        let linear = self.grid.linear_index(index);
        match (self.offsets.get(linear), self.byte_counts.get(linear)) {
            (Some(&offset), Some(&count)) if offset != 0 => Some((offset, count)),
            _ => None,
        }
    }

    /// Indices of tiles ready to be flushed
    pub fn completed_tiles(&self) -> Vec<TileIndex> {
        self.tiles.values()
            .filter(|tile| tile.write_state() == WriteState::Complete)
            .map(|tile| tile.index())
            .collect()
    }

    /// Indices of filled tiles not yet written, complete or partial
    pub(crate) fn unwritten_tiles(&self) -> Vec<TileIndex> {
        self.tiles.values()
            .filter(|tile| matches!(tile.write_state(), WriteState::Complete | WriteState::PartiallyFilled))
            .map(|tile| tile.index())
            .collect()
    }

    fn check_open(&self) -> TiffResult<()> {
        if self.completed_at.is_some() {
            return Err(TiffError::InvalidState("Image is already complete".to_string()));
        }
        Ok(())
    }

    fn tile_entry(&mut self, index: TileIndex) -> &mut Tile {
        let grid = &self.grid;
        self.tiles.entry(index).or_insert_with(|| {
            let (width, height) = grid.tile_buffer_size(&index);
            Tile::new(index, grid.tile_region(&index), (width, height), grid.row_bytes(width))
        })
    }

    /// Copies a region of pixels into the tiles it covers
    ///
    /// `data` uses the on-disk sample layout for a `width`×`height` block.
    /// Parts outside the image are ignored. Fails without changing anything
    /// when a covered tile was already written to the file.
    ///
    /// # Returns
    /// The covered tiles that are now complete
    pub fn update_region(&mut self, x: u32, y: u32, width: u32, height: u32, data: &[u8]) -> TiffResult<Vec<TileIndex>> {
        self.check_open()?;
        let requested = Region::new(x, y, width, height);
        let src_plane_size = self.grid.plane_bytes(width, height) as usize;
        let src_stride = self.grid.row_bytes(width);
        let needed = src_plane_size * self.grid.planes as usize;
        if data.len() < needed {
            return Err(TiffError::IndexError(format!(
                "Buffer of {} bytes is too small for region {} ({} bytes)", data.len(), requested, needed)));
        }

        let clipped = match requested.intersection(&self.grid.image_region()) {
            Some(clipped) => clipped,
            None => return Ok(Vec::new()),
        };
        let indices = self.grid.tiles_in_region(&clipped);
        for index in &indices {
            if let Some(tile) = self.tiles.get(index) {
                tile.check_writable()?;
            }
        }

        let filler = self.filler;
        let bits_per_pixel = self.grid.bits_per_pixel();
        let mut completed = Vec::new();
        for index in indices {
            let bounds = self.grid.tile_bounds(&index);
            let overlap = match self.grid.tile_region(&index).intersection(&clipped) {
                Some(overlap) => overlap,
                None => continue,
            };
            let plane_start = index.plane as usize * src_plane_size;
            let tile = self.tile_entry(index);
            let tile_stride = tile.row_bytes();
            let buffer = tile.decoded_mut(filler)?;
            copy_block(
                &data[plane_start..plane_start + src_plane_size],
                src_stride,
                ((overlap.x - x) as u64, (overlap.y - y) as u64),
                buffer,
                tile_stride,
                ((overlap.x - bounds.x) as u64, (overlap.y - bounds.y) as u64),
                BlockCopy {
                    width: overlap.width as u64,
                    height: overlap.height as u64,
                    bits_per_pixel,
                },
            );
            tile.mark_filled(&overlap);
            if tile.is_completed() {
                completed.push(index);
            }
        }

        trace!("Updated region {}: {} tile(s) complete", clipped, completed.len());
        Ok(completed)
    }

    /// Copies samples read from another map at the same position
    pub fn update_samples(&mut self, samples: &Samples) -> TiffResult<Vec<TileIndex>> {
        let r = samples.region;
        self.update_region(r.x, r.y, r.width, r.height, &samples.data)
    }

    /// Installs already encoded bytes for one tile
    ///
    /// Used for direct copies: the bytes must be encoded with this map's
    /// compression and byte order.
    pub fn put_encoded_tile(&mut self, index: TileIndex, data: Vec<u8>) -> TiffResult<()> {
        self.check_open()?;
        self.grid.index_of(index.plane, index.x, index.y)?;
        if index.ifd_id != self.grid.ifd_id {
            return Err(TiffError::IndexError(format!("Tile {} belongs to another image", index)));
        }
        debug!("Installing {} encoded bytes for tile {}", data.len(), index);
        self.tile_entry(index).fill_encoded(data)
    }
}
