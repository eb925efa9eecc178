//! Tiles and their lifecycle
//!
//! Read side: `Unset -> EncodedOnly -> Decoded`, derived from which
//! buffers are present. Dropping the decoded buffer returns a tile to
//! `EncodedOnly` and a later decode gives the same bytes.
//!
//! Write side: `NotFilled -> PartiallyFilled -> Complete -> WrittenToFile`.
//! Coverage is tracked as the list of rectangles not written yet.

use std::fmt;

use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiles::index::TileIndex;
use crate::tiles::region::Region;

/// Read-side state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    Unset,
    EncodedOnly,
    Decoded,
}

/// Write-side state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    NotFilled,
    PartiallyFilled,
    Complete,
    WrittenToFile,
}

impl fmt::Display for WriteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteState::NotFilled => "not filled",
            WriteState::PartiallyFilled => "partially filled",
            WriteState::Complete => "complete",
            WriteState::WrittenToFile => "written to file",
        };
        f.write_str(name)
    }
}

/// One unit of image data
#[derive(Debug, Clone)]
pub struct Tile {
    index: TileIndex,
    /// Pixels of the image covered by this tile
    region: Region,
    /// Pixel size of the decoded buffer
    buffer_size: (u32, u32),
    /// Row size of the decoded buffer in bytes
    row_bytes: u64,
    encoded: Option<Vec<u8>>,
    decoded: Option<Vec<u8>>,
    stored_offset: Option<u64>,
    stored_byte_count: Option<u64>,
    empty: bool,
    unset: Vec<Region>,
    written: bool,
}

impl Tile {
    /// Creates a tile without data
    ///
    /// # Arguments
    /// * `index` - Position of the tile
    /// * `region` - Image pixels covered by the tile, clipped to the image
    /// * `buffer_size` - Pixel size of the decoded buffer
    /// * `row_bytes` - Bytes per decoded row
    pub fn new(index: TileIndex, region: Region, buffer_size: (u32, u32), row_bytes: u64) -> Self {
        let unset = if region.is_empty() { Vec::new() } else { vec![region] };
        Tile {
            index,
            region,
            buffer_size,
            row_bytes,
            encoded: None,
            decoded: None,
            stored_offset: None,
            stored_byte_count: None,
            empty: false,
            unset,
            written: false,
        }
    }

    pub fn index(&self) -> TileIndex {
        self.index
    }

    /// Image pixels covered by this tile
    pub fn region(&self) -> Region {
        self.region
    }

    pub fn buffer_size(&self) -> (u32, u32) {
        self.buffer_size
    }

    pub fn row_bytes(&self) -> u64 {
        self.row_bytes
    }

    /// Expected length of the decoded buffer
    pub fn decoded_len(&self) -> usize {
        (self.row_bytes * self.buffer_size.1 as u64) as usize
    }

    /// True for a tile the file declares missing
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub(crate) fn mark_empty(&mut self) {
        self.empty = true;
    }

    pub fn read_state(&self) -> ReadState {
        if self.decoded.is_some() {
            ReadState::Decoded
        } else if self.encoded.is_some() || self.empty {
            ReadState::EncodedOnly
        } else {
            ReadState::Unset
        }
    }

    pub fn write_state(&self) -> WriteState {
        if self.written {
            WriteState::WrittenToFile
        } else if self.unset.is_empty() {
            WriteState::Complete
        } else if self.decoded.is_some() {
            WriteState::PartiallyFilled
        } else {
            WriteState::NotFilled
        }
    }

    pub fn is_completed(&self) -> bool {
        self.write_state() == WriteState::Complete
    }

    pub fn encoded_data(&self) -> Option<&[u8]> {
        self.encoded.as_deref()
    }

    pub fn decoded_data(&self) -> Option<&[u8]> {
        self.decoded.as_deref()
    }

    pub fn set_encoded(&mut self, data: Vec<u8>) {
        self.encoded = Some(data);
    }

    pub fn set_decoded(&mut self, data: Vec<u8>) {
        self.decoded = Some(data);
    }

    pub fn take_encoded(&mut self) -> Option<Vec<u8>> {
        self.encoded.take()
    }

    pub fn take_decoded(&mut self) -> Option<Vec<u8>> {
        self.decoded.take()
    }

    /// Drops the decoded buffer, keeping encoded bytes
    pub fn free_decoded(&mut self) {
        self.decoded = None;
    }

    /// Approximate memory held by the tile buffers
    pub fn memory_size(&self) -> usize {
        self.encoded.as_ref().map_or(0, |v| v.len()) + self.decoded.as_ref().map_or(0, |v| v.len())
    }

    pub fn stored_offset(&self) -> Option<u64> {
        self.stored_offset
    }

    pub fn stored_byte_count(&self) -> Option<u64> {
        self.stored_byte_count
    }

    /// Records where the tile data lives in the file
    pub fn set_stored(&mut self, offset: u64, byte_count: u64) {
        self.stored_offset = Some(offset);
        self.stored_byte_count = Some(byte_count);
    }

    /// Fails when the tile content is already in the file
    pub fn check_writable(&self) -> TiffResult<()> {
        if self.written {
            return Err(TiffError::InvalidState(format!(
                "Tile {} was already written to file and cannot be changed", self.index)));
        }
        Ok(())
    }

    /// Decoded buffer for writing, allocated with `filler` on first use
    pub fn decoded_mut(&mut self, filler: u8) -> TiffResult<&mut Vec<u8>> {
        self.check_writable()?;
        let len = self.decoded_len();
        Ok(self.decoded.get_or_insert_with(|| vec![filler; len]))
    }

    /// Records that the image pixels of `filled` were written
    pub fn mark_filled(&mut self, filled: &Region) {
        if self.unset.is_empty() {
            return;
        }
        let mut remaining = Vec::with_capacity(self.unset.len());
        for rect in &self.unset {
            remaining.extend(rect.subtract(filled));
        }
        self.unset = remaining;
    }

    /// Rectangles of the tile not written yet
    pub fn unset_regions(&self) -> &[Region] {
        &self.unset
    }

    /// Installs already encoded bytes as the complete tile content
    pub fn fill_encoded(&mut self, data: Vec<u8>) -> TiffResult<()> {
        self.check_writable()?;
        self.encoded = Some(data);
        self.decoded = None;
        self.unset.clear();
        Ok(())
    }

    /// Marks the tile as flushed and releases its buffers
    pub fn mark_written(&mut self, offset: u64, byte_count: u64) {
        self.set_stored(offset, byte_count);
        self.decoded = None;
        self.encoded = None;
        self.unset.clear();
        self.written = true;
    }
}
