//! TIFF file writer implementation
//!
//! A `TiffWriter` builds a TIFF or BigTIFF file image by image and tile by
//! tile. Tile data is always appended at the (even) end of the file and
//! never moved afterwards, so flushed tiles stay readable at their recorded
//! offsets even if the process stops before the image is completed.
//!
//! File protocol:
//! 1. `create` writes the header with a zero first-IFD offset.
//! 2. `write_forward` optionally writes and links a placeholder IFD.
//! 3. `write_tile` appends encoded tiles.
//! 4. `complete` writes the remaining tiles, then rewrites the IFD in
//!    place or appends it, and links it into the chain.
//!
//! `existing_map` edits an image already in the file: replaced tiles are
//! appended at the end and the IFD is rewritten with their new positions.

use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::compression::known::KnownCompression;
use crate::compression::options::CodecOptions;
use crate::io::byte_order::ByteOrder;
use crate::io::seekable::SeekableStream;
use crate::tiff::constants::{compression, field_types, photometric, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::validation;
use crate::tiles::grid::TileGrid;
use crate::tiles::index::TileIndex;
use crate::tiles::tile::WriteState;
use crate::tiles::write_map::{ForwardIfd, WriteMap};
use crate::utils::diagnostics::{emit, Diagnostic, DiagnosticsHandler};
use crate::utils::format_utils;
use crate::utils::ifd_utils;
use crate::utils::write_utils;

/// Writer configuration
#[derive(Clone, Default)]
pub struct WriterOptions {
    pub big_tiff: bool,
    pub byte_order: ByteOrder,
    /// Byte used for pixels never written
    pub filler: u8,
    /// Leave never-written tiles out of the file (offset and count 0)
    pub missing_tiles_allowed: bool,
    /// Quality hint in [0, 1] mapped to a codec level
    pub compression_quality: Option<f64>,
    pub diagnostics: Option<DiagnosticsHandler>,
}

impl fmt::Debug for WriterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterOptions")
            .field("big_tiff", &self.big_tiff)
            .field("byte_order", &self.byte_order)
            .field("filler", &self.filler)
            .field("missing_tiles_allowed", &self.missing_tiles_allowed)
            .field("compression_quality", &self.compression_quality)
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}

impl WriterOptions {
    pub fn with_big_tiff(mut self, big_tiff: bool) -> Self {
        self.big_tiff = big_tiff;
        self
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_filler(mut self, filler: u8) -> Self {
        self.filler = filler;
        self
    }

    pub fn with_missing_tiles_allowed(mut self, allowed: bool) -> Self {
        self.missing_tiles_allowed = allowed;
        self
    }

    pub fn with_compression_quality(mut self, quality: f64) -> Self {
        self.compression_quality = Some(quality);
        self
    }

    pub fn with_diagnostics(mut self, handler: DiagnosticsHandler) -> Self {
        self.diagnostics = Some(handler);
        self
    }
}

struct WriterInner {
    stream: Option<Box<dyn SeekableStream>>,
    created: bool,
    /// Field to patch with the offset of the next completed IFD
    last_ifd_offset_position: u64,
}

impl WriterInner {
    fn stream(&mut self) -> TiffResult<&mut Box<dyn SeekableStream>> {
        if !self.created {
            return Err(TiffError::InvalidState("Writer header was not created".to_string()));
        }
        self.stream.as_mut().ok_or_else(|| TiffError::InvalidState("Writer is closed".to_string()))
    }
}

/// Writer for TIFF and BigTIFF files
pub struct TiffWriter {
    options: WriterOptions,
    inner: Mutex<WriterInner>,
    path: Option<PathBuf>,
}

fn read_u64_at(stream: &mut dyn SeekableStream, position: u64, byte_order: ByteOrder, big: bool) -> TiffResult<u64> {
    stream.seek(SeekFrom::Start(position))?;
    let mut buf = vec![0u8; ifd_utils::offset_size(big) as usize];
    stream.read_exact(&mut buf).map_err(|e| TiffError::io_at("read IFD link", position, e))?;
    let handler = byte_order.create_handler();
    let mut cursor = std::io::Cursor::new(buf);
    ifd_utils::read_offset(&mut cursor, big, handler.as_ref())
}

fn read_bytes_at(stream: &mut dyn SeekableStream, position: u64, length: usize) -> TiffResult<Vec<u8>> {
    stream.seek(SeekFrom::Start(position))?;
    let mut buf = vec![0u8; length];
    stream.read_exact(&mut buf).map_err(|e| TiffError::io_at("read", position, e))?;
    Ok(buf)
}

/// Position of the next-IFD field of the IFD at `offset`
fn link_position_of(stream: &mut dyn SeekableStream, offset: u64, byte_order: ByteOrder, big: bool) -> TiffResult<u64> {
    let count_size = if big { 8 } else { 2 };
    let mut cursor = std::io::Cursor::new(read_bytes_at(stream, offset, count_size)?);
    let handler = byte_order.create_handler();
    let relative = ifd_utils::next_offset_position(&mut cursor, 0, big, handler.as_ref())?;
    Ok(offset + relative)
}

/// Finds the field of the main chain that points at the IFD at `target`
fn find_link_to(stream: &mut dyn SeekableStream, target: u64, byte_order: ByteOrder, big: bool) -> TiffResult<u64> {
    let length = stream.seek(SeekFrom::End(0))?;
    let mut position = write_utils::first_offset_position(big);
    let mut visited = HashSet::new();
    loop {
        let offset = read_u64_at(stream, position, byte_order, big)?;
        if offset == target {
            return Ok(position);
        }
        if offset == 0 || offset >= length || !visited.insert(offset) {
            return Err(TiffError::FormatError(format!(
                "IFD at {} is not in the main chain of the file", target)));
        }
        position = link_position_of(stream, offset, byte_order, big)?;
    }
}

fn write_offset_at(stream: &mut dyn SeekableStream, position: u64, value: u64, byte_order: ByteOrder, big: bool) -> TiffResult<()> {
    let handler = byte_order.create_handler();
    let mut buf = Vec::with_capacity(8);
    write_utils::write_offset(&mut buf, handler.as_ref(), value, big)?;
    stream.seek(SeekFrom::Start(position))?;
    stream.write_all(&buf).map_err(|e| TiffError::io_at("write IFD link", position, e))?;
    Ok(())
}

impl TiffWriter {
    /// Wraps a stream; call `write_header` before writing images
    pub fn new<S: SeekableStream + 'static>(stream: S, options: WriterOptions) -> Self {
        TiffWriter {
            options,
            inner: Mutex::new(WriterInner {
                stream: Some(Box::new(stream)),
                created: false,
                last_ifd_offset_position: 0,
            }),
            path: None,
        }
    }

    /// Creates (or truncates) a file and writes its header
    pub fn create<P: AsRef<Path>>(path: P, options: WriterOptions) -> TiffResult<Self> {
        let path = path.as_ref();
        info!("Creating TIFF file: {}", path.display());
        let file = OpenOptions::new().read(true).write(true).create(true).truncate(true).open(path)?;
        let mut writer = Self::new(file, options);
        writer.path = Some(path.to_path_buf());
        writer.write_header()?;
        Ok(writer)
    }

    /// Opens an existing TIFF to append images after its last IFD
    ///
    /// The byte order and format of the file override the options.
    pub fn open_for_append<P: AsRef<Path>>(path: P, options: WriterOptions) -> TiffResult<Self> {
        let path = path.as_ref();
        info!("Opening TIFF file for appending: {}", path.display());
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let length = ifd_utils::ensure_minimal_length(&mut file)?;
        let header = format_utils::read_header(&mut file)?;

        let handler = header.byte_order.create_handler();
        let mut link_position = write_utils::first_offset_position(header.is_big_tiff);
        let mut offset = header.first_ifd_offset;
        let mut visited = std::collections::HashSet::new();
        while offset != 0 {
            validation::validate_ifd_offset(offset, header.size(), length)?;
            if !visited.insert(offset) {
                return Err(TiffError::FormatError(format!("IFD chain loops back to offset {}", offset)));
            }
            link_position = ifd_utils::next_offset_position(&mut file, offset, header.is_big_tiff, handler.as_ref())?;
            file.seek(SeekFrom::Start(link_position))?;
            offset = ifd_utils::read_offset(&mut file, header.is_big_tiff, handler.as_ref())?;
        }
        debug!("Appending after {} existing IFD(s), link at {}", visited.len(), link_position);

        let options = WriterOptions {
            big_tiff: header.is_big_tiff,
            byte_order: header.byte_order,
            ..options
        };
        Ok(TiffWriter {
            options,
            inner: Mutex::new(WriterInner {
                stream: Some(Box::new(file) as Box<dyn SeekableStream>),
                created: true,
                last_ifd_offset_position: link_position,
            }),
            path: Some(path.to_path_buf()),
        })
    }

    /// Writes the header of a new file; the stream should be empty
    pub fn write_header(&self) -> TiffResult<()> {
        let mut inner = self.lock();
        if inner.created {
            return Err(TiffError::InvalidState("Header was already written".to_string()));
        }
        let header = write_utils::encode_header(self.options.byte_order, self.options.big_tiff, 0)?;
        let stream = inner.stream.as_mut().ok_or_else(|| TiffError::InvalidState("Writer is closed".to_string()))?;
        stream.seek(SeekFrom::Start(0))?;
        stream.write_all(&header)?;
        inner.created = true;
        inner.last_ifd_offset_position = write_utils::first_offset_position(self.options.big_tiff);
        debug!("Wrote {} header ({})",
               if self.options.big_tiff { "BigTIFF" } else { "TIFF" }, self.options.byte_order.name());
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, WriterInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.options.byte_order
    }

    pub fn is_big_tiff(&self) -> bool {
        self.options.big_tiff
    }

    /// Returns a map for changing tiles of an image already in the file
    ///
    /// `ifd` must have been read from this file, usually through a reader
    /// of the same path. Tiles not touched keep their stored data. Replaced
    /// tiles are appended at the end of the file; the space they used before
    /// is not reclaimed. Tiles filled only partially are padded with filler
    /// on `complete`, so load the old pixels first when they matter.
    pub fn existing_map(&self, ifd: &IFD) -> TiffResult<WriteMap> {
        if ifd.offset == 0 {
            return Err(TiffError::InvalidState("IFD was not read from a file".to_string()));
        }
        if ifd.byte_order() != self.options.byte_order || ifd.is_big_tiff() != self.options.big_tiff {
            return Err(TiffError::FormatError(format!(
                "IFD at {} does not match the {} {} format of the writer", ifd.offset,
                self.options.byte_order.name(), if self.options.big_tiff { "BigTIFF" } else { "TIFF" })));
        }
        let grid = TileGrid::from_ifd(ifd)?;
        let count = grid.tile_count() as usize;
        let offsets = ifd.tile_offsets()?;
        let byte_counts = ifd.tile_byte_counts()?;
        if offsets.len() < count || byte_counts.len() < count {
            return Err(TiffError::FormatError(format!(
                "IFD at {} lists {} offset(s) and {} byte count(s) for {} tile(s)",
                ifd.offset, offsets.len(), byte_counts.len(), count)));
        }

        let byte_order = self.options.byte_order;
        let big = self.options.big_tiff;
        let mut inner = self.lock();
        let stream = inner.stream()?;
        let link_position = find_link_to(&mut **stream, ifd.offset, byte_order, big)?;
        let next_offset_position = link_position_of(&mut **stream, ifd.offset, byte_order, big)?;

        // in place only when the stored IFD occupies exactly what we would write
        let mut current = ifd.renumbered(ifd.number);
        current.next_ifd_offset = read_u64_at(&mut **stream, next_offset_position, byte_order, big)?;
        let serialized = ifd_utils::serialize_ifd(&current, ifd.offset, byte_order, big)?;
        let stored = read_bytes_at(&mut **stream, ifd.offset, serialized.bytes.len()).ok();
        let size = if stored.as_deref() == Some(serialized.bytes.as_slice()) {
            serialized.bytes.len() as u64
        } else {
            0
        };
        stream.seek(SeekFrom::End(0))?;
        drop(inner);

        let mut edited = ifd.clone();
        let array_type = if big { field_types::LONG8 } else { field_types::LONG };
        let (offsets_tag, counts_tag) = edited.data_tags();
        edited.put_ints(offsets_tag, array_type, offsets[..count].to_vec());
        edited.put_ints(counts_tag, array_type, byte_counts[..count].to_vec());
        let grid = TileGrid::from_ifd(&edited)?;

        let mut map = WriteMap::new(edited, grid, self.options.filler);
        map.offsets.copy_from_slice(&offsets[..count]);
        map.byte_counts.copy_from_slice(&byte_counts[..count]);
        map.forward = Some(ForwardIfd {
            offset: ifd.offset,
            size,
            next_offset_position,
            link_position,
        });
        debug!("Editing image with IFD at {}: {} tile(s), {}", ifd.offset, count,
               if size > 0 { "rewritable in place" } else { "IFD will be relocated" });
        Ok(map)
    }

    /// Validates `ifd`, fills defaults and returns a map for building its image
    ///
    /// Tile sizes must be multiples of 16. Offsets and byte counts are
    /// replaced by zero placeholders sized for the whole grid.
    pub fn new_map(&self, mut ifd: IFD) -> TiffResult<WriteMap> {
        ifd.set_format(self.options.byte_order, self.options.big_tiff);
        ifd.offset = 0;
        ifd.next_ifd_offset = 0;

        if !ifd.has_tag(tags::SAMPLES_PER_PIXEL) {
            ifd.set_samples_per_pixel(1);
        }
        if !ifd.has_tag(tags::BITS_PER_SAMPLE) {
            ifd.set_bits_per_sample(8)?;
        }
        if !ifd.has_tag(tags::COMPRESSION) {
            ifd.set_compression(compression::NONE as u64);
        }
        if !ifd.has_tag(tags::PHOTOMETRIC_INTERPRETATION) {
            let code = if ifd.samples_per_pixel()? >= 3 { photometric::RGB } else { photometric::BLACK_IS_ZERO };
            ifd.set_photometric(code);
        }
        if !ifd.has_tag(tags::PLANAR_CONFIGURATION) {
            ifd.set_planar_separated(false);
        }

        if ifd.is_tiled() {
            validation::validate_tile_size(ifd.tile_size_x()?, ifd.tile_size_y()?)?;
        } else {
            let rows = ifd.tile_size_y()?;
            ifd.set_rows_per_strip(rows);
        }

        let grid = TileGrid::from_ifd(&ifd)?;
        let count = grid.tile_count() as usize;
        let array_type = if self.options.big_tiff { field_types::LONG8 } else { field_types::LONG };
        let (offsets_tag, counts_tag) = ifd.data_tags();
        ifd.put_ints(offsets_tag, array_type, vec![0; count]);
        ifd.put_ints(counts_tag, array_type, vec![0; count]);

        debug!("New write map: {}x{} image, {} tile(s) of {}x{}",
               grid.dim_x, grid.dim_y, count, grid.tile_size_x, grid.tile_size_y);
        Ok(WriteMap::new(ifd, grid, self.options.filler))
    }

    /// Writes a placeholder IFD for `map` and links it into the chain
    ///
    /// Readers see the image right away, with missing tiles, until
    /// `complete` replaces the placeholder arrays.
    pub fn write_forward(&self, map: &mut WriteMap) -> TiffResult<u64> {
        if let Some(forward) = map.forward {
            return Ok(forward.offset);
        }
        if map.is_completed() {
            return Err(TiffError::InvalidState("Image is already complete".to_string()));
        }
        let byte_order = self.options.byte_order;
        let big = self.options.big_tiff;

        let mut inner = self.lock();
        let link_position = inner.last_ifd_offset_position;
        let stream = inner.stream()?;
        let offset = write_utils::seek_to_even_end(stream)?;
        write_utils::check_offset(offset, big)?;
        map.ifd_mut().next_ifd_offset = 0;
        let serialized = ifd_utils::serialize_ifd(map.ifd(), offset, byte_order, big)?;
        stream.write_all(&serialized.bytes).map_err(|e| TiffError::io_at("write IFD", offset, e))?;
        write_offset_at(&mut **stream, link_position, offset, byte_order, big)?;
        stream.seek(SeekFrom::End(0))?;
        inner.last_ifd_offset_position = serialized.next_offset_position;

        map.forward = Some(ForwardIfd {
            offset,
            size: serialized.bytes.len() as u64,
            next_offset_position: serialized.next_offset_position,
            link_position,
        });
        emit(&self.options.diagnostics, Diagnostic::IfdWritten { offset, in_place: false });
        debug!("Forward IFD written at {}", offset);
        Ok(offset)
    }

    fn codec_options(&self, grid: &TileGrid, ifd: &IFD, index: &TileIndex) -> CodecOptions {
        let (width, height) = grid.tile_buffer_size(index);
        let mut options = CodecOptions::for_tile(grid, width, height);
        options.predictor = ifd.predictor();
        options.photometric = ifd.photometric();
        options.quality = self.options.compression_quality;
        options
    }

    /// Appends encoded bytes at the even end of the file
    fn append(&self, data: &[u8]) -> TiffResult<u64> {
        let mut inner = self.lock();
        let stream = inner.stream()?;
        let offset = write_utils::seek_to_even_end(stream)?;
        let end = offset + data.len() as u64;
        write_utils::check_offset(end, self.options.big_tiff)?;
        stream.write_all(data).map_err(|e| TiffError::io_at("write tile", offset, e))?;
        Ok(offset)
    }

    /// Encodes and appends one complete tile
    ///
    /// Fails for tiles not completely filled; those are padded and written
    /// by `complete`.
    pub fn write_tile(&self, map: &mut WriteMap, index: TileIndex) -> TiffResult<()> {
        match map.tile(&index).map(|tile| tile.write_state()) {
            Some(WriteState::Complete) => self.flush_tile(map, index),
            Some(state) => Err(TiffError::InvalidState(format!(
                "Tile {} is {} and cannot be written yet", index, state))),
            None => Err(TiffError::InvalidState(format!("Tile {} has no data to write", index))),
        }
    }

    /// Encodes and appends a tile, with filler in the gaps of partial ones
    fn flush_tile(&self, map: &mut WriteMap, index: TileIndex) -> TiffResult<()> {
        let linear = map.grid().linear_index(&index);
        let options = self.codec_options(map.grid(), map.ifd(), &index);
        let compression_code = map.ifd().compression_code();
        let filler = map.filler();

        let tile = map.tile_mut(&index).ok_or_else(|| TiffError::InvalidState(format!(
            "Tile {} has no data to write", index)))?;
        tile.check_writable()?;

        let encoded = match tile.take_encoded() {
            Some(encoded) => encoded,
            None => {
                let decoded = tile.decoded_mut(filler)?;
                KnownCompression::from_code(compression_code)?.encode(decoded, &options)?
            },
        };

        let offset = self.append(&encoded)?;
        let byte_count = encoded.len() as u64;
        tile.mark_written(offset, byte_count);
        map.offsets[linear] = offset;
        map.byte_counts[linear] = byte_count;
        emit(&self.options.diagnostics, Diagnostic::TileWritten { index, offset, byte_count });
        Ok(())
    }

    /// Flushes every complete tile not yet written
    ///
    /// # Returns
    /// Number of tiles written
    pub fn write_completed_tiles(&self, map: &mut WriteMap) -> TiffResult<usize> {
        let completed = map.completed_tiles();
        for index in &completed {
            self.write_tile(map, *index)?;
        }
        Ok(completed.len())
    }

    /// Writes one shared filler tile per buffer size for never-written slots
    fn write_filler_tiles(&self, map: &mut WriteMap) -> TiffResult<()> {
        let missing: Vec<usize> = (0..map.offsets.len())
            .filter(|i| map.offsets[*i] == 0)
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        if self.options.missing_tiles_allowed {
            debug!("Leaving {} tile(s) missing", missing.len());
            return Ok(());
        }

        let kind = KnownCompression::from_code(map.ifd().compression_code())?;
        let mut shared: HashMap<(u32, u32), (u64, u64)> = HashMap::new();
        for linear in missing {
            let index = map.grid().index_at(linear)?;
            let size = map.grid().tile_buffer_size(&index);
            let stored = match shared.get(&size) {
                Some(stored) => *stored,
                None => {
                    let options = self.codec_options(map.grid(), map.ifd(), &index);
                    let data = vec![map.filler(); map.grid().tile_buffer_bytes(&index)];
                    let encoded = kind.encode(&data, &options)?;
                    let offset = self.append(&encoded)?;
                    emit(&self.options.diagnostics, Diagnostic::TileWritten {
                        index, offset, byte_count: encoded.len() as u64 });
                    let stored = (offset, encoded.len() as u64);
                    shared.insert(size, stored);
                    stored
                },
            };
            map.offsets[linear] = stored.0;
            map.byte_counts[linear] = stored.1;
        }
        debug!("Wrote {} shared filler tile(s)", shared.len());
        Ok(())
    }

    /// Finishes the image of `map`
    ///
    /// Remaining tiles are written, the IFD gets its final offsets and byte
    /// counts and is linked into the chain.
    ///
    /// # Returns
    /// Offset of the final IFD
    pub fn complete(&self, map: &mut WriteMap) -> TiffResult<u64> {
        if map.is_completed() {
            return Err(TiffError::InvalidState("Image is already complete".to_string()));
        }
        for index in map.unwritten_tiles() {
            self.flush_tile(map, index)?;
        }
        self.write_filler_tiles(map)?;

        let array_type = if self.options.big_tiff { field_types::LONG8 } else { field_types::LONG };
        let (offsets_tag, counts_tag) = map.ifd().data_tags();
        let offsets = map.offsets.clone();
        let byte_counts = map.byte_counts.clone();
        map.ifd_mut().put_ints(offsets_tag, array_type, offsets);
        map.ifd_mut().put_ints(counts_tag, array_type, byte_counts);

        let byte_order = self.options.byte_order;
        let big = self.options.big_tiff;
        let mut inner = self.lock();
        let last_position = inner.last_ifd_offset_position;
        let stream = inner.stream()?;

        let (offset, in_place, next_offset_position) = match map.forward {
            Some(forward) => {
                // keep whatever the forward IFD was linked to since
                let next = read_u64_at(&mut **stream, forward.next_offset_position, byte_order, big)?;
                map.ifd_mut().next_ifd_offset = next;
                let serialized = ifd_utils::serialize_ifd(map.ifd(), forward.offset, byte_order, big)?;
                if serialized.bytes.len() as u64 == forward.size {
                    stream.seek(SeekFrom::Start(forward.offset))?;
                    stream.write_all(&serialized.bytes)
                        .map_err(|e| TiffError::io_at("rewrite IFD", forward.offset, e))?;
                    (forward.offset, true, serialized.next_offset_position)
                } else {
                    let offset = write_utils::seek_to_even_end(stream)?;
                    let serialized = ifd_utils::serialize_ifd(map.ifd(), offset, byte_order, big)?;
                    stream.write_all(&serialized.bytes).map_err(|e| TiffError::io_at("write IFD", offset, e))?;
                    write_offset_at(&mut **stream, forward.link_position, offset, byte_order, big)?;
                    (offset, false, serialized.next_offset_position)
                }
            },
            None => {
                map.ifd_mut().next_ifd_offset = 0;
                let offset = write_utils::seek_to_even_end(stream)?;
                let serialized = ifd_utils::serialize_ifd(map.ifd(), offset, byte_order, big)?;
                stream.write_all(&serialized.bytes).map_err(|e| TiffError::io_at("write IFD", offset, e))?;
                write_offset_at(&mut **stream, last_position, offset, byte_order, big)?;
                (offset, false, serialized.next_offset_position)
            },
        };

        let moved_last = map.forward.map_or(true, |forward| forward.next_offset_position == last_position);
        if moved_last {
            inner.last_ifd_offset_position = next_offset_position;
        }
        let stream = inner.stream()?;
        stream.seek(SeekFrom::End(0))?;
        stream.flush()?;
        drop(inner);

        map.ifd_mut().offset = offset;
        map.completed_at = Some(offset);
        let tiles = map.offsets.len();
        emit(&self.options.diagnostics, Diagnostic::IfdWritten { offset, in_place });
        emit(&self.options.diagnostics, Diagnostic::ImageCompleted { ifd_offset: offset, tiles });
        info!("Completed image: IFD at {}, {} tile slot(s)", offset, tiles);
        Ok(offset)
    }

    /// Whether the stream was closed
    pub fn is_closed(&self) -> bool {
        self.lock().stream.is_none()
    }

    /// Flushes and releases the stream; later calls do nothing
    pub fn close(&self) -> TiffResult<()> {
        let stream = self.lock().stream.take();
        if let Some(mut stream) = stream {
            stream.flush()?;
            debug!("Writer closed");
        }
        Ok(())
    }
}

impl Drop for TiffWriter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
