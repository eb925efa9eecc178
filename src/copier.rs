//! Copying images between TIFF files
//!
//! `TiffCopier` moves images from a reader session into a writer session,
//! either by re-encoding decoded samples or, when both sides share the same
//! grid and compression, by copying encoded tile bytes as they are.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::compression::known::KnownCompression;
use crate::tiff::constants::tags;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::{ReaderOptions, TiffReader};
use crate::tiff::writer::{TiffWriter, WriterOptions};
use crate::tiles::grid::TileGrid;
use crate::tiles::index::TileIndex;
use crate::tiles::read_map::ReadMap;
use crate::tiles::region::Region;
use crate::tiles::write_map::WriteMap;
use crate::utils::byte_order_utils::swap_sample_bytes;

/// Position of a copy in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressInformation {
    pub image_index: usize,
    pub image_count: usize,
    /// Tile position within the image, counting every plane once
    pub tile_index: usize,
    pub tile_count: usize,
}

/// Hook adjusting each target IFD before its map is created
pub type IfdCorrector = Box<dyn Fn(&mut IFD) -> TiffResult<()> + Send + Sync>;
pub type ProgressCallback = Box<dyn Fn(&ProgressInformation) + Send + Sync>;
/// Polled after each tile; returning true stops the copy
pub type CancellationChecker = Box<dyn Fn() -> bool + Send + Sync>;

/// Result of a copy operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyOutcome {
    /// Images completed in the target
    pub images: usize,
    /// Tile positions processed
    pub tiles: usize,
    /// Tiles copied without re-encoding
    pub direct_tiles: usize,
    pub cancelled: bool,
}

impl CopyOutcome {
    fn add(&mut self, other: CopyOutcome) {
        self.images += other.images;
        self.tiles += other.tiles;
        self.direct_tiles += other.direct_tiles;
        self.cancelled |= other.cancelled;
    }
}

/// Copies images from a reader into a writer
#[derive(Default)]
pub struct TiffCopier {
    direct_copy: bool,
    target_compression: Option<u64>,
    corrector: Option<IfdCorrector>,
    progress: Option<ProgressCallback>,
    cancellation: Option<CancellationChecker>,
    reader_options: ReaderOptions,
}

impl TiffCopier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies encoded tiles when source and target allow it
    pub fn with_direct_copy(mut self, direct_copy: bool) -> Self {
        self.direct_copy = direct_copy;
        self
    }

    /// Compression code for re-encoded images
    pub fn with_compression(mut self, code: u64) -> Self {
        self.target_compression = Some(code);
        self
    }

    pub fn with_ifd_corrector<F>(mut self, corrector: F) -> Self
    where
        F: Fn(&mut IFD) -> TiffResult<()> + Send + Sync + 'static,
    {
        self.corrector = Some(Box::new(corrector));
        self
    }

    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(&ProgressInformation) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn with_cancellation<F>(mut self, checker: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.cancellation = Some(Box::new(checker));
        self
    }

    /// Options for readers opened by `copy_file` and `compact`
    pub fn with_reader_options(mut self, options: ReaderOptions) -> Self {
        self.reader_options = options;
        self
    }

    pub fn is_direct_copy(&self) -> bool {
        self.direct_copy
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().map_or(false, |checker| checker())
    }

    fn report(&self, info: ProgressInformation) {
        if let Some(progress) = &self.progress {
            progress(&info);
        }
    }

    /// Copies every image of `source` into a new file at `target`
    pub fn copy_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        target: Q,
        writer_options: WriterOptions,
    ) -> TiffResult<CopyOutcome> {
        let reader = TiffReader::open_with_options(source.as_ref(), self.reader_options.clone())?;
        let writer = TiffWriter::create(target.as_ref(), writer_options)?;
        let outcome = self.copy_all(&reader, &writer)?;
        writer.close()?;
        reader.close();
        Ok(outcome)
    }

    /// Copies every image of the reader
    pub fn copy_all(&self, reader: &TiffReader, writer: &TiffWriter) -> TiffResult<CopyOutcome> {
        let count = reader.number_of_images()?;
        self.copy_images(reader, writer, 0..count)
    }

    /// Copies the images whose indices fall in `range`
    pub fn copy_images(&self, reader: &TiffReader, writer: &TiffWriter, range: Range<usize>) -> TiffResult<CopyOutcome> {
        let count = reader.number_of_images()?;
        if range.start > range.end || range.end > count {
            return Err(TiffError::IndexError(format!(
                "Image range {}..{} outside the {} image(s) of the source", range.start, range.end, count)));
        }
        info!("Copying images {}..{} of {}", range.start, range.end, count);

        let mut outcome = CopyOutcome::default();
        for index in range {
            let source = reader.map_of_image(index)?;
            outcome.add(self.copy_map(&source, writer, index, count)?);
            if outcome.cancelled {
                warn!("Copy cancelled after image #{}", index);
                break;
            }
        }
        Ok(outcome)
    }

    /// Copies one whole image
    pub fn copy_image(&self, reader: &TiffReader, writer: &TiffWriter, index: usize) -> TiffResult<CopyOutcome> {
        let source = reader.map_of_image(index)?;
        self.copy_map(&source, writer, 0, 1)
    }

    /// IFD for the copy of `source`, before corrections
    fn target_ifd(&self, source: &IFD, direct: bool) -> IFD {
        let mut ifd = source.clone();
        let (offsets_tag, counts_tag) = ifd.data_tags();
        ifd.remove(offsets_tag);
        ifd.remove(counts_tag);
        // child IFDs are not copied, their offsets would dangle
        ifd.remove(tags::SUB_IFD);
        if !direct {
            if let Some(code) = self.target_compression {
                ifd.set_compression(code);
            }
        }
        ifd
    }

    fn copy_map(&self, source: &ReadMap<'_>, writer: &TiffWriter, image_index: usize, image_count: usize) -> TiffResult<CopyOutcome> {
        let mut ifd = self.target_ifd(source.ifd(), self.direct_copy);
        if let Some(corrector) = &self.corrector {
            corrector(&mut ifd)?;
        }
        let mut target = writer.new_map(ifd)?;

        let region = target.grid().image_region();
        let progress = |tile_index, tile_count| ProgressInformation {
            image_index,
            image_count,
            tile_index,
            tile_count,
        };
        let mut outcome = self.copy_region_with(source, writer, &mut target, &region, &progress)?;

        writer.complete(&mut target)?;
        outcome.images = 1;
        debug!("Copied image #{}: {} tile position(s), {} direct", image_index, outcome.tiles, outcome.direct_tiles);
        Ok(outcome)
    }

    /// Copies a rectangle of `source` into the same position of `target`
    ///
    /// Tiles fully covered by the rectangle are copied encoded when direct
    /// copying is enabled and both maps share grid, compression and sample
    /// byte layout; everything else is decoded and re-encoded. Completed
    /// tiles are flushed as they fill up.
    pub fn copy_image_region(
        &self,
        source: &ReadMap<'_>,
        writer: &TiffWriter,
        target: &mut WriteMap,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> TiffResult<CopyOutcome> {
        let progress = |tile_index, tile_count| ProgressInformation {
            image_index: 0,
            image_count: 1,
            tile_index,
            tile_count,
        };
        self.copy_region_with(source, writer, target, &Region::new(x, y, width, height), &progress)
    }

    fn copy_region_with(
        &self,
        source: &ReadMap<'_>,
        writer: &TiffWriter,
        target: &mut WriteMap,
        region: &Region,
        progress: &dyn Fn(usize, usize) -> ProgressInformation,
    ) -> TiffResult<CopyOutcome> {
        let mut outcome = CopyOutcome::default();
        let clipped = match region
            .intersection(&source.grid().image_region())
            .and_then(|r| r.intersection(&target.grid().image_region()))
        {
            Some(clipped) => clipped,
            None => return Ok(outcome),
        };

        let direct = self.direct_copy && direct_copy_possible(source, target, writer);
        if self.direct_copy && !direct {
            debug!("Direct copy not possible for IFD #{}; re-encoding", source.ifd().number);
        }
        let swap_bytes = source.grid().byte_order != target.grid().byte_order
            && source.grid().bits_per_sample > 8;
        let bytes_per_sample = source.grid().bytes_per_sample();

        // one position per tile of the first plane; planes travel together
        let positions: Vec<TileIndex> = target.tiles_in_region(&clipped)
            .into_iter()
            .filter(|index| index.plane == 0)
            .collect();
        let total = positions.len();

        for (n, position) in positions.iter().enumerate() {
            let tile_region = target.grid().tile_region(position);
            let overlap = match tile_region.intersection(&clipped) {
                Some(overlap) => overlap,
                None => continue,
            };

            if direct && overlap == tile_region {
                outcome.direct_tiles += self.copy_encoded_position(source, target, position)?;
            } else {
                let mut samples = source.read_region(overlap.x, overlap.y, overlap.width, overlap.height)?;
                if swap_bytes {
                    swap_sample_bytes(&mut samples.data, bytes_per_sample)?;
                }
                target.update_samples(&samples)?;
            }
            writer.write_completed_tiles(target)?;
            outcome.tiles += 1;

            self.report(progress(n, total));
            if self.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
        }
        Ok(outcome)
    }

    /// Copies the encoded tiles of every plane at one position
    fn copy_encoded_position(&self, source: &ReadMap<'_>, target: &mut WriteMap, position: &TileIndex) -> TiffResult<usize> {
        let mut copied = 0;
        for plane in 0..target.grid().planes {
            let from = source.index_of(plane, position.x, position.y)?;
            if source.is_missing(&from)? {
                continue;
            }
            let to = target.index_of(plane, position.x, position.y)?;
            let mut tile = source.read_encoded_tile(from)?;
            if let Some(data) = tile.take_encoded() {
                target.put_encoded_tile(to, data)?;
                copied += 1;
            }
        }
        Ok(copied)
    }

    fn compact_into(&self, path: &Path, temp: &Path) -> TiffResult<CopyOutcome> {
        let reader = TiffReader::open_with_options(path, self.reader_options.clone())?;
        let header = reader.header()?;
        let options = WriterOptions::default()
            .with_big_tiff(header.is_big_tiff)
            .with_byte_order(header.byte_order)
            .with_missing_tiles_allowed(true)
            .with_filler(self.reader_options.filler);
        let writer = TiffWriter::create(temp, options)?;
        let outcome = self.copy_all(&reader, &writer)?;
        writer.close()?;
        reader.close();
        Ok(outcome)
    }

    /// Rewrites a file through a temporary copy, dropping unreferenced data
    ///
    /// Images are copied directly where possible, keeping the format and
    /// byte order of the file. A cancelled compaction leaves the file
    /// untouched.
    pub fn compact<P: AsRef<Path>>(&self, path: P) -> TiffResult<CopyOutcome> {
        let path = path.as_ref();
        let temp = temporary_path(path);
        info!("Compacting {} through {}", path.display(), temp.display());

        let result = self.compact_into(path, &temp);
        match result {
            Ok(outcome) if !outcome.cancelled => {
                fs::rename(&temp, path)?;
                info!("Compacted {} ({} image(s))", path.display(), outcome.images);
                Ok(outcome)
            },
            Ok(outcome) => {
                let _ = fs::remove_file(&temp);
                Ok(outcome)
            },
            Err(e) => {
                let _ = fs::remove_file(&temp);
                Err(e)
            },
        }
    }
}

fn grids_match(a: &TileGrid, b: &TileGrid) -> bool {
    a.dim_x == b.dim_x
        && a.dim_y == b.dim_y
        && a.tile_size_x == b.tile_size_x
        && a.tile_size_y == b.tile_size_y
        && a.planes == b.planes
        && a.samples_per_pixel == b.samples_per_pixel
        && a.bits_per_sample == b.bits_per_sample
        && a.is_tiled == b.is_tiled
}

/// Whether encoded tiles of `source` can be stored unchanged in `target`
fn direct_copy_possible(source: &ReadMap<'_>, target: &WriteMap, writer: &TiffWriter) -> bool {
    let (from, to) = (source.grid(), target.grid());
    let code = source.ifd().compression_code();
    // codecs we cannot decode are assumed to keep multi-byte samples as stored
    let order_sensitive = KnownCompression::from_code(code)
        .map_or(from.bits_per_sample > 8, |kind| kind.byte_order_sensitive(from.bits_per_sample));
    let same_layout = from.byte_order == writer.byte_order() || !order_sensitive;
    grids_match(from, to)
        && same_layout
        && code == target.ifd().compression_code()
        && source.ifd().predictor() == target.ifd().predictor()
}

fn temporary_path(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{}.compact.tmp", name))
}
