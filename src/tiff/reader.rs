//! TIFF file reader implementation
//!
//! A `TiffReader` is one reading session over a byte stream. It validates
//! the header, walks the IFD chain, parses IFDs on demand and caches them
//! by offset, and resolves tile requests for the maps it creates.
//!
//! The reader is `Sync`: every seek+read pair runs under one lock, so maps
//! of the same reader can be read from several threads.

use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::io::byte_order::ByteOrder;
use crate::io::seekable::{stream_length, SeekableReader};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::validation;
use crate::tiles::cache::TileCache;
use crate::tiles::read_map::ReadMap;
use crate::utils::diagnostics::{emit, Diagnostic, DiagnosticsHandler};
use crate::utils::format_utils::{self, TiffHeader};
use crate::utils::ifd_utils;

/// What to do when the stream is not a valid TIFF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Opening fails with the header error
    ValidTiff,
    /// Opening succeeds; `is_valid` and `opening_error` report the problem
    AllowInvalid,
}

/// How a broken IFD chain is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainMode {
    /// A bad link or a cycle is a format error
    Strict,
    /// A bad link or a cycle ends the chain
    Lenient,
}

/// Reader configuration
#[derive(Clone)]
pub struct ReaderOptions {
    pub open_mode: OpenMode,
    pub chain_mode: ChainMode,
    /// Byte used for pixels without data
    pub filler: u8,
    /// Clip region requests to the image instead of failing
    pub crop_to_image: bool,
    /// Accept tiles with zero offset or byte count
    pub missing_tiles_allowed: bool,
    /// Keep parsed IFDs by offset
    pub caching_ifds: bool,
    pub tile_cache: Arc<TileCache>,
    pub diagnostics: Option<DiagnosticsHandler>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            open_mode: OpenMode::ValidTiff,
            chain_mode: ChainMode::Strict,
            filler: 0,
            crop_to_image: true,
            missing_tiles_allowed: true,
            caching_ifds: true,
            tile_cache: Arc::new(TileCache::default()),
            diagnostics: None,
        }
    }
}

impl fmt::Debug for ReaderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderOptions")
            .field("open_mode", &self.open_mode)
            .field("chain_mode", &self.chain_mode)
            .field("filler", &self.filler)
            .field("crop_to_image", &self.crop_to_image)
            .field("missing_tiles_allowed", &self.missing_tiles_allowed)
            .field("caching_ifds", &self.caching_ifds)
            .field("tile_cache_bytes", &self.tile_cache.max_bytes())
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}

impl ReaderOptions {
    pub fn with_open_mode(mut self, open_mode: OpenMode) -> Self {
        self.open_mode = open_mode;
        self
    }

    pub fn with_chain_mode(mut self, chain_mode: ChainMode) -> Self {
        self.chain_mode = chain_mode;
        self
    }

    pub fn with_filler(mut self, filler: u8) -> Self {
        self.filler = filler;
        self
    }

    pub fn with_crop_to_image(mut self, crop_to_image: bool) -> Self {
        self.crop_to_image = crop_to_image;
        self
    }

    pub fn with_missing_tiles_allowed(mut self, allowed: bool) -> Self {
        self.missing_tiles_allowed = allowed;
        self
    }

    pub fn with_caching_ifds(mut self, caching: bool) -> Self {
        self.caching_ifds = caching;
        self
    }

    pub fn with_tile_cache(mut self, cache: Arc<TileCache>) -> Self {
        self.tile_cache = cache;
        self
    }

    pub fn with_diagnostics(mut self, handler: DiagnosticsHandler) -> Self {
        self.diagnostics = Some(handler);
        self
    }
}

/// Reader for TIFF and BigTIFF files
pub struct TiffReader {
    options: ReaderOptions,
    stream: Mutex<Option<Box<dyn SeekableReader>>>,
    header: Option<TiffHeader>,
    opening_error: Option<TiffError>,
    file_length: AtomicU64,
    path: Option<PathBuf>,
    ifd_cache: Mutex<HashMap<u64, Arc<IFD>>>,
    ifd_offsets: Mutex<Option<Vec<u64>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Reads the header of a stream and checks its minimal length
fn probe_stream(stream: &mut dyn SeekableReader) -> TiffResult<(TiffHeader, u64)> {
    let length = ifd_utils::ensure_minimal_length(stream)?;
    let header = format_utils::read_header(stream)?;
    Ok((header, length))
}

impl TiffReader {
    /// Opens a file with default options
    pub fn open<P: AsRef<Path>>(path: P) -> TiffResult<Self> {
        Self::open_with_options(path, ReaderOptions::default())
    }

    /// Opens a file
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ReaderOptions) -> TiffResult<Self> {
        let path = path.as_ref();
        info!("Opening TIFF file: {}", path.display());
        let file = File::open(path)?;
        let mut reader = Self::new(BufReader::with_capacity(1024 * 1024, file), options)?;
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }

    /// Starts a session over any seekable stream
    pub fn new<R: SeekableReader + 'static>(stream: R, options: ReaderOptions) -> TiffResult<Self> {
        let mut stream: Box<dyn SeekableReader> = Box::new(stream);
        let (header, file_length, opening_error) = match probe_stream(stream.as_mut()) {
            Ok((header, length)) => (Some(header), length, None),
            Err(e) => {
                if options.open_mode == OpenMode::ValidTiff {
                    return Err(e);
                }
                warn!("Stream is not a valid TIFF: {}", e);
                let length = stream_length(stream.as_mut()).unwrap_or(0);
                (None, length, Some(e))
            },
        };

        if let Some(header) = &header {
            debug!("Opened {} {} stream of {} bytes",
                   if header.is_big_tiff { "BigTIFF" } else { "TIFF" },
                   header.byte_order.name(), file_length);
        }

        Ok(TiffReader {
            options,
            stream: Mutex::new(Some(stream)),
            header,
            opening_error,
            file_length: AtomicU64::new(file_length),
            path: None,
            ifd_cache: Mutex::new(HashMap::new()),
            ifd_offsets: Mutex::new(None),
        })
    }

    /// Classifies a stream without failing
    ///
    /// # Returns
    /// The header for a TIFF or BigTIFF stream, None for anything else
    pub fn probe(stream: &mut dyn SeekableReader) -> Option<TiffHeader> {
        probe_stream(stream).ok().map(|(header, _)| header)
    }

    /// Whether the file at `path` looks like a TIFF, without failing
    pub fn is_tiff<P: AsRef<Path>>(path: P) -> bool {
        match File::open(path) {
            Ok(mut file) => Self::probe(&mut file).is_some(),
            Err(_) => false,
        }
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether the stream has a valid TIFF header
    pub fn is_valid(&self) -> bool {
        self.header.is_some()
    }

    /// Why the stream is not a valid TIFF, if it is not
    pub fn opening_error(&self) -> Option<&TiffError> {
        self.opening_error.as_ref()
    }

    /// The header, or the opening error as a format error
    pub fn header(&self) -> TiffResult<TiffHeader> {
        self.header.ok_or_else(|| match &self.opening_error {
            Some(e) => TiffError::FormatError(format!("Not a valid TIFF: {}", e)),
            None => TiffError::InvalidHeader,
        })
    }

    pub fn byte_order(&self) -> TiffResult<ByteOrder> {
        Ok(self.header()?.byte_order)
    }

    pub fn is_big_tiff(&self) -> TiffResult<bool> {
        Ok(self.header()?.is_big_tiff)
    }

    /// Stream length measured at open or at the last `reset`
    pub fn file_length(&self) -> u64 {
        self.file_length.load(Ordering::Acquire)
    }

    pub(crate) fn diagnostics(&self) -> &Option<DiagnosticsHandler> {
        &self.options.diagnostics
    }

    /// Runs `f` with exclusive access to the stream
    pub(crate) fn with_stream<T>(&self, f: impl FnOnce(&mut dyn SeekableReader) -> TiffResult<T>) -> TiffResult<T> {
        let mut guard = lock(&self.stream);
        match guard.as_mut() {
            Some(stream) => f(stream.as_mut()),
            None => Err(TiffError::InvalidState("Reader is closed".to_string())),
        }
    }

    /// Reads `length` bytes at `offset` as one atomic step
    pub fn read_bytes_at(&self, offset: u64, length: u64) -> TiffResult<Vec<u8>> {
        let file_length = self.file_length();
        if offset.checked_add(length).map_or(true, |end| end > file_length) {
            return Err(TiffError::FormatError(format!(
                "{} bytes at offset {} lie outside the file ({} bytes)", length, offset, file_length)));
        }
        self.with_stream(|stream| {
            stream.seek(SeekFrom::Start(offset)).map_err(|e| TiffError::io_at("seek", offset, e))?;
            let mut data = vec![0u8; length as usize];
            stream.read_exact(&mut data).map_err(|e| TiffError::io_at("read", offset, e))?;
            Ok(data)
        })
    }

    /// Offset of the first IFD stored in the header
    pub fn read_first_ifd_offset(&self) -> TiffResult<u64> {
        let header = self.header()?;
        if header.first_ifd_offset != 0 {
            validation::validate_ifd_offset(header.first_ifd_offset, header.size(), self.file_length())?;
        }
        Ok(header.first_ifd_offset)
    }

    /// Reads the link stored after the IFD at `ifd_offset`
    ///
    /// Fails when the IFD itself cannot be located; the link value is not
    /// checked here.
    fn read_next_offset(&self, ifd_offset: u64) -> TiffResult<u64> {
        let header = self.header()?;
        let next = self.with_stream(|stream| {
            let handler = header.byte_order.create_handler();
            let position = ifd_utils::next_offset_position(stream, ifd_offset, header.is_big_tiff, handler.as_ref())?;
            if position + ifd_utils::offset_size(header.is_big_tiff) > self.file_length() {
                return Err(TiffError::FormatError(format!(
                    "IFD at {} extends past the end of the file", ifd_offset)));
            }
            stream.seek(SeekFrom::Start(position)).map_err(|e| TiffError::io_at("seek", position, e))?;
            ifd_utils::read_offset(stream, header.is_big_tiff, handler.as_ref())
        })?;
        Ok(next)
    }

    /// Walks the IFD chain, stopping after `limit` offsets
    fn walk_chain(&self, limit: Option<usize>) -> TiffResult<Vec<u64>> {
        let header = self.header()?;
        let strict = self.options.chain_mode == ChainMode::Strict;
        let file_length = self.file_length();
        let mut offsets = Vec::new();
        let mut visited = HashSet::new();
        let mut offset = match self.read_first_ifd_offset() {
            Ok(offset) => offset,
            Err(e) if strict => return Err(e),
            Err(e) => {
                warn!("Ignoring invalid first IFD offset: {}", e);
                return Ok(offsets);
            },
        };

        while offset != 0 {
            if limit.map_or(false, |limit| offsets.len() >= limit) {
                break;
            }
            if offset < header.size() || offset >= file_length {
                let e = TiffError::FormatError(format!("IFD offset {} is outside the file", offset));
                if strict {
                    return Err(e);
                }
                warn!("{}; ending IFD chain", e);
                break;
            }
            if !visited.insert(offset) {
                let e = TiffError::FormatError(format!("IFD chain loops back to offset {}", offset));
                if strict {
                    return Err(e);
                }
                warn!("{}; ending IFD chain", e);
                break;
            }

            match self.read_next_offset(offset) {
                Ok(next) => {
                    offsets.push(offset);
                    offset = next;
                },
                Err(e) if strict => return Err(e),
                Err(e) => {
                    warn!("Broken IFD at offset {}: {}; ending IFD chain", offset, e);
                    break;
                },
            }
        }
        Ok(offsets)
    }

    /// Offsets of all IFDs in chain order
    pub fn read_ifd_offsets(&self) -> TiffResult<Vec<u64>> {
        if let Some(offsets) = lock(&self.ifd_offsets).as_ref() {
            return Ok(offsets.clone());
        }
        let offsets = self.walk_chain(None)?;
        debug!("Found {} IFD(s)", offsets.len());
        *lock(&self.ifd_offsets) = Some(offsets.clone());
        Ok(offsets)
    }

    /// Offset of IFD number `index`
    pub fn read_single_ifd_offset(&self, index: usize) -> TiffResult<u64> {
        let offsets = match lock(&self.ifd_offsets).as_ref() {
            Some(offsets) => offsets.clone(),
            None => self.walk_chain(Some(index + 1))?,
        };
        offsets.get(index).copied().ok_or_else(|| TiffError::IndexError(format!(
            "Image index {} out of range 0..{}", index, offsets.len())))
    }

    /// Number of images in the main chain
    pub fn number_of_images(&self) -> TiffResult<usize> {
        Ok(self.read_ifd_offsets()?.len())
    }

    /// Parses, or returns the cached, IFD at `offset`
    pub fn read_ifd_at(&self, offset: u64) -> TiffResult<Arc<IFD>> {
        if self.options.caching_ifds {
            if let Some(ifd) = lock(&self.ifd_cache).get(&offset) {
                return Ok(ifd.clone());
            }
        }

        let header = self.header()?;
        let file_length = self.file_length();
        validation::validate_ifd_offset(offset, header.size(), file_length)?;
        let number = lock(&self.ifd_offsets).as_ref()
            .and_then(|offsets| offsets.iter().position(|o| *o == offset))
            .unwrap_or(0);

        let ifd = self.with_stream(|stream| {
            ifd_utils::read_ifd(stream, offset, number, header.byte_order, header.is_big_tiff, file_length)
        })?;
        emit(self.diagnostics(), Diagnostic::IfdRead { offset, entries: ifd.entry_count() });

        let ifd = Arc::new(ifd);
        if self.options.caching_ifds {
            // another thread may have parsed the same IFD meanwhile
            let cached = lock(&self.ifd_cache).entry(offset).or_insert(ifd).clone();
            return Ok(cached);
        }
        Ok(ifd)
    }

    /// IFD number `index`
    pub fn read_ifd(&self, index: usize) -> TiffResult<Arc<IFD>> {
        let offsets = self.read_ifd_offsets()?;
        let offset = offsets.get(index).copied().ok_or_else(|| TiffError::IndexError(format!(
            "Image index {} out of range 0..{}", index, offsets.len())))?;
        let ifd = self.read_ifd_at(offset)?;
        if ifd.number != index {
            // parsed before the chain was known; same identity, so cached tiles stay valid
            let numbered = Arc::new(ifd.renumbered(index));
            if self.options.caching_ifds {
                lock(&self.ifd_cache).insert(offset, numbered.clone());
            }
            return Ok(numbered);
        }
        Ok(ifd)
    }

    /// All IFDs of the main chain
    pub fn all_ifds(&self) -> TiffResult<Vec<Arc<IFD>>> {
        let offsets = self.read_ifd_offsets()?;
        offsets.iter().map(|offset| self.read_ifd_at(*offset)).collect()
    }

    /// IFDs referenced by the SubIFDs tag of `ifd`
    pub fn sub_ifds(&self, ifd: &IFD) -> TiffResult<Vec<Arc<IFD>>> {
        let mut result = Vec::new();
        for offset in ifd.sub_ifd_offsets() {
            let sub = self.read_ifd_at(offset)?;
            if sub.sub_ifd_of() == Some(ifd.offset) {
                result.push(sub);
            } else {
                let mut sub = (*sub).clone();
                sub.set_sub_ifd_of(Some(ifd.offset));
                result.push(Arc::new(sub));
            }
        }
        Ok(result)
    }

    /// Drops cached IFDs, the chain and their cached tiles, and measures
    /// the stream again so data appended since opening becomes reachable
    pub fn reset(&self) -> TiffResult<()> {
        {
            let mut cache = lock(&self.ifd_cache);
            for ifd in cache.values() {
                self.options.tile_cache.remove_ifd(ifd.id());
            }
            cache.clear();
        }
        *lock(&self.ifd_offsets) = None;
        let length = self.with_stream(|stream| Ok(stream_length(stream)?))?;
        self.file_length.store(length, Ordering::Release);
        debug!("Reader caches reset, stream is {} bytes", length);
        Ok(())
    }

    /// Creates a map over `ifd` for reading pixels
    pub fn map(&self, ifd: Arc<IFD>) -> TiffResult<ReadMap<'_>> {
        ReadMap::new(self, ifd)
    }

    /// Creates a map over image number `index`
    pub fn map_of_image(&self, index: usize) -> TiffResult<ReadMap<'_>> {
        let ifd = self.read_ifd(index)?;
        self.map(ifd)
    }

    /// Whether the stream was closed
    pub fn is_closed(&self) -> bool {
        lock(&self.stream).is_none()
    }

    /// Releases the stream; later calls do nothing
    pub fn close(&self) {
        if lock(&self.stream).take().is_some() {
            debug!("Reader closed");
        }
    }
}

impl fmt::Debug for TiffReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiffReader")
            .field("path", &self.path)
            .field("header", &self.header)
            .field("file_length", &self.file_length())
            .finish()
    }
}
