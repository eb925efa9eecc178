//! Image File Directory (IFD) structures and methods
//!
//! An IFD is an ordered map from tag id to a typed value. Besides raw
//! access, this module derives the geometry the tile engine needs: image
//! size, tile or strip size, samples, bit depth and planar layout.
//!
//! Tile maps copy the geometry they need when they are constructed, so an
//! IFD handed to a map is never observed changing underneath it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, trace};

use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::{compression, field_types, planar_config, predictor, sample_format, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::tag_names;

static NEXT_IFD_ID: AtomicU64 = AtomicU64::new(1);

fn next_ifd_id() -> u64 {
    NEXT_IFD_ID.fetch_add(1, Ordering::Relaxed)
}

/// Typed value of one IFD entry
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// Single integer of any integral field type
    Int(u64),
    /// Several integers of any integral field type
    IntArray(Vec<u64>),
    /// RATIONAL or SRATIONAL numerator/denominator pairs
    Rational(Vec<(u32, u32)>),
    /// FLOAT or DOUBLE values
    Float(Vec<f64>),
    /// ASCII text without the trailing NUL
    Str(String),
    /// BYTE, UNDEFINED or unknown raw bytes
    Bytes(Vec<u8>),
}

impl TagValue {
    /// Number of values as counted in the IFD entry
    pub fn count(&self) -> u64 {
        match self {
            TagValue::Int(_) => 1,
            TagValue::IntArray(v) => v.len() as u64,
            TagValue::Rational(v) => v.len() as u64,
            TagValue::Float(v) => v.len() as u64,
            TagValue::Str(s) => s.len() as u64 + 1,
            TagValue::Bytes(b) => b.len() as u64,
        }
    }

    /// First integer of an integral value
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            TagValue::Int(v) => Some(*v),
            TagValue::IntArray(v) => v.first().copied(),
            TagValue::Bytes(b) => b.first().map(|v| *v as u64),
            _ => None,
        }
    }

    /// All integers of an integral value
    pub fn as_u64_vec(&self) -> Option<Vec<u64>> {
        match self {
            TagValue::Int(v) => Some(vec![*v]),
            TagValue::IntArray(v) => Some(v.clone()),
            TagValue::Bytes(b) => Some(b.iter().map(|v| *v as u64).collect()),
            _ => None,
        }
    }
}

/// Represents an entry in an Image File Directory (IFD)
#[derive(Debug, Clone, PartialEq)]
pub struct IFDEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type used on disk
    pub field_type: u16,
    /// Decoded value
    pub value: TagValue,
}

impl IFDEntry {
    /// Creates a new IFD entry
    pub fn new(tag: u16, field_type: u16, value: TagValue) -> Self {
        trace!("Creating IFD entry: tag={} ({}), type={} ({}), count={}",
               tag, tag_names::tag_name(tag), field_type,
               tag_names::field_type_name(field_type), value.count());

        Self { tag, field_type, value }
    }

    /// Number of values stored in this entry
    pub fn count(&self) -> u64 {
        self.value.count()
    }

    /// Returns a human-readable description of this entry
    pub fn description(&self) -> String {
        let value_display = match (&self.value, self.tag) {
            (TagValue::Int(v), tags::COMPRESSION) =>
                format!("{} ({})", v, tag_names::compression_name(*v)),
            (TagValue::Int(v), tags::PHOTOMETRIC_INTERPRETATION) =>
                format!("{} ({})", v, tag_names::photometric_name(*v)),
            (TagValue::Int(v), _) => v.to_string(),
            (TagValue::IntArray(v), _) if v.len() <= 8 => format!("{:?}", v),
            (TagValue::IntArray(v), _) => format!("[{} values]", v.len()),
            (TagValue::Rational(v), _) if v.len() == 1 => format!("{}/{}", v[0].0, v[0].1),
            (TagValue::Rational(v), _) => format!("[{} rationals]", v.len()),
            (TagValue::Float(v), _) if v.len() <= 8 => format!("{:?}", v),
            (TagValue::Float(v), _) => format!("[{} floats]", v.len()),
            (TagValue::Str(s), _) => format!("\"{}\"", s),
            (TagValue::Bytes(b), _) => format!("[{} bytes]", b.len()),
        };

        format!("{} ({}): {} [{}]",
                self.tag, tag_names::tag_name(self.tag), value_display,
                tag_names::field_type_name(self.field_type))
    }
}

/// How the bit depth of an image can be accessed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitDepthSupport {
    /// Every sample has this depth, which the engine reads and writes directly
    Direct { bits: u16 },
    /// Uniform depth that needs unpacking before byte-level access
    NeedsUnpacking { bits: u16 },
    /// Samples have different depths
    NonUniform(Vec<u16>),
}

impl BitDepthSupport {
    /// Classifies a BitsPerSample array
    pub fn classify(bits_per_sample: &[u16]) -> Self {
        let first = match bits_per_sample.first() {
            Some(first) => *first,
            None => return BitDepthSupport::NonUniform(Vec::new()),
        };
        if bits_per_sample.iter().any(|b| *b != first) {
            return BitDepthSupport::NonUniform(bits_per_sample.to_vec());
        }
        match first {
            1 | 8 | 16 | 24 | 32 | 64 => BitDepthSupport::Direct { bits: first },
            _ => BitDepthSupport::NeedsUnpacking { bits: first },
        }
    }

    /// True when the engine can access samples without unpacking
    pub fn is_direct(&self) -> bool {
        matches!(self, BitDepthSupport::Direct { .. })
    }
}

/// Represents an Image File Directory (IFD) in a TIFF file
pub struct IFD {
    entries: BTreeMap<u16, IFDEntry>,
    id: u64,
    /// IFD number (0-based) within the file chain
    pub number: usize,
    /// Offset this IFD was read from, 0 for a new IFD
    pub offset: u64,
    /// "Next IFD" link stored after this IFD, 0 for the last one
    pub next_ifd_offset: u64,
    byte_order: ByteOrder,
    is_big_tiff: bool,
    sub_ifd_of: Option<u64>,
}

impl Clone for IFD {
    /// Clones the entries into a new, independent IFD identity
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            id: next_ifd_id(),
            number: self.number,
            offset: self.offset,
            next_ifd_offset: self.next_ifd_offset,
            byte_order: self.byte_order,
            is_big_tiff: self.is_big_tiff,
            sub_ifd_of: self.sub_ifd_of,
        }
    }
}

impl fmt::Debug for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IFD")
            .field("id", &self.id)
            .field("number", &self.number)
            .field("offset", &self.offset)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl Default for IFD {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl IFD {
    /// Creates a new empty IFD
    pub fn new(number: usize, offset: u64) -> Self {
        debug!("Creating new IFD #{} at offset {}", number, offset);

        Self {
            entries: BTreeMap::new(),
            id: next_ifd_id(),
            number,
            offset,
            next_ifd_offset: 0,
            byte_order: ByteOrder::LittleEndian,
            is_big_tiff: false,
            sub_ifd_of: None,
        }
    }

    /// Session-unique identity of this IFD, used to key tiles
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Copy with another chain number that keeps this identity
    pub(crate) fn renumbered(&self, number: usize) -> IFD {
        IFD {
            entries: self.entries.clone(),
            id: self.id,
            number,
            offset: self.offset,
            next_ifd_offset: self.next_ifd_offset,
            byte_order: self.byte_order,
            is_big_tiff: self.is_big_tiff,
            sub_ifd_of: self.sub_ifd_of,
        }
    }

    /// Byte order of the file this IFD belongs to
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Whether this IFD uses 64-bit offsets
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    /// Sets the file format flags of this IFD
    pub fn set_format(&mut self, byte_order: ByteOrder, is_big_tiff: bool) {
        self.byte_order = byte_order;
        self.is_big_tiff = is_big_tiff;
    }

    /// Offset of the parent IFD when this IFD was reached through SubIFDs
    pub fn sub_ifd_of(&self) -> Option<u64> {
        self.sub_ifd_of
    }

    pub(crate) fn set_sub_ifd_of(&mut self, parent_offset: Option<u64>) {
        self.sub_ifd_of = parent_offset;
    }

    /// Inserts an entry, keeping the first occurrence of a duplicated tag
    ///
    /// Used while parsing: some broken files repeat a tag, and the first
    /// entry is the one other readers honour.
    pub fn add_entry(&mut self, entry: IFDEntry) {
        if self.entries.contains_key(&entry.tag) {
            debug!("Duplicate tag {} in IFD #{}, keeping the first entry", entry.tag, self.number);
            return;
        }
        trace!("Adding entry to IFD #{}: {}", self.number, entry.description());
        self.entries.insert(entry.tag, entry);
    }

    /// Inserts or replaces an entry
    pub fn put(&mut self, tag: u16, field_type: u16, value: TagValue) {
        self.entries.insert(tag, IFDEntry::new(tag, field_type, value));
    }

    /// Stores an integer as SHORT when it fits, LONG otherwise
    pub fn put_int(&mut self, tag: u16, value: u64) {
        let field_type = if value <= u16::MAX as u64 { field_types::SHORT } else { field_types::LONG };
        self.put(tag, field_type, TagValue::Int(value));
    }

    /// Stores integers with an explicit field type
    pub fn put_ints(&mut self, tag: u16, field_type: u16, values: Vec<u64>) {
        let value = if values.len() == 1 { TagValue::Int(values[0]) } else { TagValue::IntArray(values) };
        self.put(tag, field_type, value);
    }

    /// Stores an ASCII string
    pub fn put_string(&mut self, tag: u16, value: &str) {
        self.put(tag, field_types::ASCII, TagValue::Str(value.to_string()));
    }

    /// Removes a tag, returning its entry
    pub fn remove(&mut self, tag: u16) -> Option<IFDEntry> {
        self.entries.remove(&tag)
    }

    /// Checks if this IFD has a specific tag
    pub fn has_tag(&self, tag: u16) -> bool {
        self.entries.contains_key(&tag)
    }

    /// Gets an IFD entry by tag
    pub fn get_entry(&self, tag: u16) -> Option<&IFDEntry> {
        self.entries.get(&tag)
    }

    /// Gets the typed value of a tag
    pub fn get_value(&self, tag: u16) -> Option<&TagValue> {
        self.entries.get(&tag).map(|e| &e.value)
    }

    /// Gets the first integer of a tag
    pub fn get_tag_value(&self, tag: u16) -> Option<u64> {
        self.get_value(tag).and_then(|v| v.as_u64())
    }

    /// Gets all integers of a tag
    pub fn get_tag_values(&self, tag: u16) -> Option<Vec<u64>> {
        self.get_value(tag).and_then(|v| v.as_u64_vec())
    }

    /// Gets an ASCII tag
    pub fn get_string(&self, tag: u16) -> Option<&str> {
        match self.get_value(tag) {
            Some(TagValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Entries in ascending tag order
    pub fn entries(&self) -> impl Iterator<Item = &IFDEntry> {
        self.entries.values()
    }

    /// Gets the number of entries in this IFD
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn required_positive(&self, tag: u16, name: &str) -> TiffResult<u32> {
        let value = self.get_tag_value(tag).ok_or(TiffError::MissingDimensions)?;
        if value == 0 || value > u32::MAX as u64 {
            return Err(TiffError::FormatError(format!("{} {} is out of range", name, value)));
        }
        Ok(value as u32)
    }

    /// Image width in pixels
    pub fn image_width(&self) -> TiffResult<u32> {
        self.required_positive(tags::IMAGE_WIDTH, "ImageWidth")
    }

    /// Image height in pixels
    pub fn image_height(&self) -> TiffResult<u32> {
        self.required_positive(tags::IMAGE_LENGTH, "ImageLength")
    }

    /// Gets the dimensions of the image described by this IFD
    pub fn get_dimensions(&self) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH)?;
        Some((width, height))
    }

    /// Whether the image is organized in tiles rather than strips
    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_WIDTH) || self.has_tag(tags::TILE_LENGTH)
    }

    /// Width of one tile; for strips, the image width
    pub fn tile_size_x(&self) -> TiffResult<u32> {
        if self.is_tiled() {
            let width = self.get_tag_value(tags::TILE_WIDTH).unwrap_or(0);
            if width == 0 || width > u32::MAX as u64 {
                return Err(TiffError::FormatError(format!("Invalid TileWidth {}", width)));
            }
            Ok(width as u32)
        } else {
            self.image_width()
        }
    }

    /// Height of one tile; for strips, RowsPerStrip clamped to the image height
    pub fn tile_size_y(&self) -> TiffResult<u32> {
        if self.is_tiled() {
            let length = self.get_tag_value(tags::TILE_LENGTH).unwrap_or(0);
            if length == 0 || length > u32::MAX as u64 {
                return Err(TiffError::FormatError(format!("Invalid TileLength {}", length)));
            }
            Ok(length as u32)
        } else {
            let height = self.image_height()?;
            match self.get_tag_value(tags::ROWS_PER_STRIP) {
                None => Ok(height),
                Some(0) => Err(TiffError::FormatError("RowsPerStrip is zero".to_string())),
                Some(rows) => Ok(rows.min(height as u64) as u32),
            }
        }
    }

    /// Number of samples per pixel (default 1)
    pub fn samples_per_pixel(&self) -> TiffResult<u16> {
        let samples = self.get_tag_value(tags::SAMPLES_PER_PIXEL).unwrap_or(1);
        if samples == 0 || samples > u16::MAX as u64 {
            return Err(TiffError::FormatError(format!("Invalid SamplesPerPixel {}", samples)));
        }
        Ok(samples as u16)
    }

    /// Bits of every sample (default 1), one value per sample
    pub fn bits_per_sample(&self) -> TiffResult<Vec<u16>> {
        let samples = self.samples_per_pixel()? as usize;
        let bits = self.get_tag_values(tags::BITS_PER_SAMPLE).unwrap_or_else(|| vec![1]);
        if bits.iter().any(|b| *b == 0 || *b > 128) {
            return Err(TiffError::FormatError(format!("Invalid BitsPerSample {:?}", bits)));
        }
        let bits: Vec<u16> = bits.into_iter().map(|b| b as u16).collect();
        if bits.len() == samples {
            Ok(bits)
        } else if bits.len() == 1 || bits.len() > samples {
            // a single value applies to all samples; extra values are ignored
            Ok((0..samples).map(|i| if bits.len() == 1 { bits[0] } else { bits[i] }).collect())
        } else {
            Err(TiffError::FormatError(format!(
                "BitsPerSample has {} values, but SamplesPerPixel is {}", bits.len(), samples)))
        }
    }

    /// Classifies the bit depth for direct access
    pub fn bit_depth_support(&self) -> TiffResult<BitDepthSupport> {
        Ok(BitDepthSupport::classify(&self.bits_per_sample()?))
    }

    /// Uniform, directly supported bits per sample
    pub fn uniform_bits_per_sample(&self) -> TiffResult<u16> {
        match self.bit_depth_support()? {
            BitDepthSupport::Direct { bits } => Ok(bits),
            BitDepthSupport::NeedsUnpacking { bits } => Err(TiffError::UnsupportedBitDepth(vec![bits])),
            BitDepthSupport::NonUniform(bits) => Err(TiffError::UnsupportedBitDepth(bits)),
        }
    }

    /// Compression code (default 1, uncompressed)
    pub fn compression_code(&self) -> u64 {
        self.get_tag_value(tags::COMPRESSION).unwrap_or(compression::NONE as u64)
    }

    /// Planar configuration (default chunky)
    pub fn planar_configuration(&self) -> TiffResult<u16> {
        match self.get_tag_value(tags::PLANAR_CONFIGURATION) {
            None => Ok(planar_config::CHUNKY),
            Some(v) if v == planar_config::CHUNKY as u64 || v == planar_config::PLANAR as u64 => Ok(v as u16),
            Some(v) => Err(TiffError::FormatError(format!("Invalid PlanarConfiguration {}", v))),
        }
    }

    /// Whether each sample is stored in its own plane
    pub fn is_planar_separated(&self) -> TiffResult<bool> {
        Ok(self.planar_configuration()? == planar_config::PLANAR)
    }

    /// Number of separately stored planes
    pub fn number_of_separated_planes(&self) -> TiffResult<u16> {
        if self.is_planar_separated()? {
            self.samples_per_pixel()
        } else {
            Ok(1)
        }
    }

    /// Predictor (default none)
    pub fn predictor(&self) -> u16 {
        self.get_tag_value(tags::PREDICTOR).unwrap_or(predictor::NONE as u64) as u16
    }

    /// Sample format (default unsigned integer)
    pub fn sample_format(&self) -> u16 {
        self.get_tag_value(tags::SAMPLE_FORMAT).unwrap_or(sample_format::UNSIGNED as u64) as u16
    }

    /// Photometric interpretation, if declared
    pub fn photometric(&self) -> Option<u16> {
        self.get_tag_value(tags::PHOTOMETRIC_INTERPRETATION).map(|v| v as u16)
    }

    /// Tags holding the offsets and byte counts of this image's data
    pub fn data_tags(&self) -> (u16, u16) {
        if self.is_tiled() {
            (tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
        } else {
            (tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
        }
    }

    /// TileOffsets or StripOffsets
    pub fn tile_offsets(&self) -> TiffResult<Vec<u64>> {
        let (offsets_tag, _) = self.data_tags();
        self.get_tag_values(offsets_tag).ok_or(TiffError::TagNotFound(offsets_tag))
    }

    /// TileByteCounts or StripByteCounts
    pub fn tile_byte_counts(&self) -> TiffResult<Vec<u64>> {
        let (_, counts_tag) = self.data_tags();
        self.get_tag_values(counts_tag).ok_or(TiffError::TagNotFound(counts_tag))
    }

    /// Offsets listed in the SubIFDs tag
    pub fn sub_ifd_offsets(&self) -> Vec<u64> {
        self.get_tag_values(tags::SUB_IFD).unwrap_or_default()
    }

    /// Sets ImageWidth and ImageLength
    pub fn set_image_dimensions(&mut self, width: u32, height: u32) {
        self.put_int(tags::IMAGE_WIDTH, width as u64);
        self.put_int(tags::IMAGE_LENGTH, height as u64);
    }

    /// Switches to a tiled layout with the given tile size
    pub fn set_tile_sizes(&mut self, tile_width: u32, tile_length: u32) {
        self.remove(tags::ROWS_PER_STRIP);
        self.remove(tags::STRIP_OFFSETS);
        self.remove(tags::STRIP_BYTE_COUNTS);
        self.put_int(tags::TILE_WIDTH, tile_width as u64);
        self.put_int(tags::TILE_LENGTH, tile_length as u64);
    }

    /// Switches to a stripped layout with the given rows per strip
    pub fn set_rows_per_strip(&mut self, rows: u32) {
        self.remove(tags::TILE_WIDTH);
        self.remove(tags::TILE_LENGTH);
        self.remove(tags::TILE_OFFSETS);
        self.remove(tags::TILE_BYTE_COUNTS);
        self.put_int(tags::ROWS_PER_STRIP, rows as u64);
    }

    /// Sets SamplesPerPixel
    pub fn set_samples_per_pixel(&mut self, samples: u16) {
        self.put_int(tags::SAMPLES_PER_PIXEL, samples as u64);
    }

    /// Sets the same bit depth for all samples
    pub fn set_bits_per_sample(&mut self, bits: u16) -> TiffResult<()> {
        let samples = self.samples_per_pixel()? as usize;
        self.put_ints(tags::BITS_PER_SAMPLE, field_types::SHORT, vec![bits as u64; samples]);
        Ok(())
    }

    /// Sets the compression code
    pub fn set_compression(&mut self, code: u64) {
        self.put_int(tags::COMPRESSION, code);
    }

    /// Sets PlanarConfiguration
    pub fn set_planar_separated(&mut self, separated: bool) {
        let value = if separated { planar_config::PLANAR } else { planar_config::CHUNKY };
        self.put_int(tags::PLANAR_CONFIGURATION, value as u64);
    }

    /// Sets PhotometricInterpretation
    pub fn set_photometric(&mut self, code: u16) {
        self.put_int(tags::PHOTOMETRIC_INTERPRETATION, code as u64);
    }

    /// Sets Predictor
    pub fn set_predictor(&mut self, code: u16) {
        self.put_int(tags::PREDICTOR, code as u64);
    }
}

impl fmt::Display for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        writeln!(f, "  Number of entries: {}", self.entries.len())?;

        if let Some((width, height)) = self.get_dimensions() {
            writeln!(f, "  Dimensions: {}x{}", width, height)?;
        }

        writeln!(f, "  Tags:")?;
        for entry in self.entries.values() {
            writeln!(f, "    {}", entry.description())?;
        }

        Ok(())
    }
}
