//! Settings loaded from a TOML file
//!
//! ```toml
//! [reader]
//! chain_mode = "lenient"      # or "strict"
//! allow_invalid = false
//! filler = 0
//! crop_to_image = true
//! missing_tiles_allowed = true
//! caching_ifds = true
//! cache_bytes = 268435456
//!
//! [writer]
//! big_tiff = false
//! byte_order = "little"       # or "big"
//! filler = 0
//! missing_tiles_allowed = false
//! compression_quality = 0.5
//!
//! [copier]
//! direct_copy = true
//! compression = "deflate"     # name or code
//! ```
//!
//! Every key is optional. Unknown keys are ignored.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::compression::known::KnownCompression;
use crate::io::byte_order::ByteOrder;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::reader::{ChainMode, OpenMode, ReaderOptions};
use crate::tiff::writer::WriterOptions;
use crate::tiles::cache::TileCache;

/// Copier settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CopierSettings {
    pub direct_copy: bool,
    /// Compression code for re-encoded images
    pub compression: Option<u64>,
}

/// All settings of a tiffgrid session
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub reader: ReaderOptions,
    pub writer: WriterOptions,
    pub copier: CopierSettings,
}

fn type_error(table: &str, key: &str, expected: &str) -> TiffError {
    TiffError::GenericError(format!("Setting {}.{} must be {}", table, key, expected))
}

/// Typed access to one table of the settings file
struct Table<'a> {
    name: &'a str,
    table: Option<&'a toml::value::Table>,
}

impl<'a> Table<'a> {
    fn new(root: &'a toml::Value, name: &'a str) -> TiffResult<Self> {
        match root.get(name) {
            None => Ok(Table { name, table: None }),
            Some(value) => match value.as_table() {
                Some(table) => Ok(Table { name, table: Some(table) }),
                None => Err(TiffError::GenericError(format!("Setting [{}] must be a table", name))),
            },
        }
    }

    fn value(&self, key: &str) -> Option<&'a toml::Value> {
        self.table.and_then(|t| t.get(key))
    }

    fn bool(&self, key: &str) -> TiffResult<Option<bool>> {
        match self.value(key) {
            None => Ok(None),
            Some(v) => v.as_bool().map(Some).ok_or_else(|| type_error(self.name, key, "a boolean")),
        }
    }

    fn integer(&self, key: &str) -> TiffResult<Option<i64>> {
        match self.value(key) {
            None => Ok(None),
            Some(v) => v.as_integer().map(Some).ok_or_else(|| type_error(self.name, key, "an integer")),
        }
    }

    fn byte(&self, key: &str) -> TiffResult<Option<u8>> {
        match self.integer(key)? {
            None => Ok(None),
            Some(v) => u8::try_from(v).map(Some).map_err(|_| type_error(self.name, key, "in 0..=255")),
        }
    }

    fn float(&self, key: &str) -> TiffResult<Option<f64>> {
        match self.value(key) {
            None => Ok(None),
            Some(v) => v.as_float()
                .or_else(|| v.as_integer().map(|i| i as f64))
                .map(Some)
                .ok_or_else(|| type_error(self.name, key, "a number")),
        }
    }

    fn string(&self, key: &str) -> TiffResult<Option<&'a str>> {
        match self.value(key) {
            None => Ok(None),
            Some(v) => v.as_str().map(Some).ok_or_else(|| type_error(self.name, key, "a string")),
        }
    }
}

fn parse_byte_order(name: &str) -> TiffResult<ByteOrder> {
    match name.to_ascii_lowercase().as_str() {
        "little" | "little-endian" | "ii" => Ok(ByteOrder::LittleEndian),
        "big" | "big-endian" | "mm" => Ok(ByteOrder::BigEndian),
        _ => Err(TiffError::GenericError(format!("Unknown byte order: {}", name))),
    }
}

impl Settings {
    /// Reads settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> TiffResult<Self> {
        let path = path.as_ref();
        debug!("Loading settings from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses settings from TOML text
    pub fn from_str(content: &str) -> TiffResult<Self> {
        let root: toml::Value = match content.parse() {
            Ok(value) => value,
            Err(e) => return Err(TiffError::GenericError(format!("Failed to parse TOML: {}", e))),
        };

        let mut settings = Settings::default();
        settings.read_reader(&Table::new(&root, "reader")?)?;
        settings.read_writer(&Table::new(&root, "writer")?)?;
        settings.read_copier(&Table::new(&root, "copier")?)?;
        Ok(settings)
    }

    fn read_reader(&mut self, table: &Table<'_>) -> TiffResult<()> {
        let reader = &mut self.reader;
        if let Some(mode) = table.string("chain_mode")? {
            reader.chain_mode = match mode.to_ascii_lowercase().as_str() {
                "strict" => ChainMode::Strict,
                "lenient" => ChainMode::Lenient,
                _ => return Err(TiffError::GenericError(format!("Unknown chain mode: {}", mode))),
            };
        }
        if let Some(allow) = table.bool("allow_invalid")? {
            reader.open_mode = if allow { OpenMode::AllowInvalid } else { OpenMode::ValidTiff };
        }
        if let Some(filler) = table.byte("filler")? {
            reader.filler = filler;
        }
        if let Some(crop) = table.bool("crop_to_image")? {
            reader.crop_to_image = crop;
        }
        if let Some(allowed) = table.bool("missing_tiles_allowed")? {
            reader.missing_tiles_allowed = allowed;
        }
        if let Some(caching) = table.bool("caching_ifds")? {
            reader.caching_ifds = caching;
        }
        if let Some(bytes) = table.integer("cache_bytes")? {
            let bytes = usize::try_from(bytes).map_err(|_| type_error(table.name, "cache_bytes", "positive"))?;
            reader.tile_cache = Arc::new(TileCache::new(bytes));
        }
        Ok(())
    }

    fn read_writer(&mut self, table: &Table<'_>) -> TiffResult<()> {
        let writer = &mut self.writer;
        if let Some(big) = table.bool("big_tiff")? {
            writer.big_tiff = big;
        }
        if let Some(order) = table.string("byte_order")? {
            writer.byte_order = parse_byte_order(order)?;
        }
        if let Some(filler) = table.byte("filler")? {
            writer.filler = filler;
        }
        if let Some(allowed) = table.bool("missing_tiles_allowed")? {
            writer.missing_tiles_allowed = allowed;
        }
        if let Some(quality) = table.float("compression_quality")? {
            writer.compression_quality = Some(quality);
        }
        Ok(())
    }

    fn read_copier(&mut self, table: &Table<'_>) -> TiffResult<()> {
        if let Some(direct) = table.bool("direct_copy")? {
            self.copier.direct_copy = direct;
        }
        match table.value("compression") {
            None => {},
            Some(toml::Value::Integer(code)) => {
                let code = u64::try_from(*code).map_err(|_| type_error(table.name, "compression", "positive"))?;
                self.copier.compression = Some(KnownCompression::from_code(code)?.code());
            },
            Some(toml::Value::String(name)) => {
                self.copier.compression = Some(KnownCompression::from_name(name)?.code());
            },
            Some(_) => return Err(type_error(table.name, "compression", "a name or code")),
        }
        Ok(())
    }
}
