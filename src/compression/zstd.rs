//! Handler for ZSTD compressed data

use crate::compression::options::CodecOptions;
use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;
use log::{debug, warn};

/// Level used when the writer gives no quality hint
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// ZSTD compression handler (compression code 14)
pub struct ZstdHandler;

impl CompressionHandler for ZstdHandler {
    fn decompress(&self, data: &[u8], _options: &CodecOptions) -> TiffResult<Vec<u8>> {
        debug!("ZSTD decompressing {} bytes", data.len());
        if data.is_empty() {
            return Ok(Vec::new());
        }

        zstd::decode_all(data).map_err(|e| {
            warn!("ZSTD decompression error: {}", e);
            TiffError::FormatError(format!("ZSTD decompression error: {}", e))
        })
    }

    fn compress(&self, data: &[u8], options: &CodecOptions) -> TiffResult<Vec<u8>> {
        let level = options.level.unwrap_or(DEFAULT_ZSTD_LEVEL).clamp(1, 22);
        debug!("ZSTD compressing {} bytes with level {}", data.len(), level);

        zstd::encode_all(data, level).map_err(|e| {
            warn!("ZSTD compression error: {}", e);
            TiffError::GenericError(format!("ZSTD compression error: {}", e))
        })
    }

    fn name(&self) -> &'static str {
        "ZSTD"
    }

    fn code(&self) -> u64 {
        compression::ZSTD as u64
    }
}
