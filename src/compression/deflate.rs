//! Handler for Deflate compressed data

use std::io::{Read, Write};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::debug;

use crate::compression::options::CodecOptions;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;

/// Deflate (zlib) compression handler, for codes 8 and 32946
pub struct DeflateHandler {
    code: u64,
}

impl DeflateHandler {
    pub fn new(code: u64) -> Self {
        DeflateHandler { code }
    }
}

impl CompressionHandler for DeflateHandler {
    fn decompress(&self, data: &[u8], options: &CodecOptions) -> TiffResult<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data);
        let mut decompressed_data = Vec::with_capacity(options.expected_len);
        decoder.read_to_end(&mut decompressed_data)
            .map_err(|e| TiffError::FormatError(format!("Deflate decompression error: {}", e)))?;
        Ok(decompressed_data)
    }

    fn compress(&self, data: &[u8], options: &CodecOptions) -> TiffResult<Vec<u8>> {
        let level = match options.level {
            Some(level) => Compression::new(level.clamp(0, 9) as u32),
            None => Compression::default(),
        };
        debug!("Deflate compressing {} bytes at level {}", data.len(), level.level());
        let mut encoder = ZlibEncoder::new(Vec::new(), level);
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn name(&self) -> &'static str {
        "Deflate"
    }

    fn code(&self) -> u64 {
        self.code
    }
}
