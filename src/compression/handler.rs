//! Compression handler trait definition

use crate::compression::options::CodecOptions;
use crate::tiff::errors::TiffResult;

/// Strategy trait for handling different compression methods
pub trait CompressionHandler: Send + Sync {
    /// Decompress the data of one tile or strip
    fn decompress(&self, data: &[u8], options: &CodecOptions) -> TiffResult<Vec<u8>>;

    /// Compress the data of one tile or strip
    fn compress(&self, data: &[u8], options: &CodecOptions) -> TiffResult<Vec<u8>>;

    /// Get the name of this compression method
    fn name(&self) -> &'static str;

    /// Get the compression code
    fn code(&self) -> u64;
}
