//! Compression handling for TIFF files
//!
//! Codecs sit behind the `CompressionHandler` contract; `KnownCompression`
//! maps Compression tag values to them.

mod handler;
mod uncompressed;
mod deflate;
mod zstd;
mod packbits;
pub mod known;
pub mod options;
pub mod predictor;
#[cfg(test)]
mod tests;

pub use handler::CompressionHandler;
pub use uncompressed::UncompressedHandler;
pub use deflate::DeflateHandler;
pub use zstd::ZstdHandler;
pub use packbits::PackBitsHandler;
pub use known::KnownCompression;
pub use options::CodecOptions;
