//! Compression capability table
//!
//! Every supported compression kind is one variant. Lookup goes from the
//! wire code to the variant, and the variant supplies its codec and the
//! option adjustments applied before reading or writing.

use std::fmt;

use log::trace;

use crate::compression::handler::CompressionHandler;
use crate::compression::options::CodecOptions;
use crate::compression::predictor;
use crate::compression::{DeflateHandler, PackBitsHandler, UncompressedHandler, ZstdHandler};
use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};

/// Compression kinds this crate can read and write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownCompression {
    None,
    Deflate,
    AdobeDeflate,
    Zstd,
    PackBits,
}

impl KnownCompression {
    /// All supported kinds
    pub const ALL: [KnownCompression; 5] = [
        KnownCompression::None,
        KnownCompression::Deflate,
        KnownCompression::AdobeDeflate,
        KnownCompression::Zstd,
        KnownCompression::PackBits,
    ];

    /// Looks up the kind for a Compression tag value
    pub fn from_code(code: u64) -> TiffResult<Self> {
        // libtiff registers Zstandard as 50000
        if code == 50000 {
            return Ok(KnownCompression::Zstd);
        }
        Self::ALL.iter()
            .copied()
            .find(|kind| kind.code() == code)
            .ok_or(TiffError::UnsupportedCompression(code))
    }

    /// Parses a code or a name such as "zstd" or "deflate"
    pub fn from_name(name: &str) -> TiffResult<Self> {
        if let Ok(code) = name.trim().parse::<u64>() {
            return Self::from_code(code);
        }
        match name.trim().to_lowercase().as_str() {
            "none" | "uncompressed" => Ok(KnownCompression::None),
            "deflate" | "zip" => Ok(KnownCompression::Deflate),
            "adobe-deflate" | "adobe_deflate" | "old-deflate" => Ok(KnownCompression::AdobeDeflate),
            "zstd" | "zstandard" => Ok(KnownCompression::Zstd),
            "packbits" => Ok(KnownCompression::PackBits),
            _ => Err(TiffError::GenericError(format!("Unknown compression type: {}", name))),
        }
    }

    /// Compression tag value
    pub fn code(&self) -> u64 {
        let code = match self {
            KnownCompression::None => compression::NONE,
            KnownCompression::Deflate => compression::DEFLATE,
            KnownCompression::AdobeDeflate => compression::DEFLATE_OLD,
            KnownCompression::Zstd => compression::ZSTD,
            KnownCompression::PackBits => compression::PACKBITS,
        };
        code as u64
    }

    pub fn name(&self) -> &'static str {
        match self {
            KnownCompression::None => "Uncompressed",
            KnownCompression::Deflate => "Deflate",
            KnownCompression::AdobeDeflate => "Deflate (legacy code)",
            KnownCompression::Zstd => "ZSTD",
            KnownCompression::PackBits => "PackBits",
        }
    }

    /// All supported kinds are lossless
    pub fn is_lossless(&self) -> bool {
        true
    }

    /// Whether encoded tiles of `bits_per_sample` samples depend on the
    /// file byte order
    ///
    /// When false, encoded tiles can be copied between files of different
    /// byte order.
    pub fn byte_order_sensitive(&self, bits_per_sample: u16) -> bool {
        // every supported codec stores the sample bytes as they are in memory
        bits_per_sample > 8
    }

    /// Codec implementing this kind
    pub fn codec(&self) -> Box<dyn CompressionHandler> {
        match self {
            KnownCompression::None => Box::new(UncompressedHandler),
            KnownCompression::Deflate | KnownCompression::AdobeDeflate => Box::new(DeflateHandler::new(self.code())),
            KnownCompression::Zstd => Box::new(ZstdHandler),
            KnownCompression::PackBits => Box::new(PackBitsHandler),
        }
    }

    /// Adjusts decode options for this kind
    pub fn customize_reading(&self, options: &mut CodecOptions) {
        options.quality = None;
        options.level = None;
    }

    /// Adjusts encode options, mapping the quality hint to a level
    pub fn customize_writing(&self, options: &mut CodecOptions) {
        let quality = options.quality.map(|q| q.clamp(0.0, 1.0));
        options.level = match (self, quality) {
            (KnownCompression::Deflate | KnownCompression::AdobeDeflate, Some(q)) => Some((q * 9.0).round() as i32),
            (KnownCompression::Zstd, Some(q)) => Some(((q * 22.0).round() as i32).max(1)),
            _ => None,
        };
    }

    /// Decodes one tile and undoes the predictor
    pub fn decode(&self, data: &[u8], options: &CodecOptions) -> TiffResult<Vec<u8>> {
        let mut options = options.clone();
        self.customize_reading(&mut options);
        let mut decoded = self.codec().decompress(data, &options)?;
        predictor::undo(&mut decoded, &options)?;
        trace!("{} decoded {} bytes into {}", self.name(), data.len(), decoded.len());
        Ok(decoded)
    }

    /// Applies the predictor and encodes one tile
    pub fn encode(&self, data: &[u8], options: &CodecOptions) -> TiffResult<Vec<u8>> {
        let mut options = options.clone();
        self.customize_writing(&mut options);
        let encoded = if options.predictor == crate::tiff::constants::predictor::NONE {
            self.codec().compress(data, &options)?
        } else {
            let mut predicted = data.to_vec();
            predictor::apply(&mut predicted, &options)?;
            self.codec().compress(&predicted, &options)?
        };
        trace!("{} encoded {} bytes into {}", self.name(), data.len(), encoded.len());
        Ok(encoded)
    }
}

impl fmt::Display for KnownCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
