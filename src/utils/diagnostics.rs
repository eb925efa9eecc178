//! Structured diagnostics
//!
//! Reader and writer sessions report notable events to an optional
//! callback injected through their options. Every event is also logged at
//! trace level.

use std::fmt;
use std::sync::Arc;

use log::trace;

use crate::tiles::index::TileIndex;

/// One engine event
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// An IFD was parsed from the file
    IfdRead { offset: u64, entries: usize },
    /// Encoded tile bytes were read from the file
    TileRead { index: TileIndex, offset: u64, byte_count: u64 },
    /// A tile was decoded
    TileDecoded { index: TileIndex, bytes: usize },
    /// The tile cache dropped a decoded tile
    TileEvicted { index: TileIndex, bytes: usize },
    /// Encoded tile bytes were appended to the file
    TileWritten { index: TileIndex, offset: u64, byte_count: u64 },
    /// An IFD was written, in place or appended
    IfdWritten { offset: u64, in_place: bool },
    /// An image was completed and linked into the chain
    ImageCompleted { ifd_offset: u64, tiles: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::IfdRead { offset, entries } =>
                write!(f, "read IFD at {} ({} entries)", offset, entries),
            Diagnostic::TileRead { index, offset, byte_count } =>
                write!(f, "read tile {} ({} bytes at {})", index, byte_count, offset),
            Diagnostic::TileDecoded { index, bytes } =>
                write!(f, "decoded tile {} ({} bytes)", index, bytes),
            Diagnostic::TileEvicted { index, bytes } =>
                write!(f, "evicted tile {} ({} bytes)", index, bytes),
            Diagnostic::TileWritten { index, offset, byte_count } =>
                write!(f, "wrote tile {} ({} bytes at {})", index, byte_count, offset),
            Diagnostic::IfdWritten { offset, in_place } =>
                write!(f, "wrote IFD at {}{}", offset, if *in_place { " (in place)" } else { "" }),
            Diagnostic::ImageCompleted { ifd_offset, tiles } =>
                write!(f, "completed image with IFD at {} ({} tiles)", ifd_offset, tiles),
        }
    }
}

/// Callback receiving diagnostics
pub type DiagnosticsHandler = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

/// Logs an event and forwards it to the handler, if any
pub fn emit(handler: &Option<DiagnosticsHandler>, event: Diagnostic) {
    trace!("{}", event);
    if let Some(handler) = handler {
        handler(&event);
    }
}
