//! Tile/strip map engine for TIFF and BigTIFF files
//!
//! `TiffReader` discovers the IFDs of a file and hands out `ReadMap`s that
//! read pixel regions tile by tile. `TiffWriter` builds new files through
//! `WriteMap`s, flushing tiles as soon as they are complete so huge images
//! never have to fit in memory. `TiffCopier` moves images between the two.

pub mod io;
pub mod tiff;
pub mod tiles;
pub mod utils;
pub mod compression;
pub mod copier;
pub mod config;
pub mod commands;

pub use copier::{CopyOutcome, ProgressInformation, TiffCopier};
pub use tiff::{ChainMode, OpenMode, ReaderOptions, TiffError, TiffReader, TiffResult, TiffWriter, WriterOptions};
pub use tiles::{ReadMap, Region, Samples, TileGrid, TileIndex, WriteMap};
