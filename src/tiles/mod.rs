//! Tile maps over TIFF images
//!
//! A grid divides an image into tiles or strips. Read maps fetch and decode
//! tiles on demand; write maps collect pixels into tiles until the writer
//! flushes them.

pub mod index;
pub mod region;
pub mod grid;
pub mod tile;
pub mod cache;
pub mod read_map;
pub mod write_map;
#[cfg(test)]
mod tests;

pub use cache::TileCache;
pub use grid::TileGrid;
pub use index::TileIndex;
pub use read_map::{ReadMap, Samples};
pub use region::Region;
pub use tile::{ReadState, Tile, WriteState};
pub use write_map::WriteMap;
