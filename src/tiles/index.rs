//! Tile addressing

use std::fmt;

/// Identifies one tile within one IFD's grid
///
/// `ifd_id` is the session-unique identity of the IFD, so tiles of
/// different images never collide in a shared cache. `plane` is 0 for
/// chunky images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex {
    pub ifd_id: u64,
    pub plane: u16,
    pub y: u32,
    pub x: u32,
}

impl TileIndex {
    pub fn new(ifd_id: u64, plane: u16, x: u32, y: u32) -> Self {
        TileIndex { ifd_id, plane, y, x }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(ifd {}, plane {}, x {}, y {})", self.ifd_id, self.plane, self.x, self.y)
    }
}
