//! Rectangular pixel regions
//!
//! A region is a half-open rectangle `[x, x + width) × [y, y + height)` in
//! image pixel coordinates, with (0,0) at the top-left corner.

use std::fmt;

/// Rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    /// X-coordinate of the top-left corner (pixels from left)
    pub x: u32,

    /// Y-coordinate of the top-left corner (pixels from top)
    pub y: u32,

    /// Width of the region in pixels
    pub width: u32,

    /// Height of the region in pixels
    pub height: u32,
}

impl Region {
    /// Create a new region
    ///
    /// # Arguments
    /// * `x` - X-coordinate of the top-left corner
    /// * `y` - Y-coordinate of the top-left corner
    /// * `width` - Width of the region in pixels
    /// * `height` - Height of the region in pixels
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Region { x, y, width, height }
    }

    /// X-coordinate immediately after the rightmost pixel
    pub fn end_x(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Y-coordinate immediately below the bottom row
    pub fn end_y(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// True when the region covers no pixel
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether `other` lies completely inside this region
    pub fn contains(&self, other: &Region) -> bool {
        other.x >= self.x && other.y >= self.y
            && other.end_x() <= self.end_x() && other.end_y() <= self.end_y()
    }

    /// Common part of two regions, if any
    pub fn intersection(&self, other: &Region) -> Option<Region> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.end_x().min(other.end_x());
        let y1 = self.end_y().min(other.end_y());
        if x1 <= x0 as u64 || y1 <= y0 as u64 {
            return None;
        }
        Some(Region::new(x0, y0, (x1 - x0 as u64) as u32, (y1 - y0 as u64) as u32))
    }

    /// Parts of this region not covered by `other`
    ///
    /// Returns at most four disjoint rectangles: the band above, the band
    /// below, and the pieces left and right of the overlap.
    pub fn subtract(&self, other: &Region) -> Vec<Region> {
        let overlap = match self.intersection(other) {
            Some(overlap) => overlap,
            None => return vec![*self],
        };

        let mut rest = Vec::with_capacity(4);
        if overlap.y > self.y {
            rest.push(Region::new(self.x, self.y, self.width, overlap.y - self.y));
        }
        if overlap.end_y() < self.end_y() {
            rest.push(Region::new(self.x, overlap.end_y() as u32, self.width,
                                  (self.end_y() - overlap.end_y()) as u32));
        }
        if overlap.x > self.x {
            rest.push(Region::new(self.x, overlap.y, overlap.x - self.x, overlap.height));
        }
        if overlap.end_x() < self.end_x() {
            rest.push(Region::new(overlap.end_x() as u32, overlap.y,
                                  (self.end_x() - overlap.end_x()) as u32, overlap.height));
        }
        rest
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.width, self.height, self.x, self.y)
    }
}
