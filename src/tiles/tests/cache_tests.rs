//! Tests for the tile cache

extern crate std;

use std::sync::Arc;

use crate::tiles::cache::TileCache;
use crate::tiles::index::TileIndex;
use crate::tiles::region::Region;
use crate::tiles::tile::Tile;

fn decoded_tile(ifd_id: u64, x: u32, bytes: usize) -> Arc<Tile> {
    let mut tile = Tile::new(TileIndex::new(ifd_id, 0, x, 0), Region::new(x * 16, 0, 16, 16), (16, 16), 16);
    tile.set_decoded(vec![0; bytes]);
    Arc::new(tile)
}

#[test]
fn test_put_and_get() {
    let cache = TileCache::new(1000);
    cache.put(decoded_tile(1, 0, 100));
    std::assert_eq!(cache.len(), 1);
    std::assert_eq!(cache.used_bytes(), 100);
    std::assert!(cache.get(&TileIndex::new(1, 0, 0, 0)).is_some());
    std::assert!(cache.get(&TileIndex::new(2, 0, 0, 0)).is_none());
}

#[test]
fn test_evicts_least_recently_used() {
    let cache = TileCache::new(250);
    cache.put(decoded_tile(1, 0, 100));
    cache.put(decoded_tile(1, 1, 100));
    // touch tile 0 so tile 1 becomes the oldest
    cache.get(&TileIndex::new(1, 0, 0, 0));

    let evicted = cache.put(decoded_tile(1, 2, 100));
    std::assert_eq!(evicted, vec![(TileIndex::new(1, 0, 1, 0), 100)]);
    std::assert_eq!(cache.used_bytes(), 200);
    std::assert!(cache.get(&TileIndex::new(1, 0, 0, 0)).is_some());
}

#[test]
fn test_oversized_tile_is_not_cached() {
    let cache = TileCache::new(50);
    std::assert!(cache.put(decoded_tile(1, 0, 100)).is_empty());
    std::assert!(cache.is_empty());
}

#[test]
fn test_remove_ifd() {
    let cache = TileCache::new(10_000);
    cache.put(decoded_tile(1, 0, 10));
    cache.put(decoded_tile(2, 0, 10));
    cache.remove_ifd(1);
    std::assert_eq!(cache.len(), 1);
    std::assert_eq!(cache.used_bytes(), 10);
    cache.clear();
    std::assert!(cache.is_empty());
}
