//! Decoded tile cache
//!
//! Least-recently-used cache of decoded tiles with a byte budget. One
//! cache may be shared by several readers; keys carry the IFD identity.
//! Eviction only releases memory.

use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use lru::LruCache;

use crate::tiles::index::TileIndex;
use crate::tiles::tile::Tile;

/// Default budget: 256 MiB
pub const DEFAULT_CACHE_BYTES: usize = 256 * 1024 * 1024;

struct CacheState {
    entries: LruCache<TileIndex, Arc<Tile>>,
    used_bytes: usize,
}

/// Byte-budgeted LRU cache of decoded tiles
pub struct TileCache {
    max_bytes: usize,
    state: Mutex<CacheState>,
}

impl Default for TileCache {
    fn default() -> Self {
        TileCache::new(DEFAULT_CACHE_BYTES)
    }
}

impl TileCache {
    /// Creates a cache holding up to `max_bytes` of tile data; 0 disables caching
    pub fn new(max_bytes: usize) -> Self {
        TileCache {
            max_bytes,
            state: Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                used_bytes: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Bytes currently held
    pub fn used_bytes(&self) -> usize {
        self.lock().used_bytes
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a tile, marking it most recently used
    pub fn get(&self, index: &TileIndex) -> Option<Arc<Tile>> {
        self.lock().entries.get(index).cloned()
    }

    /// Inserts a tile and evicts old entries over budget
    ///
    /// # Returns
    /// Index and size of every evicted tile
    pub fn put(&self, tile: Arc<Tile>) -> Vec<(TileIndex, usize)> {
        let size = tile.memory_size();
        let mut evicted = Vec::new();
        if size > self.max_bytes {
            return evicted;
        }

        let mut state = self.lock();
        if let Some(old) = state.entries.put(tile.index(), tile) {
            state.used_bytes -= old.memory_size();
        }
        state.used_bytes += size;

        while state.used_bytes > self.max_bytes {
            match state.entries.pop_lru() {
                Some((index, old)) => {
                    let freed = old.memory_size();
                    state.used_bytes -= freed;
                    evicted.push((index, freed));
                },
                None => break,
            }
        }
        if !evicted.is_empty() {
            debug!("Tile cache evicted {} tile(s), {} bytes in use", evicted.len(), state.used_bytes);
        }
        evicted
    }

    /// Removes one tile
    pub fn remove(&self, index: &TileIndex) -> Option<Arc<Tile>> {
        let mut state = self.lock();
        let removed = state.entries.pop(index);
        if let Some(tile) = &removed {
            state.used_bytes -= tile.memory_size();
        }
        removed
    }

    /// Removes every tile of one IFD
    pub fn remove_ifd(&self, ifd_id: u64) {
        let mut state = self.lock();
        let keys: Vec<TileIndex> = state.entries.iter()
            .filter(|(k, _)| k.ifd_id == ifd_id)
            .map(|(k, _)| *k)
            .collect();
        for key in keys {
            if let Some(tile) = state.entries.pop(&key) {
                state.used_bytes -= tile.memory_size();
            }
        }
    }

    /// Removes everything
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.used_bytes = 0;
    }
}
