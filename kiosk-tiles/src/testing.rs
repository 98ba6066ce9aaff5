//! In-process doubles for the storage and network seams.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::cache::{BoxFuture, CacheStats, StorageKind, StoreError, TileStore};
use crate::coord::TileIndex;
use crate::provider::{FetchError, TileFetcher};

/// PNG signature followed by an IHDR tag; enough for format sniffing.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

/// HashMap-backed store. Writes to tiles in `failing` return an error.
#[derive(Default)]
pub struct MockTileStore {
    tiles: Mutex<HashMap<TileIndex, Bytes>>,
    failing: HashSet<TileIndex>,
    pub fail_reads: bool,
    pub saves: AtomicUsize,
}

impl MockTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_writes(tiles: impl IntoIterator<Item = TileIndex>) -> Self {
        Self {
            failing: tiles.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.lock().len()
    }

    pub fn has(&self, tile: TileIndex) -> bool {
        self.tiles.lock().contains_key(&tile)
    }

    pub fn insert(&self, tile: TileIndex, blob: Bytes) {
        self.tiles.lock().insert(tile, blob);
    }

    fn read_error() -> StoreError {
        StoreError::Io(std::io::Error::other("read failed"))
    }
}

impl TileStore for MockTileStore {
    fn save_tile(&self, tile: TileIndex, blob: Bytes) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&tile) {
                return Err(StoreError::Io(std::io::Error::other("write failed")));
            }
            self.tiles.lock().insert(tile, blob);
            Ok(())
        })
    }

    fn get_tile(&self, tile: TileIndex) -> BoxFuture<'_, Result<Option<Bytes>, StoreError>> {
        Box::pin(async move {
            if self.fail_reads {
                return Err(Self::read_error());
            }
            Ok(self.tiles.lock().get(&tile).cloned())
        })
    }

    fn contains(&self, tile: TileIndex) -> BoxFuture<'_, Result<bool, StoreError>> {
        Box::pin(async move {
            if self.fail_reads {
                return Err(Self::read_error());
            }
            Ok(self.tiles.lock().contains_key(&tile))
        })
    }

    fn clear_all(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            self.tiles.lock().clear();
            Ok(())
        })
    }

    fn stats(&self) -> BoxFuture<'_, Result<CacheStats, StoreError>> {
        Box::pin(async move {
            let tiles = self.tiles.lock();
            Ok(CacheStats {
                storage: StorageKind::KeyValue,
                tile_count: Some(tiles.len() as u64),
                size_bytes: Some(tiles.values().map(|b| b.len() as u64).sum()),
            })
        })
    }
}

/// Fetcher that serves [`PNG_BYTES`] except for tiles in `failing`.
///
/// Tracks the peak number of overlapping fetches.
#[derive(Default)]
pub struct MockTileFetcher {
    failing: Mutex<HashSet<TileIndex>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl MockTileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(tiles: impl IntoIterator<Item = TileIndex>) -> Self {
        Self {
            failing: Mutex::new(tiles.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn heal(&self) {
        self.failing.lock().clear();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl TileFetcher for MockTileFetcher {
    fn fetch(&self, tile: TileIndex) -> BoxFuture<'_, Result<Bytes, FetchError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.lock().contains(&tile) {
                return Err(FetchError::Status {
                    status: 503,
                    url: tile.key(),
                });
            }
            Ok(Bytes::from_static(PNG_BYTES))
        })
    }
}
