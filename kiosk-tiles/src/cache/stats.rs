//! Aggregate statistics reported by tile stores.

use std::fmt;

use serde::Serialize;

/// Which storage backend produced a set of statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// Embedded SQLite key-value table.
    KeyValue,
    /// One file per tile in a `z/x/y` directory hierarchy.
    Filesystem,
}

impl StorageKind {
    /// Human-readable label for status displays.
    pub fn label(&self) -> &'static str {
        match self {
            StorageKind::KeyValue => "SQLite key-value",
            StorageKind::Filesystem => "Filesystem",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Advisory cache statistics.
///
/// Counts are best effort and not comparable across backends. `None` means
/// the backend could not derive the value cheaply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Backend that produced these numbers.
    pub storage: StorageKind,
    /// Number of stored tiles.
    pub tile_count: Option<u64>,
    /// Total stored bytes.
    pub size_bytes: Option<u64>,
}

impl CacheStats {
    /// Statistics with no derivable counts.
    pub fn unknown(storage: StorageKind) -> Self {
        Self {
            storage,
            tile_count: None,
            size_bytes: None,
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.storage)?;
        match self.tile_count {
            Some(count) => write!(f, "{} tiles", count)?,
            None => write!(f, "tile count unavailable")?,
        }
        if let Some(bytes) = self.size_bytes {
            write!(f, ", {} bytes", bytes)?;
        }
        Ok(())
    }
}
