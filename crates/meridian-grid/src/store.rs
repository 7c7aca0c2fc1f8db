//! Durable keyed storage for chunk records.
//!
//! [`ChunkStore`] is the seam between the streamer and persistence. Three
//! implementations ship with the crate:
//!
//! - [`MemoryStore`]: encoded records in a concurrent map (tests, demos).
//! - [`FileStore`]: one JSON file per chunk in a directory.
//! - [`WriteBehindStore`](crate::write_behind::WriteBehindStore): moves
//!   writes of any inner store onto background workers.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use tracing::debug;

use crate::coords::ChunkCoord;
use crate::error::StoreError;
use crate::record::ChunkRecord;

/// A write that failed after the caller had moved on.
#[derive(Debug)]
pub struct SaveFailure {
    /// Chunk whose record was lost.
    pub coord: ChunkCoord,
    /// Why the write failed.
    pub error: StoreError,
}

/// Keyed record storage shared between the streamer and its workers.
pub trait ChunkStore: Send + Sync {
    /// Returns the record for `coord`, `Ok(None)` if none was ever written.
    fn read(&self, coord: ChunkCoord) -> Result<Option<ChunkRecord>, StoreError>;

    /// Persists `record` under `record.coord`, replacing any previous one.
    fn write(&self, record: ChunkRecord) -> Result<(), StoreError>;

    /// Blocks until every accepted write is durable.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Drains failures of writes that completed asynchronously.
    fn take_failures(&self) -> Vec<SaveFailure> {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory store holding encoded records.
///
/// Records are kept as JSON bytes so reads exercise the same decode path
/// as the file store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<ChunkCoord, Vec<u8>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw bytes under `coord`, bypassing encoding.
    pub fn insert_raw(&self, coord: ChunkCoord, bytes: Vec<u8>) {
        self.records.insert(coord, bytes);
    }

    /// Whether a record exists for `coord`.
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.records.contains_key(&coord)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing was stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ChunkStore for MemoryStore {
    fn read(&self, coord: ChunkCoord) -> Result<Option<ChunkRecord>, StoreError> {
        let Some(bytes) = self.records.get(&coord) else {
            return Ok(None);
        };
        ChunkRecord::from_json_for(bytes.value(), coord).map(Some)
    }

    fn write(&self, record: ChunkRecord) -> Result<(), StoreError> {
        let bytes = record.to_json()?;
        self.records.insert(record.coord, bytes);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// Directory of `chunk_{x}_{y}.json` files.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash never leaves a half-written record under the real name.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(Self { dir })
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file for `coord`.
    pub fn path_for(&self, coord: ChunkCoord) -> PathBuf {
        self.dir.join(ChunkRecord::file_name(coord))
    }
}

impl ChunkStore for FileStore {
    fn read(&self, coord: ChunkCoord) -> Result<Option<ChunkRecord>, StoreError> {
        let path = self.path_for(coord);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        ChunkRecord::from_json_for(&bytes, coord).map(Some)
    }

    fn write(&self, record: ChunkRecord) -> Result<(), StoreError> {
        let bytes = record.to_json()?;
        let path = self.path_for(record.coord);
        let tmp = path.with_extension("json.tmp");

        std::fs::write(&tmp, &bytes).map_err(|e| StoreError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| StoreError::io(&path, e))?;

        debug!(chunk = %record.coord, bytes = bytes.len(), "wrote chunk record");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
