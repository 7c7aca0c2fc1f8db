//! Persisted chunk records.
//!
//! A record holds one entry per cell that has any non-empty field, with
//! terrain and feature stored by catalog *name* so records survive catalog
//! id reassignment.
//!
//! ## JSON layout
//!
//! ```json
//! {
//!   "version": 1,
//!   "coord": { "x": -1, "y": 0 },
//!   "entries": [
//!     { "local": { "x": 0, "y": 3 }, "terrain": "land", "feature": "station" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::coords::{ChunkCoord, LocalCoord};
use crate::error::StoreError;

/// Current record format version.
pub const RECORD_VERSION: u32 = 1;

/// Stored state of one cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    /// Cell offset inside the chunk.
    pub local: LocalCoord,
    /// Terrain name, if the cell had terrain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terrain: Option<String>,
    /// Feature name, if the cell had a feature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
}

/// Everything persisted for one chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Format version the record was written with.
    pub version: u32,
    /// Coordinate of the chunk this record describes.
    pub coord: ChunkCoord,
    /// Non-empty cells in local order.
    pub entries: Vec<RecordEntry>,
}

impl ChunkRecord {
    /// Creates an empty record for `coord` at the current version.
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            version: RECORD_VERSION,
            coord,
            entries: Vec::new(),
        }
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: RecordEntry) {
        self.entries.push(entry);
    }

    /// Store key / file name for a coordinate: `chunk_{x}_{y}.json`.
    pub fn file_name(coord: ChunkCoord) -> String {
        format!("chunk_{}_{}.json", coord.x, coord.y)
    }

    /// Serializes the record to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(self).map_err(StoreError::Encode)
    }

    /// Parses a record from JSON bytes.
    ///
    /// # Errors
    ///
    /// [`StoreError::Corrupt`] for malformed JSON and
    /// [`StoreError::UnsupportedVersion`] for a version this build cannot
    /// read.
    pub fn from_json(bytes: &[u8]) -> Result<Self, StoreError> {
        let record: Self = serde_json::from_slice(bytes).map_err(StoreError::Corrupt)?;
        if record.version != RECORD_VERSION {
            return Err(StoreError::UnsupportedVersion(record.version));
        }
        Ok(record)
    }

    /// Parses a record and checks it describes `expected`.
    pub fn from_json_for(bytes: &[u8], expected: ChunkCoord) -> Result<Self, StoreError> {
        let record = Self::from_json(bytes)?;
        if record.coord != expected {
            return Err(StoreError::CoordinateMismatch {
                expected,
                found: record.coord,
            });
        }
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChunkRecord {
        let mut record = ChunkRecord::new(ChunkCoord::new(-3, 7));
        record.push(RecordEntry {
            local: LocalCoord::new(0, 1),
            terrain: Some("land".into()),
            feature: Some("station".into()),
        });
        record.push(RecordEntry {
            local: LocalCoord::new(2, 2),
            terrain: Some("ocean".into()),
            feature: None,
        });
        record
    }

    #[test]
    fn test_json_roundtrip() {
        let record = sample();
        let bytes = record.to_json().unwrap();
        assert_eq!(ChunkRecord::from_json(&bytes).unwrap(), record);
    }

    #[test]
    fn test_absent_feature_is_omitted() {
        let bytes = sample().to_json().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.matches("feature").count(), 1);
    }

    #[test]
    fn test_file_name_format() {
        assert_eq!(ChunkRecord::file_name(ChunkCoord::new(-1, 2)), "chunk_-1_2.json");
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let result = ChunkRecord::from_json(b"{ not json");
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
        assert!(result.unwrap_err().is_corrupt_record());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut record = sample();
        record.version = 99;
        let bytes = serde_json::to_vec(&record).unwrap();
        assert!(matches!(
            ChunkRecord::from_json(&bytes),
            Err(StoreError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_coordinate_mismatch_rejected() {
        let bytes = sample().to_json().unwrap();
        let result = ChunkRecord::from_json_for(&bytes, ChunkCoord::new(0, 0));
        assert!(matches!(
            result,
            Err(StoreError::CoordinateMismatch { found, .. }) if found == ChunkCoord::new(-3, 7)
        ));
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = br#"{"version":1,"coord":{"x":0,"y":0},"entries":[{"local":{"x":1,"y":1}}]}"#;
        let record = ChunkRecord::from_json(json).unwrap();
        assert_eq!(record.entries[0].terrain, None);
        assert_eq!(record.entries[0].feature, None);
    }
}
