//! Error types for the grid crate.

use std::path::PathBuf;

use crate::coords::ChunkCoord;

/// Errors raised while building grid services.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// A streaming or chunk parameter is out of its supported range.
    #[error("invalid grid configuration `{field}`: {reason}")]
    InvalidConfig {
        /// Name of the offending parameter.
        field: &'static str,
        /// Human-readable description of the constraint.
        reason: String,
    },
    /// A catalog definition reuses a name already registered.
    #[error("duplicate {kind} name in catalog: {name}")]
    DuplicateName {
        /// Which table the name collided in ("terrain" or "feature").
        kind: &'static str,
        /// The colliding name.
        name: String,
    },
    /// All `u16` ids of a catalog table are in use.
    #[error("{0} catalog is full")]
    CatalogFull(&'static str),
}

/// Errors raised by chunk record stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading, writing or renaming a record file failed.
    #[error("chunk store I/O error at {path}: {source}")]
    Io {
        /// File or directory the operation targeted.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// The stored bytes are not a valid chunk record.
    #[error("corrupt chunk record: {0}")]
    Corrupt(#[source] serde_json::Error),
    /// A record could not be encoded.
    #[error("failed to encode chunk record: {0}")]
    Encode(#[source] serde_json::Error),
    /// The record was written by an incompatible format version.
    #[error("unsupported chunk record version: {0}")]
    UnsupportedVersion(u32),
    /// The record stored under one coordinate describes another chunk.
    #[error("record stored for chunk {expected} describes chunk {found}")]
    CoordinateMismatch {
        /// Coordinate the record was looked up by.
        expected: ChunkCoord,
        /// Coordinate written inside the record.
        found: ChunkCoord,
    },
    /// A background save worker thread could not be started.
    #[error("failed to spawn chunk save worker: {0}")]
    Spawn(#[source] std::io::Error),
    /// The background save workers have shut down.
    #[error("chunk save worker is no longer running")]
    WorkerGone,
}

impl StoreError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error means the stored record is unusable (as opposed to
    /// the store itself failing).
    pub fn is_corrupt_record(&self) -> bool {
        matches!(
            self,
            Self::Corrupt(_) | Self::UnsupportedVersion(_) | Self::CoordinateMismatch { .. }
        )
    }
}
