//! Chunked 2D grid: coordinates, catalog, cells, chunk persistence, and
//! viewpoint-driven streaming.

pub mod active_set;
pub mod catalog;
pub mod cell;
pub mod chunk;
pub mod coords;
pub mod error;
pub mod events;
pub mod generator;
pub mod record;
pub mod store;
pub mod streamer;
pub mod write_behind;

pub use active_set::{ActiveSet, Window};
pub use catalog::{
    Catalog, FeatureDef, FeatureId, FeatureKind, TerrainCategory, TerrainDef, TerrainId,
};
pub use cell::{Cell, CellChange, ChangeAction, ChangeKind};
pub use chunk::{Chunk, ChunkContext, LoadSource};
pub use coords::{ChunkCoord, LocalCoord, WorldPos};
pub use error::{GridError, StoreError};
pub use events::{ChannelObserver, EventSink, GridEvent, GridObserver, ObserverId, ObserverList};
pub use generator::{CellGenerator, GeneratedCell};
pub use record::{ChunkRecord, RECORD_VERSION, RecordEntry};
pub use store::{ChunkStore, FileStore, MemoryStore, SaveFailure};
pub use streamer::{
    ChunkStreamer, MAX_CHUNK_SIZE, MAX_LOAD_RADIUS, StreamerConfig, StreamerStats, TickReport,
};
pub use write_behind::{DEFAULT_QUEUE_CAPACITY, WriteBehindStore};
