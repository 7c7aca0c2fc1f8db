//! Viewpoint-driven chunk streaming.
//!
//! Each [`ChunkStreamer::tick`] computes the chunk containing the viewpoint
//! and the square window of chunks within `load_radius` of it (Chebyshev
//! distance). Resident chunks outside the window are saved and unloaded,
//! then every window chunk not yet resident is loaded. Both passes run in
//! ascending coordinate order and complete before `tick` returns, so callers
//! only ever observe a resident set equal to the window.
//!
//! At the ends of the `i64` range the window is clipped to chunks whose
//! cells are all representable.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::active_set::{ActiveSet, Window};
use crate::catalog::{Catalog, FeatureId, TerrainId};
use crate::cell::Cell;
use crate::chunk::{Chunk, ChunkContext, LoadSource};
use crate::coords::{ChunkCoord, WorldPos};
use crate::error::{GridError, StoreError};
use crate::events::{GridObserver, ObserverId, ObserverList};
use crate::generator::CellGenerator;
use crate::store::{ChunkStore, SaveFailure};

/// Largest supported chunk side, in cells.
pub const MAX_CHUNK_SIZE: u32 = 1024;

/// Largest supported load radius, in chunks.
pub const MAX_LOAD_RADIUS: u32 = 64;

/// Streaming parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamerConfig {
    /// Cells per chunk side.
    pub chunk_size: u32,
    /// Chebyshev radius of the resident window, in chunks.
    pub load_radius: u32,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            load_radius: 2,
        }
    }
}

impl StreamerConfig {
    /// Checks both parameters are within their supported ranges.
    pub fn validate(&self) -> Result<(), GridError> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(GridError::InvalidConfig {
                field: "chunk_size",
                reason: format!("must be in 1..={MAX_CHUNK_SIZE}, got {}", self.chunk_size),
            });
        }
        if self.load_radius > MAX_LOAD_RADIUS {
            return Err(GridError::InvalidConfig {
                field: "load_radius",
                reason: format!("must be at most {MAX_LOAD_RADIUS}, got {}", self.load_radius),
            });
        }
        Ok(())
    }
}

/// Outcome of one [`ChunkStreamer::tick`].
#[derive(Debug, Default)]
pub struct TickReport {
    /// Chunk containing the viewpoint.
    pub center: ChunkCoord,
    /// Chunks loaded this tick, ascending.
    pub loaded: Vec<ChunkCoord>,
    /// Chunks unloaded this tick, ascending.
    pub unloaded: Vec<ChunkCoord>,
    /// Saves that failed, including background saves finished since the
    /// previous tick.
    pub save_failures: Vec<SaveFailure>,
}

impl TickReport {
    /// Whether the tick changed nothing.
    pub fn is_noop(&self) -> bool {
        self.loaded.is_empty() && self.unloaded.is_empty() && self.save_failures.is_empty()
    }
}

/// Counters accumulated over the streamer's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamerStats {
    /// Ticks processed.
    pub ticks: u64,
    /// Chunks loaded (any source).
    pub chunks_loaded: u64,
    /// Chunks unloaded.
    pub chunks_unloaded: u64,
    /// Chunks generated from scratch.
    pub chunks_generated: u64,
    /// Chunks restored from a record.
    pub chunks_restored: u64,
    /// Chunks regenerated because their record was unusable.
    pub chunks_recovered: u64,
    /// Failed saves reported.
    pub save_failures: u64,
}

/// Owns the resident chunks and keeps them matched to the viewpoint.
pub struct ChunkStreamer {
    config: StreamerConfig,
    active: ActiveSet,
    store: Arc<dyn ChunkStore>,
    generator: Arc<dyn CellGenerator>,
    catalog: Arc<Catalog>,
    observers: ObserverList,
    center: Option<ChunkCoord>,
    stats: StreamerStats,
}

impl ChunkStreamer {
    /// Creates a streamer with nothing resident.
    ///
    /// # Errors
    ///
    /// [`GridError::InvalidConfig`] if `config` fails validation.
    pub fn new(
        config: StreamerConfig,
        store: Arc<dyn ChunkStore>,
        generator: Arc<dyn CellGenerator>,
        catalog: Arc<Catalog>,
    ) -> Result<Self, GridError> {
        config.validate()?;
        Ok(Self {
            config,
            active: ActiveSet::new(),
            store,
            generator,
            catalog,
            observers: ObserverList::new(),
            center: None,
            stats: StreamerStats::default(),
        })
    }

    /// Moves the viewpoint and brings the resident set in line with the
    /// window around it.
    pub fn tick(&mut self, viewpoint: WorldPos) -> TickReport {
        let size = self.config.chunk_size;
        let center = ChunkCoord::containing(viewpoint, size);
        let window = Window::new(center, self.config.load_radius, size);
        let mut report = TickReport {
            center,
            ..TickReport::default()
        };

        let ctx = ChunkContext {
            store: self.store.as_ref(),
            generator: self.generator.as_ref(),
            catalog: self.catalog.as_ref(),
        };

        for coord in self.active.outside(&window) {
            let Some(mut chunk) = self.active.remove(coord) else {
                continue;
            };
            if let Err(error) = chunk.unload(ctx, &mut self.observers) {
                report.save_failures.push(SaveFailure { coord, error });
            }
            report.unloaded.push(coord);
        }

        for coord in window.coords() {
            if self.active.contains(coord) {
                continue;
            }
            let chunk = Chunk::load(coord, size, ctx, &mut self.observers);
            match chunk.source() {
                LoadSource::Generated => self.stats.chunks_generated += 1,
                LoadSource::Restored => self.stats.chunks_restored += 1,
                LoadSource::Recovered => self.stats.chunks_recovered += 1,
            }
            if self.active.insert(chunk).is_err() {
                warn!(chunk = %coord, "chunk already resident, discarding duplicate load");
                continue;
            }
            report.loaded.push(coord);
        }

        report.save_failures.extend(self.store.take_failures());

        self.stats.ticks += 1;
        self.stats.chunks_loaded += report.loaded.len() as u64;
        self.stats.chunks_unloaded += report.unloaded.len() as u64;
        self.stats.save_failures += report.save_failures.len() as u64;

        if self.center != Some(center) {
            debug!(center = %center, "viewpoint entered new chunk");
        }
        self.center = Some(center);

        if !report.is_noop() {
            info!(
                center = %center,
                loaded = report.loaded.len(),
                unloaded = report.unloaded.len(),
                save_failures = report.save_failures.len(),
                resident = self.active.len(),
                "streaming tick"
            );
        }

        report
    }

    /// [`tick`](Self::tick) with a continuous position, floored to the grid.
    pub fn tick_at(&mut self, x: f64, y: f64) -> TickReport {
        self.tick(WorldPos::from_point(x, y))
    }

    /// Saves and unloads every resident chunk, then flushes the store.
    ///
    /// # Errors
    ///
    /// Returns the store's flush error. Individual save failures are in the
    /// report instead.
    pub fn shutdown(&mut self) -> Result<TickReport, StoreError> {
        let mut report = TickReport {
            center: self.center.unwrap_or_default(),
            ..TickReport::default()
        };
        let ctx = ChunkContext {
            store: self.store.as_ref(),
            generator: self.generator.as_ref(),
            catalog: self.catalog.as_ref(),
        };

        for coord in self.active.sorted_coords() {
            let Some(mut chunk) = self.active.remove(coord) else {
                continue;
            };
            if let Err(error) = chunk.unload(ctx, &mut self.observers) {
                report.save_failures.push(SaveFailure { coord, error });
            }
            report.unloaded.push(coord);
        }

        self.store.flush()?;
        report.save_failures.extend(self.store.take_failures());

        self.stats.chunks_unloaded += report.unloaded.len() as u64;
        self.stats.save_failures += report.save_failures.len() as u64;
        self.center = None;

        info!(
            unloaded = report.unloaded.len(),
            save_failures = report.save_failures.len(),
            "streamer shut down"
        );
        Ok(report)
    }

    /// Cell at `position` if its chunk is resident. Never generates.
    pub fn get_cell(&self, position: WorldPos) -> Option<&Cell> {
        let (coord, local) = position.split(self.config.chunk_size);
        self.active.get(coord)?.cell(local)
    }

    /// Places a feature on a resident cell.
    ///
    /// Returns `false` if the chunk is not resident or the cell already
    /// holds `feature`.
    pub fn set_feature(&mut self, position: WorldPos, feature: FeatureId) -> bool {
        let Some(cell) = resident_cell(&mut self.active, self.config.chunk_size, position) else {
            return false;
        };
        cell.set_feature(feature, &mut self.observers)
    }

    /// Removes the feature from a resident cell. Returns `false` if there
    /// was nothing to remove.
    pub fn clear_feature(&mut self, position: WorldPos) -> bool {
        let Some(cell) = resident_cell(&mut self.active, self.config.chunk_size, position) else {
            return false;
        };
        cell.clear_feature(&mut self.observers)
    }

    /// Replaces the terrain of a resident cell.
    ///
    /// Resident cells always carry terrain, so there is no matching clear.
    pub fn set_terrain(&mut self, position: WorldPos, terrain: TerrainId) -> bool {
        let Some(cell) = resident_cell(&mut self.active, self.config.chunk_size, position) else {
            return false;
        };
        cell.set_terrain(terrain, &mut self.observers)
    }

    /// Registers an observer for all subsequent grid events.
    pub fn subscribe(&mut self, observer: impl GridObserver + 'static) -> ObserverId {
        self.observers.subscribe(observer)
    }

    /// Unregisters an observer. Returns `false` if `id` is unknown.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Resident chunk at `coord`.
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.active.get(coord)
    }

    /// Whether `coord` is resident.
    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.active.contains(coord)
    }

    /// Number of resident chunks.
    pub fn loaded_count(&self) -> usize {
        self.active.len()
    }

    /// Resident coordinates, ascending.
    pub fn loaded_coords(&self) -> Vec<ChunkCoord> {
        self.active.sorted_coords()
    }

    /// Chunk containing the last viewpoint, if any tick ran.
    pub fn center(&self) -> Option<ChunkCoord> {
        self.center
    }

    /// Current resident window, if any tick ran.
    pub fn window(&self) -> Option<Window> {
        self.center
            .map(|center| Window::new(center, self.config.load_radius, self.config.chunk_size))
    }

    /// Streaming parameters.
    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    /// Shared catalog.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Lifetime counters.
    pub fn stats(&self) -> StreamerStats {
        self.stats
    }
}

fn resident_cell(active: &mut ActiveSet, chunk_size: u32, position: WorldPos) -> Option<&mut Cell> {
    let (coord, local) = position.split(chunk_size);
    active.get_mut(coord)?.cell_mut(local)
}

impl std::fmt::Debug for ChunkStreamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStreamer")
            .field("config", &self.config)
            .field("center", &self.center)
            .field("resident", &self.active.len())
            .field("observers", &self.observers)
            .field("stats", &self.stats)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::catalog::{FeatureKind, TerrainCategory};
    use crate::cell::{ChangeAction, ChangeKind};
    use crate::events::GridEvent;
    use crate::generator::GeneratedCell;
    use crate::store::MemoryStore;

    fn land(_: WorldPos) -> GeneratedCell {
        GeneratedCell::bare(TerrainCategory::Land)
    }

    fn streamer(chunk_size: u32, load_radius: u32) -> (ChunkStreamer, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let streamer = ChunkStreamer::new(
            StreamerConfig {
                chunk_size,
                load_radius,
            },
            store.clone(),
            Arc::new(land),
            Arc::new(Catalog::standard()),
        )
        .unwrap();
        (streamer, store)
    }

    fn window_set(center: ChunkCoord, radius: u32) -> Vec<ChunkCoord> {
        Window::new(center, radius, 4).coords().collect()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let store: Arc<dyn ChunkStore> = Arc::new(MemoryStore::new());
        for (chunk_size, load_radius, field) in [
            (0, 1, "chunk_size"),
            (MAX_CHUNK_SIZE + 1, 1, "chunk_size"),
            (4, MAX_LOAD_RADIUS + 1, "load_radius"),
        ] {
            let result = ChunkStreamer::new(
                StreamerConfig {
                    chunk_size,
                    load_radius,
                },
                store.clone(),
                Arc::new(land),
                Arc::new(Catalog::standard()),
            );
            match result {
                Err(GridError::InvalidConfig { field: f, .. }) => assert_eq!(f, field),
                other => panic!("expected InvalidConfig, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_first_tick_loads_window() {
        let (mut streamer, _) = streamer(4, 1);
        let report = streamer.tick(WorldPos::new(0, 0));
        assert_eq!(report.center, ChunkCoord::new(0, 0));
        assert_eq!(report.loaded, window_set(ChunkCoord::new(0, 0), 1));
        assert!(report.unloaded.is_empty());
        assert_eq!(streamer.loaded_count(), 9);
    }

    #[test]
    fn test_same_viewpoint_twice_is_noop() {
        let (mut streamer, _) = streamer(4, 1);
        streamer.tick(WorldPos::new(1, 1));
        let report = streamer.tick(WorldPos::new(2, 3));
        assert!(report.is_noop());
        assert_eq!(streamer.stats().ticks, 2);
        assert_eq!(streamer.stats().chunks_loaded, 9);
    }

    #[test]
    fn test_move_unloads_before_loading() {
        let (mut streamer, store) = streamer(4, 1);
        streamer.tick(WorldPos::new(0, 0));
        let report = streamer.tick(WorldPos::new(10, 0));

        assert_eq!(report.center, ChunkCoord::new(2, 0));
        assert_eq!(
            report.unloaded,
            vec![
                ChunkCoord::new(-1, -1),
                ChunkCoord::new(-1, 0),
                ChunkCoord::new(-1, 1),
                ChunkCoord::new(0, -1),
                ChunkCoord::new(0, 0),
                ChunkCoord::new(0, 1),
            ]
        );
        assert_eq!(
            report.loaded,
            vec![
                ChunkCoord::new(2, -1),
                ChunkCoord::new(2, 0),
                ChunkCoord::new(2, 1),
                ChunkCoord::new(3, -1),
                ChunkCoord::new(3, 0),
                ChunkCoord::new(3, 1),
            ]
        );
        assert_eq!(streamer.loaded_coords(), window_set(ChunkCoord::new(2, 0), 1));
        assert_eq!(store.len(), 6);
    }

    #[test]
    fn test_zero_radius_keeps_one_chunk() {
        let (mut streamer, _) = streamer(8, 0);
        streamer.tick(WorldPos::new(-1, -1));
        assert_eq!(streamer.loaded_coords(), vec![ChunkCoord::new(-1, -1)]);
        streamer.tick(WorldPos::new(100, 100));
        assert_eq!(streamer.loaded_coords(), vec![ChunkCoord::new(12, 12)]);
    }

    #[test]
    fn test_get_cell_never_generates() {
        let (mut streamer, _) = streamer(4, 0);
        assert!(streamer.get_cell(WorldPos::new(0, 0)).is_none());
        streamer.tick(WorldPos::new(0, 0));
        assert!(streamer.get_cell(WorldPos::new(3, 3)).is_some());
        assert!(streamer.get_cell(WorldPos::new(4, 0)).is_none());
        assert_eq!(streamer.loaded_count(), 1);
    }

    #[test]
    fn test_tick_at_floors_camera_position() {
        let (mut streamer, _) = streamer(4, 0);
        let report = streamer.tick_at(-0.5, 3.99);
        assert_eq!(report.center, ChunkCoord::new(-1, 0));
    }

    #[test]
    fn test_feature_edits_publish_and_persist() {
        let (mut streamer, _) = streamer(4, 0);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        streamer.subscribe(move |event: &GridEvent| sink.lock().unwrap().push(*event));

        streamer.tick(WorldPos::new(0, 0));
        events.lock().unwrap().clear();

        let station = streamer.catalog().feature_for(FeatureKind::Station).unwrap();
        let spot = WorldPos::new(2, 1);
        assert!(streamer.set_feature(spot, station));
        assert!(!streamer.set_feature(spot, station));
        assert!(!streamer.set_feature(WorldPos::new(50, 50), station));
        assert_eq!(
            *events.lock().unwrap(),
            vec![GridEvent::CellChanged(crate::cell::CellChange {
                position: spot,
                kind: ChangeKind::Feature(station),
                action: ChangeAction::Added,
            })]
        );

        // Leave and come back: the station survives.
        streamer.tick(WorldPos::new(40, 0));
        assert!(streamer.get_cell(spot).is_none());
        streamer.tick(WorldPos::new(0, 0));
        assert_eq!(streamer.get_cell(spot).unwrap().feature, Some(station));
        assert_eq!(streamer.stats().chunks_restored, 1);

        assert!(streamer.clear_feature(spot));
        assert!(!streamer.clear_feature(spot));
    }

    #[test]
    fn test_terrain_edits_survive_reload() {
        let (mut streamer, _) = streamer(4, 0);
        streamer.tick(WorldPos::new(0, 0));
        let water = streamer.catalog().terrain_by_name("water").unwrap();
        let station = streamer.catalog().feature_by_name("station").unwrap();
        let pos = WorldPos::new(1, 1);

        assert!(streamer.set_terrain(pos, water));
        assert!(!streamer.set_terrain(pos, water));
        assert!(streamer.set_feature(pos, station));
        let before = *streamer.get_cell(pos).unwrap();
        assert_eq!(before.terrain, Some(water));

        streamer.tick(WorldPos::new(100, 0));
        assert!(streamer.get_cell(pos).is_none());
        assert!(!streamer.set_terrain(pos, water));
        streamer.tick(WorldPos::new(0, 0));

        assert_eq!(streamer.get_cell(pos), Some(&before));
        let chunk = streamer.chunk(ChunkCoord::new(0, 0)).unwrap();
        assert!(chunk.cells().iter().all(|c| c.terrain.is_some()));
    }

    #[test]
    fn test_tick_at_i64_edges_clips_window() {
        let (mut streamer, _) = streamer(4, 1);

        let report = streamer.tick(WorldPos::new(i64::MAX, 0));
        assert_eq!(report.loaded.len(), 6);
        assert!(report.loaded.iter().all(|c| c.is_representable(4)));
        let cell = streamer.get_cell(WorldPos::new(i64::MAX, 0)).unwrap();
        assert_eq!(cell.position, WorldPos::new(i64::MAX, 0));
        assert_eq!(streamer.window().unwrap().len(), streamer.loaded_count());

        let report = streamer.tick(WorldPos::new(i64::MIN, i64::MIN));
        assert_eq!(report.unloaded.len(), 6);
        assert_eq!(report.loaded.len(), 4);
        let cell = streamer.get_cell(WorldPos::new(i64::MIN, i64::MIN)).unwrap();
        assert_eq!(cell.position, WorldPos::new(i64::MIN, i64::MIN));
        let window: Vec<_> = streamer.window().unwrap().coords().collect();
        assert_eq!(streamer.loaded_coords(), window);
    }

    #[test]
    fn test_unrepresentable_center_chunk_is_skipped() {
        let (mut streamer, _) = streamer(3, 1);
        let report = streamer.tick(WorldPos::new(i64::MIN, 0));

        // The chunk holding i64::MIN would start below it for size 3.
        assert_eq!(report.loaded.len(), 3);
        assert!(!streamer.is_loaded(report.center));
        assert!(streamer.get_cell(WorldPos::new(i64::MIN, 0)).is_none());
        assert!(streamer.get_cell(WorldPos::new(i64::MIN + 1, 0)).is_none());
        let nearest = WorldPos::new(i64::MIN + 2, 0);
        assert_eq!(streamer.get_cell(nearest).unwrap().position, nearest);
    }

    #[test]
    fn test_unsubscribed_observer_is_silent() {
        let (mut streamer, _) = streamer(2, 0);
        let count = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&count);
        let id = streamer.subscribe(move |_: &GridEvent| *counter.lock().unwrap() += 1);
        streamer.tick(WorldPos::new(0, 0));
        let after_first = *count.lock().unwrap();
        assert!(after_first > 0);

        assert!(streamer.unsubscribe(id));
        streamer.tick(WorldPos::new(100, 0));
        assert_eq!(*count.lock().unwrap(), after_first);
    }

    #[test]
    fn test_shutdown_saves_everything() {
        let (mut streamer, store) = streamer(4, 1);
        streamer.tick(WorldPos::new(0, 0));
        let report = streamer.shutdown().unwrap();
        assert_eq!(report.unloaded.len(), 9);
        assert!(report.save_failures.is_empty());
        assert_eq!(streamer.loaded_count(), 0);
        assert_eq!(store.len(), 9);
        assert!(streamer.center().is_none());
    }

    #[test]
    fn test_save_failures_are_reported() {
        struct BrokenStore;
        impl ChunkStore for BrokenStore {
            fn read(&self, _: ChunkCoord) -> Result<Option<crate::record::ChunkRecord>, StoreError> {
                Ok(None)
            }
            fn write(&self, _: crate::record::ChunkRecord) -> Result<(), StoreError> {
                Err(StoreError::WorkerGone)
            }
        }

        let mut streamer = ChunkStreamer::new(
            StreamerConfig {
                chunk_size: 2,
                load_radius: 0,
            },
            Arc::new(BrokenStore),
            Arc::new(land),
            Arc::new(Catalog::standard()),
        )
        .unwrap();
        streamer.tick(WorldPos::new(0, 0));
        let report = streamer.tick(WorldPos::new(10, 0));

        assert_eq!(report.unloaded, vec![ChunkCoord::new(0, 0)]);
        assert_eq!(report.save_failures.len(), 1);
        assert_eq!(report.save_failures[0].coord, ChunkCoord::new(0, 0));
        assert!(!streamer.is_loaded(ChunkCoord::new(0, 0)));
        assert_eq!(streamer.stats().save_failures, 1);
    }
}
