//! Fixed-size square grid of cells: generation-or-restore, persistence and
//! teardown.
//!
//! A [`Chunk`] is built fully populated by [`Chunk::load`] and torn down by
//! [`Chunk::unload`]; there is no partially loaded state. Cells are always
//! visited in local order (`x` outer, `y` inner), so the event stream of a
//! load or unload is deterministic.

use tracing::{debug, warn};

use crate::catalog::{Catalog, FeatureId, TerrainId};
use crate::cell::Cell;
use crate::coords::{ChunkCoord, LocalCoord, WorldPos};
use crate::error::StoreError;
use crate::events::{EventSink, GridEvent};
use crate::generator::CellGenerator;
use crate::record::{ChunkRecord, RecordEntry};
use crate::store::ChunkStore;

/// Where a chunk's contents came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadSource {
    /// No record existed; every cell was generated.
    Generated,
    /// Cells were restored from a stored record (missing ones generated).
    Restored,
    /// The stored record was unusable and the chunk was regenerated.
    Recovered,
}

/// Services a chunk needs to load or unload.
#[derive(Clone, Copy)]
pub struct ChunkContext<'a> {
    /// Record storage.
    pub store: &'a dyn ChunkStore,
    /// Generator for cells without stored state.
    pub generator: &'a dyn CellGenerator,
    /// Name/id resolution.
    pub catalog: &'a Catalog,
}

/// A resident chunk.
#[derive(Clone, Debug)]
pub struct Chunk {
    coord: ChunkCoord,
    size: u32,
    cells: Vec<Cell>,
    source: LoadSource,
    loaded: bool,
}

/// Per-cell state recovered from a record.
#[derive(Clone, Copy, Default)]
struct Restored {
    present: bool,
    terrain: Option<TerrainId>,
    feature: Option<FeatureId>,
}

impl Chunk {
    /// Builds the chunk at `coord`, restoring from the store when a record
    /// exists and generating everything else.
    ///
    /// Each cell publishes one [`GridEvent::CellChanged`] per non-empty
    /// field and then one [`GridEvent::CellLoaded`]. Store failures never
    /// propagate: an unreadable record is logged and the chunk regenerated.
    ///
    /// `coord` must be representable for `size`
    /// ([`ChunkCoord::is_representable`]); the streamer never loads others.
    pub fn load<S: EventSink + ?Sized>(
        coord: ChunkCoord,
        size: u32,
        ctx: ChunkContext<'_>,
        sink: &mut S,
    ) -> Self {
        let volume = size as usize * size as usize;

        let (record, source) = match ctx.store.read(coord) {
            Ok(Some(record)) if record.coord != coord => {
                warn!(chunk = %coord, found = %record.coord, "chunk record describes another chunk, regenerating");
                (None, LoadSource::Recovered)
            }
            Ok(Some(record)) => (Some(record), LoadSource::Restored),
            Ok(None) => (None, LoadSource::Generated),
            Err(error) => {
                warn!(chunk = %coord, %error, "failed to read chunk record, regenerating");
                (None, LoadSource::Recovered)
            }
        };

        let mut restored = vec![Restored::default(); volume];
        if let Some(record) = &record {
            restore_entries(coord, size, record, ctx.catalog, &mut restored);
        }

        let mut cells = Vec::with_capacity(volume);
        for (index, restored) in restored.into_iter().enumerate() {
            let local = LocalCoord::from_index(index, size);
            let position = coord.world_of(local, size);
            let mut cell = Cell::new(position);

            let (terrain, feature) = if restored.present {
                let terrain = restored
                    .terrain
                    .or_else(|| generated_terrain(ctx, position));
                (terrain, restored.feature)
            } else {
                generated(ctx, position)
            };

            if let Some(terrain) = terrain {
                cell.set_terrain(terrain, sink);
            }
            if let Some(feature) = feature {
                cell.set_feature(feature, sink);
            }
            sink.publish(GridEvent::CellLoaded(cell));
            cells.push(cell);
        }

        debug!(chunk = %coord, ?source, "chunk loaded");

        Self {
            coord,
            size,
            cells,
            source,
            loaded: true,
        }
    }

    /// Saves the chunk and tears its cells down.
    ///
    /// The record is written first. Then, per cell in local order, the
    /// feature and terrain are cleared (publishing removals) and a
    /// [`GridEvent::CellUnloaded`] carrying the pre-teardown state is
    /// published. Teardown happens even if the write fails; the write error
    /// is returned afterwards.
    pub fn unload<S: EventSink + ?Sized>(
        &mut self,
        ctx: ChunkContext<'_>,
        sink: &mut S,
    ) -> Result<(), StoreError> {
        let result = ctx.store.write(self.to_record(ctx.catalog));
        if let Err(error) = &result {
            warn!(chunk = %self.coord, %error, "failed to save chunk record");
        }

        for cell in &mut self.cells {
            let snapshot = *cell;
            cell.clear_feature(sink);
            cell.clear_terrain(sink);
            sink.publish(GridEvent::CellUnloaded(snapshot));
        }
        self.loaded = false;

        debug!(chunk = %self.coord, "chunk unloaded");
        result
    }

    /// Serializes every non-empty cell by catalog name.
    pub fn to_record(&self, catalog: &Catalog) -> ChunkRecord {
        let mut record = ChunkRecord::new(self.coord);
        for (index, cell) in self.cells.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            let terrain = cell
                .terrain
                .and_then(|id| catalog.terrain(id))
                .map(|def| def.name.clone());
            let feature = cell
                .feature
                .and_then(|id| catalog.feature(id))
                .map(|def| def.name.clone());
            record.push(RecordEntry {
                local: LocalCoord::from_index(index, self.size),
                terrain,
                feature,
            });
        }
        record
    }

    /// Coordinate of this chunk.
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Cells per side.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// How the contents were obtained.
    pub fn source(&self) -> LoadSource {
        self.source
    }

    /// `true` from load until unload.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Cell at a local coordinate, `None` if out of range.
    pub fn cell(&self, local: LocalCoord) -> Option<&Cell> {
        if !local.in_bounds(self.size) {
            return None;
        }
        self.cells.get(local.index(self.size))
    }

    /// Mutable cell at a local coordinate, `None` if out of range.
    pub fn cell_mut(&mut self, local: LocalCoord) -> Option<&mut Cell> {
        if !local.in_bounds(self.size) {
            return None;
        }
        self.cells.get_mut(local.index(self.size))
    }

    /// Cell at a world position, `None` if another chunk owns it.
    pub fn cell_at(&self, position: WorldPos) -> Option<&Cell> {
        let (coord, local) = position.split(self.size);
        if coord != self.coord {
            return None;
        }
        self.cell(local)
    }

    /// All cells in local order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

/// Applies record entries onto the per-cell restore table.
fn restore_entries(
    coord: ChunkCoord,
    size: u32,
    record: &ChunkRecord,
    catalog: &Catalog,
    restored: &mut [Restored],
) {
    for entry in &record.entries {
        if !entry.local.in_bounds(size) {
            warn!(chunk = %coord, local = ?entry.local, "skipping out-of-range record entry");
            continue;
        }
        let slot = &mut restored[entry.local.index(size)];
        slot.present = true;

        slot.terrain = match entry.terrain.as_deref() {
            Some(name) => {
                let id = catalog.terrain_by_name(name);
                if id.is_none() {
                    warn!(chunk = %coord, local = ?entry.local, terrain = name, "unknown terrain in record, regenerating cell terrain");
                }
                id
            }
            None => None,
        };

        slot.feature = match entry.feature.as_deref() {
            Some(name) => {
                let id = catalog.feature_by_name(name);
                if id.is_none() {
                    warn!(chunk = %coord, local = ?entry.local, feature = name, "unknown feature in record, dropping it");
                }
                id
            }
            None => None,
        };
    }
}

fn generated(
    ctx: ChunkContext<'_>,
    position: WorldPos,
) -> (Option<TerrainId>, Option<FeatureId>) {
    let cell = ctx.generator.generate(position);
    (
        ctx.catalog.terrain_for(cell.terrain),
        cell.feature.and_then(|kind| ctx.catalog.feature_for(kind)),
    )
}

fn generated_terrain(ctx: ChunkContext<'_>, position: WorldPos) -> Option<TerrainId> {
    ctx.catalog
        .terrain_for(ctx.generator.generate(position).terrain)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
