//! Streaming against real stores: file-backed round trips and write-behind
//! re-entry.

use std::sync::{Arc, Mutex};

use meridian_grid::{
    Catalog, ChunkCoord, ChunkRecord, ChunkStore, ChunkStreamer, FeatureKind, FileStore,
    GeneratedCell, GridEvent, MemoryStore, StoreError, StreamerConfig, TerrainCategory, WorldPos,
    WriteBehindStore,
};

fn checkerboard(position: WorldPos) -> GeneratedCell {
    if (position.x + position.y).rem_euclid(2) == 0 {
        GeneratedCell::bare(TerrainCategory::Land)
    } else {
        GeneratedCell::bare(TerrainCategory::Ocean)
    }
}

fn config(chunk_size: u32, load_radius: u32) -> StreamerConfig {
    StreamerConfig {
        chunk_size,
        load_radius,
    }
}

#[test]
fn test_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(Catalog::standard());
    let station = catalog.feature_for(FeatureKind::Station).unwrap();
    let spot = WorldPos::new(-3, 2);

    {
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let mut streamer =
            ChunkStreamer::new(config(4, 1), store, Arc::new(checkerboard), catalog.clone())
                .unwrap();
        streamer.tick(WorldPos::new(0, 0));
        assert!(streamer.set_feature(spot, station));
        let report = streamer.shutdown().unwrap();
        assert_eq!(report.unloaded.len(), 9);
    }

    assert!(dir.path().join("chunk_-1_0.json").exists());

    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let mut streamer =
        ChunkStreamer::new(config(4, 1), store, Arc::new(checkerboard), catalog.clone()).unwrap();
    streamer.tick(WorldPos::new(0, 0));
    assert_eq!(streamer.get_cell(spot).unwrap().feature, Some(station));
    assert_eq!(streamer.stats().chunks_restored, 9);
}

#[test]
fn test_corrupt_file_is_regenerated() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("chunk_0_0.json"), b"{\"version\":").unwrap();

    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let mut streamer = ChunkStreamer::new(
        config(4, 0),
        store.clone(),
        Arc::new(checkerboard),
        Arc::new(Catalog::standard()),
    )
    .unwrap();
    streamer.tick(WorldPos::new(0, 0));

    assert_eq!(streamer.stats().chunks_recovered, 1);
    let land = streamer.catalog().terrain_for(TerrainCategory::Land);
    assert_eq!(streamer.get_cell(WorldPos::new(0, 0)).unwrap().terrain, land);

    // The next unload overwrites the corrupt file with a valid record.
    streamer.shutdown().unwrap();
    assert!(store.read(ChunkCoord::new(0, 0)).unwrap().is_some());
}

/// Store whose writes wait until the gate opens.
struct GatedStore {
    inner: MemoryStore,
    gate: Mutex<()>,
}

impl ChunkStore for GatedStore {
    fn read(&self, coord: ChunkCoord) -> Result<Option<ChunkRecord>, StoreError> {
        self.inner.read(coord)
    }

    fn write(&self, record: ChunkRecord) -> Result<(), StoreError> {
        let _open = self.gate.lock().unwrap();
        self.inner.write(record)
    }
}

#[test]
fn test_reentry_while_save_pending_restores_pending_state() {
    let gated = Arc::new(GatedStore {
        inner: MemoryStore::new(),
        gate: Mutex::new(()),
    });
    let write_behind = Arc::new(WriteBehindStore::new(gated.clone(), 2, 4).unwrap());
    let catalog = Arc::new(Catalog::standard());
    let station = catalog.feature_for(FeatureKind::Station).unwrap();
    let spot = WorldPos::new(1, 1);

    let mut streamer = ChunkStreamer::new(
        config(4, 0),
        write_behind.clone(),
        Arc::new(checkerboard),
        catalog,
    )
    .unwrap();

    streamer.tick(WorldPos::new(0, 0));
    assert!(streamer.set_feature(spot, station));

    let guard = gated.gate.lock().unwrap();
    streamer.tick(WorldPos::new(100, 0));
    assert!(write_behind.is_pending(ChunkCoord::new(0, 0)));

    // Back before the save landed: state comes from the pending record.
    streamer.tick(WorldPos::new(0, 0));
    assert_eq!(streamer.get_cell(spot).unwrap().feature, Some(station));
    drop(guard);

    streamer.shutdown().unwrap();
    let persisted = gated.inner.read(ChunkCoord::new(0, 0)).unwrap().unwrap();
    assert!(
        persisted
            .entries
            .iter()
            .any(|e| e.feature.as_deref() == Some("station"))
    );
}

#[test]
fn test_event_stream_balances_over_session() {
    let catalog = Arc::new(Catalog::standard());
    let mut streamer = ChunkStreamer::new(
        config(3, 1),
        Arc::new(MemoryStore::new()),
        Arc::new(checkerboard),
        catalog,
    )
    .unwrap();

    let tally = Arc::new(Mutex::new((0i64, 0i64)));
    let sink = Arc::clone(&tally);
    streamer.subscribe(move |event: &GridEvent| {
        let mut tally = sink.lock().unwrap();
        match event {
            GridEvent::CellLoaded(_) => tally.0 += 1,
            GridEvent::CellUnloaded(_) => tally.1 += 1,
            GridEvent::CellChanged(_) => {}
        }
    });

    for step in 0..20 {
        streamer.tick(WorldPos::new(step * 2, -step));
    }
    streamer.shutdown().unwrap();

    let (loaded, unloaded) = *tally.lock().unwrap();
    assert!(loaded > 0);
    assert_eq!(loaded, unloaded);
}
