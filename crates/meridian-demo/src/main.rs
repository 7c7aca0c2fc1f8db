//! Meridian demo: streams a procedurally generated world around a moving
//! viewpoint and persists chunk records between runs.

mod render;
mod tally;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use meridian_config::{
    CliArgs, Config, ConfigError, FeaturePlacementMode, NoiseChannelConfig, WorldConfig,
    default_config_dir,
};
use meridian_grid::{
    Catalog, ChannelObserver, ChunkStore, ChunkStreamer, FeatureKind, FileStore, GridError,
    StoreError, StreamerConfig, TerrainCategory, WorldPos, WriteBehindStore,
};
use meridian_terrain::{
    ClassifierParams, FeaturePlacement, NoiseParams, TerrainClassifier, TerrainError,
};
use tracing::{info, warn};

use crate::tally::EventTally;

/// Demo arguments: the engine flags plus the walk to perform.
#[derive(Parser, Debug)]
#[command(name = "meridian", about = "Meridian chunk streaming demo")]
struct DemoArgs {
    #[command(flatten)]
    engine: CliArgs,

    /// Number of streaming ticks to run.
    #[arg(long, default_value_t = 24)]
    ticks: u32,

    /// Cells the viewpoint moves per tick.
    #[arg(long, default_value_t = 37.0)]
    step: f64,

    /// Print the cells around the final viewpoint.
    #[arg(long)]
    ascii: bool,

    /// Place a station under the viewpoint every N ticks (0 disables).
    #[arg(long, default_value_t = 5)]
    build_every: u32,
}

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Terrain(#[from] TerrainError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn noise_params(channel: &NoiseChannelConfig) -> NoiseParams {
    NoiseParams {
        octaves: channel.octaves,
        persistence: channel.persistence,
        lacunarity: channel.lacunarity,
    }
}

fn classifier_params(world: &WorldConfig) -> ClassifierParams {
    ClassifierParams {
        seed: world.seed,
        scale: world.scale,
        elevation: noise_params(&world.elevation),
        moisture: noise_params(&world.moisture),
        sea_level: world.sea_level,
        river_threshold: world.river_threshold,
        lake_threshold: world.lake_threshold,
        feature_probability: world.feature_probability,
        feature_placement: match world.feature_placement {
            FeaturePlacementMode::Unseeded => FeaturePlacement::Unseeded,
            FeaturePlacementMode::Seeded => FeaturePlacement::Seeded,
        },
    }
}

/// Opens the record store, behind background save workers when configured.
fn open_store(config: &Config) -> Result<Arc<dyn ChunkStore>, StoreError> {
    let files = FileStore::open(config.save_dir())?;
    info!("Chunk records in {}", files.dir().display());
    let workers = config.storage.background_workers;
    if workers == 0 {
        return Ok(Arc::new(files));
    }
    let store = WriteBehindStore::new(Arc::new(files), workers, config.storage.queue_capacity)?;
    info!(workers = store.worker_count(), "Background saves enabled");
    Ok(Arc::new(store))
}

/// Viewpoint after `tick` steps: eastward drift with a slow north-south sway.
fn viewpoint(tick: u32, step: f64) -> (f64, f64) {
    let t = f64::from(tick);
    (t * step, (t * 0.35).sin() * step * 4.0)
}

fn run(args: &DemoArgs, config: &Config) -> Result<(), DemoError> {
    let catalog = Arc::new(Catalog::standard());
    let classifier = TerrainClassifier::new(classifier_params(&config.world))?;
    let store = open_store(config)?;

    let mut streamer = ChunkStreamer::new(
        StreamerConfig {
            chunk_size: config.streaming.chunk_size,
            load_radius: config.streaming.load_radius,
        },
        store,
        Arc::new(classifier),
        catalog.clone(),
    )?;

    let (observer, events) = ChannelObserver::unbounded();
    streamer.subscribe(observer);
    let mut tally = EventTally::default();

    let station = catalog.feature_for(FeatureKind::Station);
    let land = catalog.terrain_for(TerrainCategory::Land);
    let mut last = WorldPos::new(0, 0);

    for tick in 0..args.ticks {
        let (x, y) = viewpoint(tick, args.step);
        last = WorldPos::from_point(x, y);
        let report = streamer.tick(last);
        for failure in &report.save_failures {
            warn!(chunk = %failure.coord, "Save failed: {}", failure.error);
        }

        if args.build_every > 0 && tick % args.build_every == 0 {
            let on_land = streamer.get_cell(last).and_then(|c| c.terrain) == land;
            if on_land
                && let Some(station) = station
                && streamer.set_feature(last, station)
            {
                info!(x = last.x, y = last.y, "Built station");
            }
        }

        tally.extend(events.try_iter());
    }

    if args.ascii {
        let half = i64::from(config.streaming.chunk_size / 2).min(40);
        print!("{}", render::ascii_map(&streamer, last, half));
    }

    let report = streamer.shutdown()?;
    tally.extend(events.try_iter());
    for failure in &report.save_failures {
        warn!(chunk = %failure.coord, "Save failed during shutdown: {}", failure.error);
    }

    let stats = streamer.stats();
    info!(
        ticks = stats.ticks,
        generated = stats.chunks_generated,
        restored = stats.chunks_restored,
        recovered = stats.chunks_recovered,
        unloaded = stats.chunks_unloaded,
        save_failures = stats.save_failures,
        "Streaming finished"
    );
    info!(
        loaded = tally.cells_loaded,
        unloaded = tally.cells_unloaded,
        added = tally.added,
        removed = tally.removed,
        resident = tally.resident_cells(),
        "Grid events"
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = DemoArgs::parse();

    let config_dir = args
        .engine
        .config
        .clone()
        .or_else(default_config_dir)
        .unwrap_or_else(|| PathBuf::from("meridian"));

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Config error, using defaults: {e}");
        Config::default()
    });
    config.apply_cli_overrides(&args.engine);
    if let Err(e) = config.validate() {
        eprintln!("meridian: {e}");
        return ExitCode::FAILURE;
    }

    let log_dir = config_dir.join("logs");
    meridian_log::init_logging(
        Some(&log_dir),
        cfg!(debug_assertions) && config.debug.log_to_file,
        Some(&config),
    );

    info!(
        seed = config.world.seed,
        chunk_size = config.streaming.chunk_size,
        load_radius = config.streaming.load_radius,
        "Meridian starting"
    );

    match run(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("meridian: {e}");
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
