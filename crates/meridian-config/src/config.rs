//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const APP_NAME: &str = "meridian";

/// Largest accepted chunk edge, in cells.
pub const MAX_CHUNK_SIZE: u32 = 1024;

/// Largest accepted load radius, in chunks.
pub const MAX_LOAD_RADIUS: u32 = 64;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Procedural generation settings.
    pub world: WorldConfig,
    /// Chunk streaming window settings.
    pub streaming: StreamingConfig,
    /// Chunk record storage settings.
    pub storage: StorageConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Octave settings for one noise channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoiseChannelConfig {
    /// Number of noise layers to accumulate.
    pub octaves: u32,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f64,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
}

/// How features (stations) are placed on freshly generated land.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum FeaturePlacementMode {
    /// Uniform draw from a thread-local RNG; differs between visits.
    #[default]
    Unseeded,
    /// Draw from an RNG derived from the world seed and cell position.
    Seeded,
}

/// Procedural generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// World seed.
    pub seed: i64,
    /// Horizontal noise scale in cells (larger = broader features).
    pub scale: f64,
    /// Elevation noise channel.
    pub elevation: NoiseChannelConfig,
    /// Moisture noise channel.
    pub moisture: NoiseChannelConfig,
    /// Normalized elevation below which a cell is ocean.
    pub sea_level: f64,
    /// Normalized moisture above which low land becomes water.
    pub river_threshold: f64,
    /// Normalized elevation below which wet land becomes water.
    pub lake_threshold: f64,
    /// Probability that a land cell receives a station.
    pub feature_probability: f64,
    /// Feature placement mode.
    pub feature_placement: FeaturePlacementMode,
}

/// Chunk streaming configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Cells per chunk side.
    pub chunk_size: u32,
    /// Chebyshev radius (in chunks) kept resident around the viewpoint.
    pub load_radius: u32,
}

/// Chunk record storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding chunk records. `None` uses the platform data directory.
    pub save_dir: Option<PathBuf>,
    /// Background save workers. `0` writes synchronously during `tick`.
    pub background_workers: usize,
    /// Bounded queue capacity per save worker.
    pub queue_capacity: usize,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Also write JSON logs to the log directory (debug builds only).
    pub log_to_file: bool,
}

// --- Default implementations ---

impl Default for NoiseChannelConfig {
    fn default() -> Self {
        Self {
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            scale: 100.0,
            elevation: NoiseChannelConfig::default(),
            moisture: NoiseChannelConfig {
                octaves: 2,
                ..NoiseChannelConfig::default()
            },
            sea_level: 0.5,
            river_threshold: 0.6,
            lake_threshold: 0.55,
            feature_probability: 0.1,
            feature_placement: FeaturePlacementMode::Unseeded,
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            load_radius: 2,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            save_dir: None,
            background_workers: 0,
            queue_capacity: 64,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: false,
        }
    }
}

/// Platform configuration directory (`<config>/meridian`), if the OS exposes one.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join(APP_NAME))
}

/// Platform directory for chunk records (`<data>/meridian/chunks`).
///
/// Falls back to a relative `chunks` directory when the OS has no data dir.
pub fn default_save_dir() -> PathBuf {
    dirs::data_dir()
        .map(|base| base.join(APP_NAME).join("chunks"))
        .unwrap_or_else(|| PathBuf::from("chunks"))
}

// --- Validation ---

fn unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is outside [0, 1]"),
        })
    }
}

fn noise_channel(field: &'static str, channel: &NoiseChannelConfig) -> Result<(), ConfigError> {
    if channel.octaves == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "octaves must be at least 1".to_string(),
        });
    }
    if !(channel.persistence.is_finite() && channel.persistence > 0.0) {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("persistence {} must be positive", channel.persistence),
        });
    }
    if !(channel.lacunarity.is_finite() && channel.lacunarity > 0.0) {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("lacunarity {} must be positive", channel.lacunarity),
        });
    }
    Ok(())
}

impl Config {
    /// Check every value against its accepted range.
    ///
    /// The engine refuses to start on an invalid config rather than stream
    /// an undefined window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let streaming = &self.streaming;
        if streaming.chunk_size == 0 || streaming.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::Invalid {
                field: "streaming.chunk_size",
                reason: format!(
                    "{} is outside [1, {MAX_CHUNK_SIZE}]",
                    streaming.chunk_size
                ),
            });
        }
        if streaming.load_radius > MAX_LOAD_RADIUS {
            return Err(ConfigError::Invalid {
                field: "streaming.load_radius",
                reason: format!(
                    "{} exceeds the maximum of {MAX_LOAD_RADIUS}",
                    streaming.load_radius
                ),
            });
        }

        let world = &self.world;
        if !(world.scale.is_finite() && world.scale > 0.0) {
            return Err(ConfigError::Invalid {
                field: "world.scale",
                reason: format!("{} must be positive", world.scale),
            });
        }
        noise_channel("world.elevation", &world.elevation)?;
        noise_channel("world.moisture", &world.moisture)?;
        unit_interval("world.sea_level", world.sea_level)?;
        unit_interval("world.river_threshold", world.river_threshold)?;
        unit_interval("world.lake_threshold", world.lake_threshold)?;
        unit_interval("world.feature_probability", world.feature_probability)?;

        if self.storage.background_workers > 0 && self.storage.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "storage.queue_capacity",
                reason: "must be at least 1 when background workers are enabled".to_string(),
            });
        }
        Ok(())
    }

    /// Directory for chunk records, resolving the platform default.
    pub fn save_dir(&self) -> PathBuf {
        self.storage
            .save_dir
            .clone()
            .unwrap_or_else(default_save_dir)
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
