//! Configuration system for Meridian.
//!
//! Generation, streaming, storage and logging settings persist to disk as a
//! RON file. Supports CLI overrides via clap, hot-reload detection, range
//! validation, and forward/backward compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, FeaturePlacementMode, NoiseChannelConfig, StorageConfig,
    StreamingConfig, WorldConfig, default_config_dir, default_save_dir,
};
pub use error::ConfigError;
