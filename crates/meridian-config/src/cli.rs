//! Command-line argument parsing for Meridian.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Meridian command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "meridian", about = "Meridian chunk streaming engine")]
pub struct CliArgs {
    /// World seed.
    #[arg(long)]
    pub seed: Option<i64>,

    /// Cells per chunk side.
    #[arg(long)]
    pub chunk_size: Option<u32>,

    /// Load radius in chunks.
    #[arg(long)]
    pub load_radius: Option<u32>,

    /// Directory for chunk records.
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Background save workers (0 = synchronous saves).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.world.seed = seed;
        }
        if let Some(size) = args.chunk_size {
            self.streaming.chunk_size = size;
        }
        if let Some(radius) = args.load_radius {
            self.streaming.load_radius = radius;
        }
        if let Some(ref dir) = args.save_dir {
            self.storage.save_dir = Some(dir.clone());
        }
        if let Some(workers) = args.workers {
            self.storage.background_workers = workers;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            seed: Some(42),
            load_radius: Some(1),
            save_dir: Some(PathBuf::from("/tmp/meridian")),
            ..CliArgs::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.world.seed, 42);
        assert_eq!(config.streaming.load_radius, 1);
        assert_eq!(config.save_dir(), PathBuf::from("/tmp/meridian"));
        // Non-overridden fields retain defaults
        assert_eq!(config.streaming.chunk_size, 100);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::try_parse_from([
            "meridian",
            "--seed=-7",
            "--chunk-size",
            "4",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.seed, Some(-7));
        assert_eq!(args.chunk_size, Some(4));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.load_radius.is_none());
    }
}
