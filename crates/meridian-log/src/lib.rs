//! Structured logging for Meridian.
//!
//! Installs a `tracing` subscriber with console output (uptime timestamps,
//! module targets) and, in debug builds, an optional JSON log file for
//! post-mortem analysis of streaming sessions. The filter honours `RUST_LOG`
//! first and the config's `debug.log_level` second.

use meridian_config::Config;
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config supplies one.
pub const DEFAULT_FILTER: &str = "info";

/// File name of the JSON log written under the log directory.
pub const LOG_FILE_NAME: &str = "meridian.log";

/// Resolve the filter directive string from an optional config.
///
/// An empty `log_level` falls back to [`DEFAULT_FILTER`].
pub fn filter_directives(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => {
            config.debug.log_level.trim().to_string()
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Initialize the global tracing subscriber.
///
/// # Arguments
///
/// * `log_dir` - Directory for the JSON log file (only used when `debug_build`)
/// * `debug_build` - Whether file logging may be enabled
/// * `config` - Optional configuration supplying the log level
///
/// Calling this twice in one process is a no-op for the second call.
///
/// # Examples
///
/// ```no_run
/// use meridian_log::init_logging;
/// use meridian_config::Config;
///
/// let config = Config::default();
/// init_logging(None, false, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter_str = filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE_NAME))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        let _ = subscriber.with(file_layer).try_init();
        return;
    }

    let _ = subscriber.try_init();
}

/// Create an `EnvFilter` with the default filter string.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
