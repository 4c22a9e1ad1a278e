//! Structured logging for Orbis.
//!
//! Console output with uptime timestamps and module paths, plus JSON file
//! logging in debug builds. The configured `debug.log_level` is the default
//! filter and `RUST_LOG` overrides it.

use orbis_config::Config;
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names one.
pub const DEFAULT_FILTER: &str = "info";

/// Name of the JSON log file written in debug builds.
pub const LOG_FILE_NAME: &str = "orbis.log";

/// Resolve the filter directive string from the optional config.
#[must_use]
pub fn filter_directives(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.is_empty() => config.debug.log_level.clone(),
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Install the global tracing subscriber.
///
/// `debug_build` turns on the JSON file layer, written to
/// `log_dir/orbis.log` when a directory is given and can be created. The
/// filter comes from `RUST_LOG`, else from [`filter_directives`].
///
/// # Examples
///
/// ```no_run
/// use orbis_config::Config;
/// use orbis_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), true, Some(&config));
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

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_without_config() {
        assert_eq!(filter_directives(None), "info");
    }

    #[test]
    fn test_config_log_level_used() {
        let mut config = Config::default();
        config.debug.log_level = "debug,orbis_lod=trace".to_string();
        let directives = filter_directives(Some(&config));
        assert_eq!(directives, "debug,orbis_lod=trace");
        let filter = EnvFilter::new(&directives);
        assert!(format!("{filter}").contains("orbis_lod=trace"));
    }

    #[test]
    fn test_empty_config_level_falls_back() {
        let mut config = Config::default();
        config.debug.log_level.clear();
        assert_eq!(filter_directives(Some(&config)), DEFAULT_FILTER);
    }

    #[test]
    fn test_env_filter_parsing() {
        for filter_str in ["info", "debug,orbis_tiles=trace", "warn,orbis_lod=debug", "error"] {
            assert!(
                EnvFilter::try_from(filter_str).is_ok(),
                "Failed to parse filter: {filter_str}"
            );
        }
    }
}
