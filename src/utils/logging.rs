//! Logging setup
//!
//! Console logging via env_logger, with an optional log file sink.

use std::env;
use std::fs::{create_dir_all, OpenOptions};
use std::path::Path;

use env_logger::{Builder, Target};
use log::LevelFilter;

use crate::config::LoggingConfig;
use crate::error::TradingError;

/// Initialize the logging system. `RUST_LOG` overrides the configured level;
/// when `file_path` is set all output is appended there instead of stderr.
pub fn init(config: &LoggingConfig) -> Result<(), TradingError> {
    let level = env::var("RUST_LOG").unwrap_or_else(|_| config.level.clone());

    let level_filter = match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };

    let mut builder = Builder::from_default_env();
    builder.filter_level(level_filter).format_timestamp_millis();

    if let Some(file_path) = &config.file_path {
        if let Some(parent) = Path::new(file_path).parent() {
            create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(file_path)?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.init();
    log::info!("Logging initialized at level {}", level);
    Ok(())
}
