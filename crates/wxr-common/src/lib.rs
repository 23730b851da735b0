//! Shared utilities for WXR: configuration, logging, error types.
//!
//! This crate provides common infrastructure used by the runtime core, the loader-facing
//! library and the command line tools.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;

pub use config::{DisplayLayout, RuntimeConfig, ViewMode};
pub use error::{Error, Result};

use std::fs::OpenOptions;
use std::sync::Mutex;

/// Environment variable naming a file that receives log output instead of stderr.
pub const LOG_FILE_ENV: &str = "WXR_LOG_FILE";

/// Initialize tracing with sensible defaults.
///
/// Log level is controlled by the `RUST_LOG` environment variable.
/// Defaults to `info` if not set.
pub fn init_tracing() {
    init_tracing_with_default("info");
}

/// Initialize tracing with a specific default level.
pub fn init_tracing_with_default(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Install a subscriber for a library hosted inside another process.
///
/// Does nothing if the host already installed a global subscriber. When `WXR_LOG_FILE`
/// is set, output is appended to that file without ANSI colors.
pub fn try_init_library_tracing(default_level: &str) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Some(path) = std::env::var_os(LOG_FILE_ENV) {
        if let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) {
            return tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .is_ok();
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
