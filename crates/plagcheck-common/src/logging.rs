//! Structured logging setup, shared by every service's `main` (§6.2).
//!
//! Grounded on `examples/arkCyber-Matrixon/src/main.rs`'s
//! `tracing_subscriber::prelude::*` + `EnvFilter` setup, and on the emoji
//! house style used throughout `matrixon-db::pool`/`matrixon-core::config`
//! (`🚀`, `✅`, `⚠️`, `❌`) for startup/shutdown milestones.

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global `tracing` subscriber. Call once, first thing in `main`.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let builder = fmt().with_env_filter(filter).with_ansi(!config.no_color);

    if config.pretty {
        builder.pretty().init();
    } else {
        builder.json().flatten_event(true).init();
    }
}
