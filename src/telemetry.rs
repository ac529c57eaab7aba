//! Tracing subscriber setup.
//!
//! Structured diagnostics stay silent unless asked for: set
//! `DOCKERTOOLS_TRACING_FMT=1` or `RUST_LOG` to get a fmt layer on stderr.
//! The filter comes from `RUST_LOG` and defaults to `warn`.

use std::env;

use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

fn tracing_enabled_env() -> bool {
    let fmt = env::var("DOCKERTOOLS_TRACING_FMT").ok().as_deref() == Some("1");
    let rust_log = env::var("RUST_LOG")
        .ok()
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false);
    fmt || rust_log
}

/// Install the global subscriber once; returns whether one was installed.
pub fn telemetry_init() -> bool {
    if INIT.get().is_some() || !tracing_enabled_env() {
        return false;
    }
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(fmt_layer);
    if registry.try_init().is_err() {
        eprintln!("dockertools: tracing init skipped (global subscriber already set)");
        return false;
    }
    let _ = INIT.set(());
    true
}
