//! # Pyre Sim
//!
//! Headless driver for the effect pools: loads the pool configuration,
//! runs a fixed-step frame loop that spawns fires on the ground and on
//! moving vehicles, and reports pool statistics.
//!
//! Usage: `pyre-sim [CONFIG_PATH] [SECONDS]`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use pyre_effects::{EffectPoolConfig, CONFIG_FILE};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Simulated seconds when none are given.
const DEFAULT_SECONDS: f32 = 30.0;

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("pyre_effects=info".parse()?)
                .add_directive("pyre_sim=info".parse()?),
        )
        .init();

    info!("Pyre sim starting (v{})", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let config_path = args.next().map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let seconds = match args.next() {
        Some(raw) => raw
            .parse::<f32>()
            .with_context(|| format!("invalid duration '{raw}'"))?,
        None => DEFAULT_SECONDS,
    };

    let config = EffectPoolConfig::load_from(&config_path);
    let report = scenario::run(&config, seconds, fastrand::u64(..));

    for line in report.lines() {
        info!("{line}");
    }
    info!("Pyre sim finished");
    Ok(())
}
