//! # Bossroom
//!
//! Headless runner for the boss room encounter.
//!
//! This binary ties together:
//! - Combat: the boss, the player and their projectiles
//! - A fixed-step clock driving the encounter
//! - Scene-session glue reacting to deaths
//! - Keyboard/mouse translation or a scripted autopilot

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod input;
mod session;
mod timing;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG: &str = "bossroom.toml";

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("bossroom=info".parse()?))
        .init();

    info!("Bossroom starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    app::run(&config_path)?;

    info!("Bossroom shutdown complete");
    Ok(())
}
