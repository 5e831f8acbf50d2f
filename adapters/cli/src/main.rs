#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays an Escape level headlessly.

mod script;
mod session;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use escape_world::LevelConfig;
use tracing_subscriber::EnvFilter;

use crate::session::Session;

#[derive(Debug, Parser)]
#[command(name = "escape")]
#[command(about = "Runs an Escape level without a window and reports how it ended")]
struct Args {
    /// TOML level description to load.
    level: PathBuf,

    /// Maximum number of ticks to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Length of a single tick in milliseconds.
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Target actions, one per tick: n/e/s/w walk, N/E/S/W exit, f fire,
    /// c collect, b barricade, u unlock, . wait; a trailing count repeats.
    #[arg(long, default_value = "")]
    script: String,

    /// Tracing filter directives, overriding RUST_LOG.
    #[arg(long)]
    log: Option<String>,
}

/// Entry point for the Escape command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log.as_deref())?;
    ensure!(args.tick_ms > 0, "tick length must be at least one millisecond");

    let text = fs::read_to_string(&args.level)
        .with_context(|| format!("failed to read level {}", args.level.display()))?;
    let level = LevelConfig::from_toml(&text)
        .with_context(|| format!("failed to parse level {}", args.level.display()))?;
    let script = script::parse(&args.script).context("invalid --script")?;
    let mut session = Session::new(&level)
        .with_context(|| format!("level {} is not playable", args.level.display()))?;

    let report = session.run(args.ticks, Duration::from_millis(args.tick_ms), &script);
    println!("{report}");
    Ok(())
}

fn init_tracing(directives: Option<&str>) -> Result<()> {
    let filter = match directives {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter {directives:?}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
