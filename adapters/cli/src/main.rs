#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs headless Awaking sessions.

mod session;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use awaking_core::{Command, TITLE};
use awaking_world::{apply, query, Tuning, World};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "awaking", about = "Headless driver for the Awaking simulation", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs a seeded session with a scripted player and prints a summary.
    Run(RunArgs),
    /// Prints the default tuning as TOML.
    Defaults,
}

#[derive(Args)]
struct RunArgs {
    /// Seed for the world's random source.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Number of frames to simulate.
    #[arg(long, default_value_t = 3_600)]
    ticks: u64,
    /// Simulated milliseconds per frame.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,
    /// TOML file overriding tuning knobs.
    #[arg(long)]
    tuning: Option<PathBuf>,
    /// Save record to resume from.
    #[arg(long)]
    resume: Option<PathBuf>,
    /// Where to write the save record after the run.
    #[arg(long)]
    save: Option<PathBuf>,
}

/// Entry point for the Awaking command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    match Cli::parse().command {
        Commands::Run(args) => run(args),
        Commands::Defaults => {
            let text = toml::to_string(&Tuning::default())
                .context("failed to serialize default tuning")?;
            print!("{text}");
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<()> {
    let tuning = match &args.tuning {
        Some(path) => session::load_tuning(path)?,
        None => Tuning::default(),
    };
    let mut world =
        World::with_tuning(tuning, args.seed).context("tuning rejected by the simulation")?;
    info!(title = TITLE, seed = args.seed, ticks = args.ticks, "starting session");

    if let Some(path) = &args.resume {
        let record = session::load_record(path)?;
        let mut events = Vec::new();
        apply(&mut world, Command::Restore { record }, &mut events);
        session::ensure_restored(&events)
            .with_context(|| format!("failed to resume from {}", path.display()))?;
    }

    let summary = session::drive(
        &mut world,
        args.ticks,
        Duration::from_millis(args.frame_ms.max(1)),
    );
    println!("{summary}");

    if let Some(path) = &args.save {
        session::write_record(path, &query::save_record(&world))?;
        info!(path = %path.display(), "save record written");
    }

    Ok(())
}
