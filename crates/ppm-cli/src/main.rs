//! Entry point: parse arguments, load configuration, wire up the
//! engine, dispatch to a command. Kept deliberately thin; every real
//! decision lives in the engine crates this binary only wires
//! together.

mod cli;
mod commands;
mod engine;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use engine::Engine;
use ppm_config::{CliOverrides, ConfigLoader};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let prefix_root = cli
        .prefix
        .canonicalize()
        .with_context(|| format!("resolving prefix path {}", cli.prefix.display()))?;

    let overrides = CliOverrides {
        cache_dir: None,
        assume_yes: cli.yes,
    };
    let config = ConfigLoader::new(prefix_root)
        .load_with_overrides(&overrides)
        .context("loading prefix configuration")?;

    let assume_yes = config.assume_yes;
    let mut engine = Engine::load(config).context("initializing engine")?;
    commands::run(&mut engine, cli.command, assume_yes)
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
