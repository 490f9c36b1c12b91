//! Argument grammar. Exercises the engine end-to-end; this is not a
//! feature-complete front end (spec §9.2 scopes full CLI parsing out).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ppm", version, about = "Non-root prefix package manager")]
pub struct Cli {
    /// Prefix root to operate on.
    #[arg(long, global = true, default_value = ".")]
    pub prefix: PathBuf,

    /// Assume "yes" to every confirmation prompt.
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install one or more packages by name.
    Install { names: Vec<String> },
    /// Remove one or more installed packages, and their now-unneeded dependents.
    Remove { names: Vec<String> },
    /// Upgrade one or more installed packages to the newest candidate.
    Upgrade { names: Vec<String> },
    /// Remove every installed package that is not manually-installed and
    /// has no remaining reverse dependency.
    Autoremove,
    /// List every package currently installed in the prefix.
    List,
    /// Search the configured repositories by name/description substring.
    Search { query: String },
    /// Show the newest known record for a package name.
    Show { name: String },
    /// List installed packages that declare a dependency on `name`.
    Rdepends { name: String },
    /// Recompute and verify every installed file's hash.
    CheckIntegrity {
        /// Limit the check to a single package name.
        name: Option<String>,
    },
    /// Reinstall every package `check-integrity` reported as broken.
    FixBroken { names: Vec<String> },
    /// Download a package's archive into the cache without installing it.
    Download { name: String },
}
