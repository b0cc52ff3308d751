mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "defringe", about = "Fringe modeling and removal for narrow-band CCD images")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show FITS header and provenance of an image or model
    Info(commands::info::InfoArgs),
    /// Build a fringe model from a folder of exposures
    Model(commands::model::ModelArgs),
    /// Subtract a fringe model from one image or a folder
    Remove(commands::remove::RemoveArgs),
    /// Print a default configuration as TOML
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Model(args) => commands::model::run(args),
        Commands::Remove(args) => commands::remove::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
