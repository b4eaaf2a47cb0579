//! Patchrome CLI - inspect, validate and render effect graph descriptions.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "patchrome")]
#[command(author, version, about = "Patchrome effect graph CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered block processors and their parameters
    Processors(commands::processors::ProcessorsArgs),

    /// Check a graph description for structural problems
    Validate(commands::validate::ValidateArgs),

    /// Build a graph and print what was realized
    Topology(commands::topology::TopologyArgs),

    /// Classify the change between two settings files
    Diff(commands::diff::DiffArgs),

    /// Render a test signal through a graph and report levels
    Render(commands::render::RenderArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Processors(args) => commands::processors::run(args),
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Topology(args) => commands::topology::run(args),
        Commands::Diff(args) => commands::diff::run(args),
        Commands::Render(args) => commands::render::run(args),
    }
}
