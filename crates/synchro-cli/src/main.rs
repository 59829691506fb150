//! Synchro CLI - command-line interface for the synchro audio graph engine.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "synchro")]
#[command(author, version, about = "Real-time audio processing graph engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a graph config until it stops, is interrupted, or times out
    Run(commands::run::RunArgs),

    /// List and manage audio devices
    Devices(commands::devices::DevicesArgs),

    /// Display WAV file information
    Info(commands::info::InfoArgs),

    /// Validate a graph config without starting it
    Validate(commands::validate::ValidateArgs),
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    tracing::debug!(command = ?std::mem::discriminant(&cli.command), "dispatching command");

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Validate(args) => commands::validate::run(args),
    }
}
