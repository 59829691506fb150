//! Validate a graph config without starting it (§4.11's build-time checks,
//! without touching any file/device/network resource).

use clap::Args;
use synchro_config::load_run_config;

/// Parse and validate a run config.
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the run config TOML file
    pub config: std::path::PathBuf,
}

/// Runs the `validate` command.
pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let run = load_run_config(&args.config)?;
    println!(
        "OK: '{}' - {} node(s), {} edge(s)",
        run.settings.name,
        run.graph.nodes.len(),
        run.graph.edges.len()
    );
    Ok(())
}
