//! Run a graph config end to end (§4.12's `execute`/`stop`, wired to Ctrl-C).

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use synchro_config::load_run_config;
use synchro_core::EventBus;
use synchro_graph::{GraphManager, NeuralConfig};

/// Load a graph config and run it until it stops on its own, is interrupted,
/// or hits its `run_time_seconds` watchdog.
#[derive(Args)]
pub struct RunArgs {
    /// Path to the run config TOML file
    pub config: PathBuf,

    /// Working directory `$WORKING_DIR` output paths resolve against.
    /// Defaults to a fresh per-run directory under the platform data dir.
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Default `server_url` for `converter_seamless` nodes that leave it blank.
    #[arg(long)]
    server_url: Option<String>,
}

/// Runs the `run` command.
pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let run = load_run_config(&args.config)?;

    let working_dir = match args.working_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => synchro_config::paths::ensure_run_dir(&run.settings.name, &uuid::Uuid::new_v4().to_string())?,
    };
    tracing::info!(working_dir = %working_dir.display(), "resolved working directory");

    let events = EventBus::new();
    events.subscribe_all(|event| {
        println!("[{}] {}: {}", event.node_name, event.kind, event.payload);
    });

    let neural = NeuralConfig {
        default_server_url: args.server_url,
    };

    let built = GraphManager::build(&run.graph, &run.settings, &neural, events, &working_dir)?;
    let manager = GraphManager::new(built);
    manager.execute(&run.settings)?;

    let running = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true));
    let ctrlc_flag = std::sync::Arc::clone(&running);
    ctrlc::set_handler(move || {
        println!("\nreceived interrupt, stopping graph...");
        ctrlc_flag.store(false, std::sync::atomic::Ordering::SeqCst);
    })?;

    while manager.is_running() && running.load(std::sync::atomic::Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
    }
    manager.stop();

    println!("graph stopped");
    Ok(())
}
