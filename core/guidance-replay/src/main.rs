//! guidance-replay: runs the SmokeArrow guidance engine against scripted
//! scenarios, without a device.
//!
//! ## Subcommands
//!
//! - `run`: Replay a scenario file and print each distinct snapshot as a JSON line
//! - `config`: Print the effective configuration as TOML

mod error;
mod logging;
mod replay;
mod scenario;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use guidance_core::load_config;

use crate::error::{ReplayError, Result};
use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "guidance-replay")]
#[command(about = "Replay location scenarios through the SmokeArrow guidance engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario and print snapshots (one JSON object per line)
    Run {
        /// Scenario file (JSON)
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,

        /// Config file (defaults to ~/.smokearrow/guidance.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print only the final snapshot
        #[arg(long)]
        quiet: bool,
    },

    /// Print the effective configuration
    Config {
        /// Config file (defaults to ~/.smokearrow/guidance.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            scenario,
            config,
            quiet,
        } => run(&scenario, config, quiet),
        Commands::Config { config } => print_config(config),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "guidance-replay failed");
        std::process::exit(1);
    }
}

fn run(scenario_path: &Path, config_path: Option<PathBuf>, quiet: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let scenario = Scenario::load(scenario_path)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .map_err(|source| ReplayError::Io {
            context: "starting runtime".to_string(),
            source,
        })?;
    let frames = runtime.block_on(replay::run(&scenario, config));

    let printed = if quiet {
        frames.last().into_iter().collect::<Vec<_>>()
    } else {
        frames.iter().collect()
    };
    for frame in printed {
        let line =
            serde_json::to_string(frame).map_err(|err| ReplayError::Encode(err.to_string()))?;
        println!("{}", line);
    }
    Ok(())
}

fn print_config(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let rendered =
        toml::to_string_pretty(&config).map_err(|err| ReplayError::Encode(err.to_string()))?;
    print!("{}", rendered);
    Ok(())
}
