//! TCAS flight simulator entry point.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use tcas_sim::config::Config;
use tcas_sim::shell::{self, SessionOutcome};
use tcas_sim::{logging, report};

/// Discrete-event TCAS flight simulation with an interactive shell.
#[derive(Debug, Parser)]
#[command(name = "tcas-sim", version, about)]
struct Args {
    /// Directory for the console, TCAS and entity detail logs.
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
    /// Skip the interactive prompt and use this fleet size.
    #[arg(long)]
    planes: Option<usize>,
    /// Spread flights across three cruising-altitude tiers.
    #[arg(long)]
    different_altitudes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config {
        log_dir: args.log_dir,
        different_altitudes: args.different_altitudes,
        ..Config::default()
    };

    logging::init(&config)?;
    report::reset_detail_logs(&config)?;

    loop {
        match shell::run_session(&config, args.planes).await? {
            SessionOutcome::Reset => continue,
            SessionOutcome::Exit => break,
        }
    }

    Ok(())
}
