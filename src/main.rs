//! gsedit - Editor engine for game-server privileges XML and dedicated.cfg
//!
//! Binary entry point: initializes logging, parses the CLI, and dispatches.

use clap::Parser;
use gsedit::cli::{self, GseditCli};
use gsedit::logging::{init_logging, LogConfig, LogLevel};
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = GseditCli::parse();

    let mut log_config = LogConfig::from_env();
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    if let Err(err) = init_logging(&log_config) {
        eprintln!("failed to initialize logging: {}", err);
    }

    if let Err(err) = cli::run(cli).await {
        error!("{}", err);
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
