mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::config::{PartialFileConfig, defaults::DefaultsConfig};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    info!("fluctmatch v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    if let Some(num_threads) = cli.threads {
        info!("Setting Rayon global thread pool to {} threads.", num_threads);
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| {
                CliError::Other(anyhow::anyhow!("Failed to build global thread pool: {}", e))
            })?;
    }

    let settings = PartialFileConfig::load(cli.config.as_deref())?.resolve(&DefaultsConfig::default())?;
    debug!("Resolved settings: {:?}", &settings);

    let progress = if cli.quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };

    let result = match cli.command {
        Commands::Setup(args) => {
            info!("Dispatching to 'setup' command.");
            commands::setup::run(args, &settings, &progress)
        }
        Commands::Run(args) => {
            info!("Dispatching to 'run' command.");
            commands::run::run(args, &settings, &progress)
        }
        Commands::Splittraj(args) => {
            info!("Dispatching to 'splittraj' command.");
            commands::splittraj::run(args, &settings, &progress)
        }
        Commands::Thermo(args) => {
            info!("Dispatching to 'thermo' command.");
            commands::thermo::run(args, &settings, &progress)
        }
        Commands::Diff(args) => {
            info!("Dispatching to 'diff' command.");
            commands::diff::run(args)
        }
        Commands::TableConvert(args) => {
            info!("Dispatching to 'table-convert' command.");
            commands::table_convert::run(args)
        }
        Commands::Bondstats(args) => {
            info!("Dispatching to 'bondstats' command.");
            commands::bondstats::run(args, &progress)
        }
        Commands::Models => {
            commands::models::run();
            Ok(())
        }
    };

    match &result {
        Ok(()) => info!("✅ Command completed successfully."),
        Err(e) => error!("❌ Command failed: {}", e),
    }
    result
}
