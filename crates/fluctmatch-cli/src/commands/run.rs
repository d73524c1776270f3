use super::provenance_title;
use crate::cli::RunArgs;
use crate::config::Settings;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use fluctmatch::{
    core::tables::{BondKey, Table},
    engine::{config::FluctmatchConfigBuilder, error::EngineError},
    workflows::fluctmatch::{CharmmNma, run_fluctmatch},
};
use std::path::Path;
use tracing::info;

fn read_bond_table(path: &Path) -> Result<Table<BondKey>> {
    Table::read_from_path(path).map_err(|e| CliError::parsing(path, e))
}

pub fn run(args: RunArgs, settings: &Settings, progress: &CliProgressHandler) -> Result<()> {
    let average = read_bond_table(&args.average)?;
    let target = read_bond_table(&args.fluct)?;
    info!(bonds = target.n_rows(), "Target fluctuations loaded.");

    let mut builder = FluctmatchConfigBuilder::new()
        .prefix(&args.prefix)
        .temperature(args.temperature.unwrap_or(settings.temperature))
        .alpha(args.alpha)
        .max_cycles(args.max_cycles)
        .tolerance(args.tolerance)
        .charmm_version(settings.charmm_version);
    for line in provenance_title(&[
        ("Average", args.average.as_path()),
        ("Fluctuations", args.fluct.as_path()),
    ]) {
        builder = builder.title_line(&line);
    }
    let config = builder.build().map_err(EngineError::from)?;

    let name = args
        .executable
        .as_deref()
        .unwrap_or(&settings.charmm_executable);
    let nma = CharmmNma::locate(name, config.clone())?;

    println!("Matching fluctuations in {}...", args.dir.display());
    let output = run_fluctmatch(
        &args.dir,
        &average,
        &target,
        &nma,
        &config,
        &progress.reporter(),
    )?;

    if output.converged {
        println!(
            "✓ Converged after {} cycles (RMSD {:.6}).",
            output.cycles, output.rmsd
        );
    } else {
        println!(
            "⚠ Stopped after {} cycles without converging (RMSD {:.6}).",
            output.cycles, output.rmsd
        );
    }
    for path in &output.files {
        println!("  {}", path.display());
    }
    Ok(())
}
