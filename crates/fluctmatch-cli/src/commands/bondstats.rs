use crate::cli::BondStatsArgs;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use fluctmatch::{
    core::io::{dcd::DcdReader, psf::PsfFile, traits::TopologyFile},
    core::tables::{BondKey, Table},
    engine::{
        analysis::{FrameRange, run_analysis},
        error::EngineError,
        stats::{BondStats, StatFunc},
    },
};
use std::fs;
use std::path::Path;
use tracing::info;

const AVERAGE_FILE: &str = "average.txt";
const FLUCT_FILE: &str = "fluct.txt";

fn write_table(table: Option<&Table<BondKey>>, path: &Path) -> Result<()> {
    if let Some(table) = table {
        table.write_to_path(path).map_err(EngineError::from)?;
        info!(path = %path.display(), rows = table.n_rows(), "Table written.");
    }
    Ok(())
}

pub fn run(args: BondStatsArgs, progress: &CliProgressHandler) -> Result<()> {
    let system = PsfFile::read_from_path(&args.topology)
        .map_err(|e| CliError::parsing(&args.topology, e))?;
    let reader = DcdReader::open(&args.trajectory)
        .map_err(|e| CliError::parsing(&args.trajectory, e))?;
    let range = FrameRange::new(args.start, args.stop, args.step)?;

    let reporter = progress.reporter();
    let stats = reporter
        .phase("Bond statistics", || {
            run_analysis(
                BondStats::new(&system, StatFunc::Both),
                reader,
                &range,
                &reporter,
            )
        })?
        .map_err(EngineError::from)?;

    fs::create_dir_all(&args.outdir)?;
    write_table(stats.mean(), &args.outdir.join(AVERAGE_FILE))?;
    write_table(stats.std(), &args.outdir.join(FLUCT_FILE))?;
    println!("✓ Bond statistics written to {}", args.outdir.display());
    Ok(())
}
