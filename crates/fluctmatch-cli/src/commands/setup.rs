use super::provenance_title;
use crate::cli::SetupArgs;
use crate::config::Settings;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use fluctmatch::{
    core::io::{dcd::DcdReader, psf::PsfFile, traits::TopologyFile},
    core::models::frame::Frame,
    engine::{
        cg::{CenterMethod, build_models},
        config::SetupConfigBuilder,
        error::EngineError,
    },
    workflows,
};
use tracing::{debug, info};

pub fn run(args: SetupArgs, settings: &Settings, progress: &CliProgressHandler) -> Result<()> {
    info!("Loading all-atom topology from {:?}", &args.topology);
    let aa = PsfFile::read_from_path(&args.topology)
        .map_err(|e| CliError::parsing(&args.topology, e))?;

    let center = if args.geometry {
        CenterMethod::Geometry
    } else {
        CenterMethod::Mass
    };
    let mapping = build_models(&aa, &args.models, center)?;
    info!(
        models = ?args.models,
        beads = mapping.n_beads(),
        "Coarse-grained system built."
    );

    let reader = DcdReader::open(&args.trajectory)
        .map_err(|e| CliError::parsing(&args.trajectory, e))?;
    if reader.n_atoms() != aa.n_atoms() {
        return Err(CliError::Argument(format!(
            "trajectory {} has {} atoms but topology {} has {}",
            args.trajectory.display(),
            reader.n_atoms(),
            args.topology.display(),
            aa.n_atoms()
        )));
    }
    debug!(frames = reader.n_frames(), "Trajectory opened.");

    let mut builder = SetupConfigBuilder::new()
        .outdir(args.outdir.clone())
        .prefix(&args.prefix)
        .write_traj(!args.no_traj)
        .extended(args.extended)
        .charmm_version(args.charmm_version.unwrap_or(settings.charmm_version))
        .temperature(args.temperature.unwrap_or(settings.temperature));
    for line in provenance_title(&[
        ("Topology", args.topology.as_path()),
        ("Trajectory", args.trajectory.as_path()),
    ]) {
        builder = builder.title_line(&line);
    }
    let config = builder.build().map_err(EngineError::from)?;

    let frames = reader.map(|frame| -> std::result::Result<Frame, EngineError> {
        mapping.transform(&frame?)
    });

    println!("Building fluctuation matching files...");
    let output =
        workflows::setup::write_charmm_files(&mapping.system, frames, &config, &progress.reporter())?;

    println!(
        "✓ {} frames processed, {} bonds parameterized.",
        output.n_frames,
        output.parameters.n_rows()
    );
    for path in &output.files {
        println!("  {}", path.display());
    }
    Ok(())
}
