use crate::cli::{SplitArgs, SplitProgram};
use crate::config::Settings;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use fluctmatch::engine::{config::SplitConfigBuilder, error::EngineError};
use fluctmatch::workflows::split::{
    CharmmSplitter, GmxSplitter, Splitter, split_trajectory, windows,
};
use std::path::PathBuf;
use tracing::info;

/// Default input trajectory and per-window output name for each program.
fn default_names(program: SplitProgram) -> (&'static str, &'static str) {
    match program {
        SplitProgram::Gmx => ("md.xtc", "aa.xtc"),
        SplitProgram::Charmm => ("md.dcd", "aa.dcd"),
    }
}

pub fn run(args: SplitArgs, settings: &Settings, progress: &CliProgressHandler) -> Result<()> {
    let (trajectory, outfile) = default_names(args.program);
    let mut builder = SplitConfigBuilder::new()
        .data_dir(args.data_dir.clone())
        .topology(args.topology.clone())
        .trajectory(args.trajectory.unwrap_or_else(|| PathBuf::from(trajectory)))
        .index(args.index.clone())
        .outfile(args.outfile.as_deref().unwrap_or(outfile))
        .logfile(&args.logfile)
        .system(args.system)
        .charmm_version(settings.charmm_version)
        .start(args.start)
        .stop(args.stop)
        .window_size(args.window_size);
    if let Some(toppar) = args.toppar.or_else(|| settings.toppar.clone()) {
        builder = builder.toppar(toppar);
    }
    let config = builder.build().map_err(EngineError::from)?;

    let windows = windows(config.start, config.stop, config.window_size)?;
    let splitter: Box<dyn Splitter> = match args.program {
        SplitProgram::Gmx => {
            let name = args.executable.as_deref().unwrap_or(&settings.gmx_executable);
            Box::new(GmxSplitter::locate(name)?)
        }
        SplitProgram::Charmm => {
            let name = args
                .executable
                .as_deref()
                .unwrap_or(&settings.charmm_executable);
            Box::new(CharmmSplitter::locate(name)?)
        }
    };
    info!(
        program = %splitter.program().display(),
        windows = windows.len(),
        "Splitter ready."
    );

    println!(
        "Splitting {} into {} windows of {} frames...",
        config.trajectory.display(),
        windows.len(),
        config.window_size
    );
    let dirs = split_trajectory(splitter.as_ref(), &windows, &config, &progress.reporter())?;
    println!(
        "✓ {} windows written to {}",
        dirs.len(),
        config.data_dir.display()
    );
    Ok(())
}
