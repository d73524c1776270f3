use crate::cli::ThermoArgs;
use crate::config::Settings;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use fluctmatch::engine::{config::ThermoConfigBuilder, error::EngineError};
use fluctmatch::workflows::thermo::{
    CharmmThermo, ExistingThermo, ThermoCalculator, create_thermo_tables,
};
use tracing::info;

/// File prefix of the setup output named by `topology`.
fn setup_prefix(topology: &str) -> &str {
    topology
        .strip_suffix(".xplor.psf")
        .or_else(|| topology.strip_suffix(".psf"))
        .unwrap_or(topology)
}

pub fn run(args: ThermoArgs, settings: &Settings, progress: &CliProgressHandler) -> Result<()> {
    let temperature = args.temperature.unwrap_or(settings.temperature);

    let calculator: Box<dyn ThermoCalculator> = if args.skip_calculation {
        info!("Reading existing thermodynamic data.");
        Box::new(ExistingThermo)
    } else {
        let config = ThermoConfigBuilder::new()
            .prefix(setup_prefix(&args.topology))
            .trajectory(&args.trajectory)
            .temperature(temperature)
            .charmm_version(settings.charmm_version)
            .build()
            .map_err(EngineError::from)?;
        let name = args
            .executable
            .as_deref()
            .unwrap_or(&settings.charmm_executable);
        Box::new(CharmmThermo::locate(name, config)?)
    };

    println!(
        "Collecting thermodynamic data from {}...",
        args.data_dir.display()
    );
    let tables = create_thermo_tables(
        &args.data_dir,
        &args.outdir,
        calculator.as_ref(),
        temperature,
        &progress.reporter(),
    )?;
    println!(
        "✓ Tables for {} residues and {} windows written to {}",
        tables.entropy.n_rows(),
        tables.entropy.columns().len(),
        args.outdir.display()
    );
    Ok(())
}
