use crate::core::tables::{ResidueKey, Table, TableError};
use crate::engine::config::ThermoConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::runner::{find_executable, run_command};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, instrument, warn};

pub const ENTROPY: &str = "Entropy";
pub const ENTHALPY: &str = "Enthalpy";
pub const HEAT_CAPACITY: &str = "Heatcap";

pub const THERMO_DATA: &str = "thermo.dat";
pub const THERMO_INPUT: &str = "thermo.inp";
pub const THERMO_LOG: &str = "thermo.log";

/// Produces per-residue thermodynamic quantities for one window.
pub trait ThermoCalculator: Sync {
    /// Returns a table with the columns `Entropy`, `Enthalpy` and `Heatcap`.
    fn calculate(&self, subdir: &Path) -> Result<Table<ResidueKey>, EngineError>;
}

fn read_thermo_data(path: &Path) -> Result<Table<ResidueKey>, EngineError> {
    let table = Table::<ResidueKey>::read_from_path(path)?;
    for column in [ENTROPY, ENTHALPY, HEAT_CAPACITY] {
        if table.column_index(column).is_none() {
            return Err(TableError::UnknownColumn(column.to_string()).into());
        }
    }
    Ok(table)
}

/// Reads `thermo.dat` left by an earlier run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExistingThermo;

impl ThermoCalculator for ExistingThermo {
    fn calculate(&self, subdir: &Path) -> Result<Table<ResidueKey>, EngineError> {
        read_thermo_data(&subdir.join(THERMO_DATA))
    }
}

/// Quasi-harmonic thermodynamics per residue, computed by CHARMM from the
/// window's fluctuation-matched network and CG trajectory.
#[derive(Debug, Clone)]
pub struct CharmmThermo {
    executable: PathBuf,
    config: ThermoConfig,
}

impl CharmmThermo {
    pub fn new(executable: PathBuf, config: ThermoConfig) -> Self {
        Self { executable, config }
    }

    pub fn locate(name: &str, config: ThermoConfig) -> Result<Self, EngineError> {
        Ok(Self::new(find_executable(name)?, config))
    }

    pub fn render_input(&self) -> String {
        let format = if self.config.charmm_version >= 36 {
            "ioformat extended\n"
        } else {
            ""
        };
        format!(
            "* Thermodynamic properties of each residue\n\
             *\n\
             bomlev -2\n\
             {format}\
             set prefix = {prefix}\n\
             set temp = {temperature:.2}\n\
             \n\
             read rtf card name @prefix.rtf\n\
             read param card flex name @prefix.prm\n\
             read psf card xplor name @prefix.xplor.psf\n\
             read coor card name @prefix.cor\n\
             stream @prefix.stream\n\
             \n\
             open write card unit 40 name {data}\n\
             echu 40\n\
             echo segidI resI {entropy} {enthalpy} {heatcap}\n\
             \n\
             set nres = ?nres\n\
             set i = 1\n\
             label loop\n\
             \x20   define target select ires @i end\n\
             \x20   set segid = ?selsegi\n\
             \x20   set resid = ?selresi\n\
             \x20   open read unform unit 11 name {trajectory}\n\
             \x20   vibran nmode 1000\n\
             \x20   quasi firstu 11 nunit 1 temp @temp select target end\n\
             \x20   thermo temp @temp\n\
             \x20   end\n\
             \x20   close unit 11\n\
             \x20   echo @segid @resid ?stot ?htot ?cvtot\n\
             \x20   incr i by 1\n\
             if i le @nres goto loop\n\
             \n\
             close unit 40\n\
             stop\n",
            format = format,
            prefix = self.config.prefix,
            temperature = self.config.temperature,
            data = THERMO_DATA,
            entropy = ENTROPY,
            enthalpy = ENTHALPY,
            heatcap = HEAT_CAPACITY,
            trajectory = self.config.trajectory,
        )
    }
}

impl ThermoCalculator for CharmmThermo {
    fn calculate(&self, subdir: &Path) -> Result<Table<ResidueKey>, EngineError> {
        let input = subdir.join(THERMO_INPUT);
        fs::write(&input, self.render_input())?;

        let mut command = Command::new(&self.executable);
        command.arg("-i").arg(THERMO_INPUT).current_dir(subdir);
        run_command(command, None, &subdir.join(THERMO_LOG))?;
        read_thermo_data(&subdir.join(THERMO_DATA))
    }
}

/// Per-residue tables with one column per window.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermoTables {
    pub entropy: Table<ResidueKey>,
    pub enthalpy: Table<ResidueKey>,
    pub heat_capacity: Table<ResidueKey>,
    pub gibbs: Table<ResidueKey>,
}

/// Subdirectories of `datadir` named by an integer, sorted numerically.
pub fn window_dirs(datadir: &Path) -> Result<Vec<(u64, PathBuf)>, EngineError> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(datadir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        match name.as_deref().map(str::parse::<u64>) {
            Some(Ok(window)) => dirs.push((window, path)),
            _ => warn!(dir = %path.display(), "Skipping directory that is not a window."),
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Runs `calculator` on every window of `datadir` and writes the entropy,
/// enthalpy, heat capacity and Gibbs free energy tables into `outdir`.
///
/// The Gibbs free energy is `H - T S` at `temperature`.
#[instrument(skip_all, name = "thermo_workflow")]
pub fn create_thermo_tables(
    datadir: &Path,
    outdir: &Path,
    calculator: &dyn ThermoCalculator,
    temperature: f64,
    reporter: &ProgressReporter,
) -> Result<ThermoTables, EngineError> {
    let dirs = window_dirs(datadir)?;
    if dirs.is_empty() {
        return Err(EngineError::NoWindows(datadir.to_path_buf()));
    }
    info!(windows = dirs.len(), "Calculating thermodynamic properties.");

    reporter.report(Progress::PhaseStart {
        name: "Thermodynamics",
    });
    reporter.report(Progress::TaskStart {
        total_steps: dirs.len() as u64,
    });
    let results = dirs
        .par_iter()
        .map(|(window, subdir)| {
            let table = calculator
                .calculate(subdir)
                .map_err(|e| EngineError::Window {
                    window: window.to_string(),
                    source: Box::new(e),
                })?;
            reporter.report(Progress::TaskIncrement);
            Ok((window.to_string(), table))
        })
        .collect::<Result<Vec<_>, EngineError>>();
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let mut entropy = Table::default();
    let mut enthalpy = Table::default();
    let mut heat_capacity = Table::default();
    for (window, table) in results? {
        debug!(window = %window, residues = table.n_rows(), "Collecting window.");
        entropy.join_column(&window, &table, ENTROPY)?;
        enthalpy.join_column(&window, &table, ENTHALPY)?;
        heat_capacity.join_column(&window, &table, HEAT_CAPACITY)?;
    }
    for table in [&mut entropy, &mut enthalpy, &mut heat_capacity] {
        table.sort_columns();
    }
    let gibbs = enthalpy.zip_with(&entropy, |h, s| h - temperature * s);

    fs::create_dir_all(outdir)?;
    entropy.write_to_path(outdir.join("entropy.txt"))?;
    enthalpy.write_to_path(outdir.join("enthalpy.txt"))?;
    heat_capacity.write_to_path(outdir.join("heat_capacity.txt"))?;
    gibbs.write_to_path(outdir.join("gibbs.txt"))?;
    info!(outdir = %outdir.display(), "Thermodynamic tables written.");

    Ok(ThermoTables {
        entropy,
        enthalpy,
        heat_capacity,
        gibbs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_window(datadir: &Path, name: &str, scale: f64) {
        let dir = datadir.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(THERMO_DATA),
            format!(
                "segidI resI Entropy Enthalpy Heatcap\n\
                 PROA 1 {} {} 1.0\n\
                 PROA 2 {} {} 2.0\n",
                0.01 * scale,
                10.0 * scale,
                0.02 * scale,
                20.0 * scale
            ),
        )
        .unwrap();
    }

    #[test]
    fn tables_have_one_numerically_sorted_column_per_window() {
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_window(data.path(), "10", 2.0);
        write_window(data.path(), "2", 1.0);
        fs::create_dir(data.path().join("logs")).unwrap();

        let tables = create_thermo_tables(
            data.path(),
            out.path(),
            &ExistingThermo,
            300.0,
            &ProgressReporter::new(),
        )
        .unwrap();

        assert_eq!(tables.entropy.columns(), ["2", "10"]);
        let key = ResidueKey::new("PROA", 1);
        assert_eq!(tables.enthalpy.row(&key), Some(&[10.0, 20.0][..]));
        let gibbs = tables.gibbs.value(&key, "10").unwrap();
        assert!((gibbs - (20.0 - 300.0 * 0.02)).abs() < 1e-9);

        for name in ["entropy.txt", "enthalpy.txt", "heat_capacity.txt", "gibbs.txt"] {
            assert!(out.path().join(name).is_file());
        }
        let reread = Table::<ResidueKey>::read_from_path(out.path().join("heat_capacity.txt")).unwrap();
        assert_eq!(reread.row(&ResidueKey::new("PROA", 2)), Some(&[2.0, 2.0][..]));
    }

    #[test]
    fn missing_windows_are_an_error() {
        let data = tempdir().unwrap();
        fs::create_dir(data.path().join("notes")).unwrap();
        let result = create_thermo_tables(
            data.path(),
            data.path(),
            &ExistingThermo,
            300.0,
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::NoWindows(_))));
    }

    #[test]
    fn window_failures_name_the_window() {
        let data = tempdir().unwrap();
        fs::create_dir(data.path().join("7")).unwrap();
        let result = create_thermo_tables(
            data.path(),
            data.path(),
            &ExistingThermo,
            300.0,
            &ProgressReporter::new(),
        );
        match result {
            Err(EngineError::Window { window, .. }) => assert_eq!(window, "7"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn thermo_data_without_required_columns_is_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(THERMO_DATA), "segidI resI Entropy\nA 1 0.5\n").unwrap();
        assert!(ExistingThermo.calculate(dir.path()).is_err());
    }

    #[test]
    fn charmm_input_uses_prefix_and_temperature() {
        let thermo = CharmmThermo::new("charmm".into(), ThermoConfig::default());
        let input = thermo.render_input();
        assert!(input.contains("read psf card xplor name @prefix.xplor.psf"));
        assert!(input.contains("set prefix = fluctmatch"));
        assert!(input.contains("set temp = 300.00"));
        assert!(input.contains("echo segidI resI Entropy Enthalpy Heatcap"));
        assert!(input.contains("name cg.dcd"));
    }
}
