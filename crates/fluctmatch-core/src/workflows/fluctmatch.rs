use crate::core::io::prm::{PrmOptions, write_prm};
use crate::core::io::stream::{read_ic_distances, write_stream};
use crate::core::tables::{BondKey, Table};
use crate::engine::config::FluctmatchConfig;
use crate::engine::error::EngineError;
use crate::engine::fluctmatch::{
    B0_COLUMN, KB_COLUMN, equilibrium_lengths, fluctuation_rmsd, initial_parameters,
    update_force_constants,
};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::runner::{find_executable, run_command};
use crate::engine::stats::BOND_COLUMN;
use crate::workflows::setup::bond_parameters;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, instrument, warn};

pub const NMA_INPUT: &str = "fluct.inp";
pub const NMA_LOG: &str = "fluct.log";
pub const NMA_DATA: &str = "fluct.ic";

/// Bond-length fluctuations of the current elastic network.
pub trait NormalModeCalculator {
    /// Returns the `r_IJ` fluctuations of the network in `dir`.
    ///
    /// `parameters` holds the `Kb` and `b0` columns that were just written
    /// to the network's parameter file.
    fn fluctuations(
        &self,
        dir: &Path,
        parameters: &Table<BondKey>,
    ) -> Result<Table<BondKey>, EngineError>;
}

/// Normal-mode analysis of the CG network by CHARMM.
#[derive(Debug, Clone)]
pub struct CharmmNma {
    executable: PathBuf,
    config: FluctmatchConfig,
}

impl CharmmNma {
    pub fn new(executable: PathBuf, config: FluctmatchConfig) -> Self {
        Self { executable, config }
    }

    pub fn locate(name: &str, config: FluctmatchConfig) -> Result<Self, EngineError> {
        Ok(Self::new(find_executable(name)?, config))
    }

    pub fn render_input(&self) -> String {
        let format = if self.config.charmm_version >= 36 {
            "ioformat extended\n"
        } else {
            ""
        };
        format!(
            "* Bond fluctuations of the elastic network\n\
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
             skip all excl bond\n\
             update inbfrq 0\n\
             ic fill\n\
             set nmode = ?natom\n\
             calc nmode = @nmode * 3\n\
             vibran nmode @nmode\n\
             \x20   diag\n\
             \x20   fluc ic temp @temp tfre 0.0 mode 7 thru @nmode\n\
             end\n\
             \n\
             open write card unit 30 name {data}\n\
             write ic unit 30 card resid\n\
             close unit 30\n\
             stop\n",
            format = format,
            prefix = self.config.prefix,
            temperature = self.config.temperature,
            data = NMA_DATA,
        )
    }
}

impl NormalModeCalculator for CharmmNma {
    fn fluctuations(
        &self,
        dir: &Path,
        _parameters: &Table<BondKey>,
    ) -> Result<Table<BondKey>, EngineError> {
        fs::write(dir.join(NMA_INPUT), self.render_input())?;

        let mut command = Command::new(&self.executable);
        command.arg("-i").arg(NMA_INPUT).current_dir(dir);
        run_command(command, None, &dir.join(NMA_LOG))?;

        let data = BufReader::new(File::open(dir.join(NMA_DATA))?);
        Ok(read_ic_distances(data, BOND_COLUMN)?)
    }
}

/// Outcome of the fluctuation-matching iteration.
#[derive(Debug, Clone)]
pub struct FluctmatchOutput {
    pub files: Vec<PathBuf>,
    /// Normal-mode calculations performed.
    pub cycles: usize,
    /// Fluctuation RMSD of the last calculation.
    pub rmsd: f64,
    pub converged: bool,
    /// Final `Kb` and `b0` columns.
    pub parameters: Table<BondKey>,
}

fn write_parameters(
    params: &Table<BondKey>,
    path: &Path,
    config: &FluctmatchConfig,
) -> Result<(), EngineError> {
    let options = PrmOptions {
        title: config.title.clone(),
    };
    let mut prm = BufWriter::new(File::create(path)?);
    write_prm(&bond_parameters(params)?, &options, &mut prm)?;
    prm.flush()?;
    Ok(())
}

fn single_column(params: &Table<BondKey>, name: &str) -> Result<Table<BondKey>, EngineError> {
    let values = params.column(name)?;
    Ok(Table::from_column(
        name,
        values.into_iter().map(|(k, v)| (k.clone(), v)),
    )?)
}

struct Iteration {
    cycles: usize,
    rmsd: f64,
    converged: bool,
}

fn iterate(
    dir: &Path,
    params: &mut Table<BondKey>,
    target: &Table<BondKey>,
    calculator: &dyn NormalModeCalculator,
    config: &FluctmatchConfig,
    prm_path: &Path,
    reporter: &ProgressReporter,
) -> Result<Iteration, EngineError> {
    let mut state = Iteration {
        cycles: 0,
        rmsd: f64::INFINITY,
        converged: false,
    };
    for cycle in 1..=config.max_cycles {
        write_parameters(params, prm_path, config)?;
        let current = calculator.fluctuations(dir, params)?;
        state.cycles = cycle;
        state.rmsd = fluctuation_rmsd(target, &current)?;
        info!(cycle, rmsd = state.rmsd, "Fluctuations compared.");
        reporter.report(Progress::TaskIncrement);

        if state.rmsd <= config.tolerance {
            state.converged = true;
            break;
        }
        let kb = update_force_constants(
            params,
            target,
            &current,
            config.alpha,
            config.temperature,
        )?;
        params.join_column(KB_COLUMN, &kb, KB_COLUMN)?;
    }
    Ok(state)
}

/// Refines the force constants of the network in `dir` until its bond
/// fluctuations match `target`.
///
/// Starts from the equipartition parameters of `average` and `target`,
/// rewrites `<prefix>.stream` and `<prefix>.prm`, then alternates a
/// normal-mode calculation with a force-constant update. The loop stops once
/// the fluctuation RMSD is within the tolerance, or after `max_cycles`
/// calculations. The final `Kb` and `b0` tables go to `kb.txt` and `b0.txt`.
#[instrument(skip_all, name = "fluctmatch_workflow")]
pub fn run_fluctmatch(
    dir: &Path,
    average: &Table<BondKey>,
    target: &Table<BondKey>,
    calculator: &dyn NormalModeCalculator,
    config: &FluctmatchConfig,
    reporter: &ProgressReporter,
) -> Result<FluctmatchOutput, EngineError> {
    let mut params = initial_parameters(average, target, config.temperature)?;
    info!(
        bonds = params.n_rows(),
        max_cycles = config.max_cycles,
        tolerance = config.tolerance,
        "Starting fluctuation matching."
    );

    let mut files = Vec::new();
    let stream_path = dir.join(format!("{}.stream", config.prefix));
    let mut stream = BufWriter::new(File::create(&stream_path)?);
    write_stream(
        &equilibrium_lengths(&params)?,
        BOND_COLUMN,
        &config.title,
        &mut stream,
    )?;
    stream.flush()?;
    files.push(stream_path);

    let prm_path = dir.join(format!("{}.prm", config.prefix));
    reporter.report(Progress::PhaseStart {
        name: "Fluctuation matching",
    });
    reporter.report(Progress::TaskStart {
        total_steps: config.max_cycles as u64,
    });
    let iteration = iterate(
        dir,
        &mut params,
        target,
        calculator,
        config,
        &prm_path,
        reporter,
    );
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);
    let iteration = iteration?;

    if iteration.converged {
        info!(cycles = iteration.cycles, rmsd = iteration.rmsd, "Fluctuations matched.");
    } else {
        warn!(
            cycles = iteration.cycles,
            rmsd = iteration.rmsd,
            "Fluctuation matching stopped before reaching the tolerance."
        );
        // The last update has not been written yet.
        write_parameters(&params, &prm_path, config)?;
    }
    files.push(prm_path);

    for (name, column) in [("kb.txt", KB_COLUMN), ("b0.txt", B0_COLUMN)] {
        let path = dir.join(name);
        single_column(&params, column)?.write_to_path(&path)?;
        debug!(path = %path.display(), "Parameter table written.");
        files.push(path);
    }

    Ok(FluctmatchOutput {
        files,
        cycles: iteration.cycles,
        rmsd: iteration.rmsd,
        converged: iteration.converged,
        parameters: params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::FluctmatchConfigBuilder;
    use crate::engine::fluctmatch::K_B;
    use std::cell::Cell;
    use tempfile::tempdir;

    /// A network twice as stiff as its force constants say:
    /// `σ² = k_B T / (2 Kb)`.
    struct StiffNetwork {
        temperature: f64,
        calls: Cell<usize>,
    }

    impl StiffNetwork {
        fn new(temperature: f64) -> Self {
            Self {
                temperature,
                calls: Cell::new(0),
            }
        }
    }

    impl NormalModeCalculator for StiffNetwork {
        fn fluctuations(
            &self,
            dir: &Path,
            parameters: &Table<BondKey>,
        ) -> Result<Table<BondKey>, EngineError> {
            assert!(dir.join("fm.prm").is_file());
            self.calls.set(self.calls.get() + 1);
            let kt = K_B * self.temperature;
            let rows = parameters
                .column(KB_COLUMN)?
                .into_iter()
                .map(|(key, kb)| (key.clone(), (kt / (2.0 * kb)).sqrt()));
            Ok(Table::from_column(BOND_COLUMN, rows)?)
        }
    }

    /// Always fails, as CHARMM does when its input is broken.
    struct BrokenNetwork;

    impl NormalModeCalculator for BrokenNetwork {
        fn fluctuations(&self, dir: &Path, _: &Table<BondKey>) -> Result<Table<BondKey>, EngineError> {
            Err(EngineError::ExecutableNotFound {
                program: dir.join("charmm").display().to_string(),
                hint: "test",
            })
        }
    }

    fn bonds() -> [BondKey; 2] {
        [
            BondKey::new(("DMA", 1, "C1"), ("DMA", 1, "N")),
            BondKey::new(("DMA", 1, "N"), ("DMA", 1, "C2")),
        ]
    }

    fn r_table(values: [f64; 2]) -> Table<BondKey> {
        Table::from_column(BOND_COLUMN, bonds().into_iter().zip(values)).unwrap()
    }

    fn config(max_cycles: usize) -> FluctmatchConfig {
        FluctmatchConfigBuilder::new()
            .prefix("fm")
            .alpha(0.25)
            .max_cycles(max_cycles)
            .tolerance(1e-6)
            .build()
            .unwrap()
    }

    #[test]
    fn force_constants_converge_to_the_target_fluctuations() {
        let dir = tempdir().unwrap();
        let average = r_table([1.47, 1.33]);
        let target = r_table([0.05, 0.08]);
        let network = StiffNetwork::new(300.0);

        let output = run_fluctmatch(
            dir.path(),
            &average,
            &target,
            &network,
            &config(100),
            &ProgressReporter::new(),
        )
        .unwrap();

        assert!(output.converged);
        assert!(output.cycles > 1);
        assert_eq!(output.cycles, network.calls.get());
        assert!(output.rmsd <= 1e-6);

        let kt = K_B * 300.0;
        let [first, _] = bonds();
        let kb = output.parameters.value(&first, KB_COLUMN).unwrap();
        assert!((kb - kt / (2.0 * 0.05 * 0.05)).abs() / kb < 1e-3);
        assert_eq!(output.parameters.value(&first, B0_COLUMN), Some(1.47));

        for name in ["fm.stream", "fm.prm", "kb.txt", "b0.txt"] {
            assert!(dir.path().join(name).is_file(), "missing {}", name);
        }
        let written = Table::<BondKey>::read_from_path(dir.path().join("kb.txt")).unwrap();
        assert_eq!(written.columns(), [KB_COLUMN]);
        assert_eq!(written.n_rows(), 2);
    }

    #[test]
    fn iteration_stops_after_max_cycles() {
        let dir = tempdir().unwrap();
        let network = StiffNetwork::new(300.0);

        let output = run_fluctmatch(
            dir.path(),
            &r_table([1.47, 1.33]),
            &r_table([0.05, 0.08]),
            &network,
            &config(2),
            &ProgressReporter::new(),
        )
        .unwrap();

        assert!(!output.converged);
        assert_eq!(output.cycles, 2);
        assert!(output.rmsd > 1e-6);
        let prm = fs::read_to_string(dir.path().join("fm.prm")).unwrap();
        assert!(prm.starts_with("*"));
        assert!(prm.contains("BONDS"));
    }

    #[test]
    fn calculator_failures_stop_the_iteration() {
        let dir = tempdir().unwrap();
        let result = run_fluctmatch(
            dir.path(),
            &r_table([1.47, 1.33]),
            &r_table([0.05, 0.08]),
            &BrokenNetwork,
            &config(10),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::ExecutableNotFound { .. })));
        assert!(!dir.path().join("kb.txt").exists());
    }

    #[test]
    fn charmm_input_reads_the_setup_files() {
        let nma = CharmmNma::new("charmm".into(), config(1));
        let input = nma.render_input();
        assert!(input.contains("set prefix = fm"));
        assert!(input.contains("read psf card xplor name @prefix.xplor.psf"));
        assert!(input.contains("fluc ic temp @temp"));
        assert!(input.contains("open write card unit 30 name fluct.ic"));
        assert!(input.starts_with("* Bond fluctuations"));
    }
}
