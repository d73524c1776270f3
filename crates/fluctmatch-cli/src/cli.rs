use clap::{Args, Parser, Subcommand, ValueEnum};
use fluctmatch::engine::paramtable::DEFAULT_RESSEP;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Timothy H. Click, Nixon Raj, Jhih-Wei Chu",
    version,
    about = "fluctmatch - Build coarse-grained elastic network models from all-atom molecular dynamics by fluctuation matching.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads used for per-window work.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,

    /// TOML file with CHARMM, Gromacs and thermodynamics settings
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert an all-atom trajectory to CG models and write CHARMM input files.
    Setup(SetupArgs),
    /// Refine the force constants of a setup directory by fluctuation matching.
    Run(RunArgs),
    /// Split a trajectory into overlapping windows using Gromacs or CHARMM.
    Splittraj(SplitArgs),
    /// Create per-residue thermodynamic tables from every window.
    Thermo(ThermoArgs),
    /// Compute the differences between two parameter tables.
    Diff(DiffArgs),
    /// Relabel a parameter table with CG bead and residue names.
    TableConvert(TableConvertArgs),
    /// Calculate average bond lengths and their fluctuations.
    Bondstats(BondStatsArgs),
    /// List the available coarse-grained models.
    Models,
}

/// Arguments for the `setup` subcommand.
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// All-atom topology (PSF).
    #[arg(short = 's', long, value_name = "FILE")]
    pub topology: PathBuf,

    /// All-atom trajectory (DCD).
    #[arg(short = 'f', long, value_name = "FILE")]
    pub trajectory: PathBuf,

    /// Directory for the generated files.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub outdir: PathBuf,

    /// Prefix of every generated file.
    #[arg(short, long, default_value = "fluctmatch")]
    pub prefix: String,

    /// CG models to build, merged in the given order.
    #[arg(short, long = "model", value_name = "MODEL", required = true, num_args = 1..)]
    pub models: Vec<String>,

    /// Place beads at the centre of geometry instead of the centre of mass.
    #[arg(long)]
    pub geometry: bool,

    /// Do not write the CG trajectory.
    #[arg(long)]
    pub no_traj: bool,

    /// Use the extended PSF and COR layouts.
    #[arg(long)]
    pub extended: bool,

    /// Temperature in Kelvin for the initial force constants.
    #[arg(short = 'T', long, value_name = "KELVIN")]
    pub temperature: Option<f64>,

    /// CHARMM version written to the topology file.
    #[arg(long, value_name = "VERSION")]
    pub charmm_version: Option<u32>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory holding the files written by `setup`.
    #[arg(short = 'd', long = "dir", value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Prefix of the setup files.
    #[arg(short, long, default_value = "fluctmatch")]
    pub prefix: String,

    /// Average CG bond lengths, as written by `bondstats`.
    #[arg(long, value_name = "FILE", default_value = "average.txt")]
    pub average: PathBuf,

    /// Target CG bond fluctuations, as written by `bondstats`.
    #[arg(long, value_name = "FILE", default_value = "fluct.txt")]
    pub fluct: PathBuf,

    /// Maximum number of normal-mode calculations.
    #[arg(short = 'n', long, value_name = "CYCLES", default_value_t = 300)]
    pub max_cycles: usize,

    /// Fluctuation RMSD (Å) at which the network has converged.
    #[arg(long, value_name = "TOL", default_value_t = 1e-4)]
    pub tolerance: f64,

    /// Step size of the force-constant update.
    #[arg(long, default_value_t = 1.0)]
    pub alpha: f64,

    /// Temperature in Kelvin.
    #[arg(short = 'T', long, value_name = "KELVIN")]
    pub temperature: Option<f64>,

    /// CHARMM executable to run instead of the configured one.
    #[arg(long, value_name = "PATH")]
    pub executable: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitProgram {
    Gmx,
    Charmm,
}

/// Arguments for the `splittraj` subcommand.
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Split using an external MD program.
    #[arg(long = "type", value_enum, default_value_t = SplitProgram::Gmx)]
    pub program: SplitProgram,

    /// Gromacs topology (tpr gro pdb) or CHARMM PSF.
    #[arg(short = 's', value_name = "FILE", default_value = "md.tpr")]
    pub topology: PathBuf,

    /// Location of CHARMM topology/parameter files.
    #[arg(long, value_name = "DIR")]
    pub toppar: Option<PathBuf>,

    /// Trajectory to split [default: md.xtc (gmx) or md.dcd (charmm)]
    #[arg(short = 'f', value_name = "FILE")]
    pub trajectory: Option<PathBuf>,

    /// Parent directory of the window subdirectories.
    #[arg(long = "data", value_name = "DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Gromacs index file.
    #[arg(short = 'n', value_name = "FILE")]
    pub index: Option<PathBuf>,

    /// Trajectory name within each window [default: aa.xtc (gmx) or aa.dcd (charmm)]
    #[arg(short = 'o', value_name = "FILE")]
    pub outfile: Option<String>,

    /// Log file name within each window.
    #[arg(short = 'l', long, value_name = "LOG", default_value = "split.log")]
    pub logfile: String,

    /// System selection from the Gromacs index file.
    #[arg(short = 't', long, value_name = "NDXNUM", default_value_t = 0)]
    pub system: u32,

    /// First frame.
    #[arg(short = 'b', value_name = "FRAME", default_value_t = 1)]
    pub start: usize,

    /// Last frame.
    #[arg(short = 'e', value_name = "FRAME", default_value_t = 10_000)]
    pub stop: usize,

    /// Frames per window.
    #[arg(short = 'w', value_name = "WINSIZE", default_value_t = 10_000)]
    pub window_size: usize,

    /// Executable to run instead of the configured one.
    #[arg(long, value_name = "PATH")]
    pub executable: Option<String>,
}

/// Arguments for the `thermo` subcommand.
#[derive(Args, Debug)]
pub struct ThermoArgs {
    /// Directory holding the window subdirectories.
    #[arg(short = 'd', long = "datadir", value_name = "DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory for the thermodynamic tables.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub outdir: PathBuf,

    /// XPLOR PSF written by `setup` inside each window.
    #[arg(short = 's', value_name = "FILE", default_value = "fluctmatch.xplor.psf")]
    pub topology: String,

    /// CG trajectory inside each window.
    #[arg(short = 'f', value_name = "FILE", default_value = "cg.dcd")]
    pub trajectory: String,

    /// Temperature in Kelvin.
    #[arg(short = 'T', long, value_name = "KELVIN")]
    pub temperature: Option<f64>,

    /// Read existing thermo.dat files instead of running CHARMM.
    #[arg(long)]
    pub skip_calculation: bool,

    /// CHARMM executable to run instead of the configured one.
    #[arg(long, value_name = "PATH")]
    pub executable: Option<String>,
}

/// Arguments for the `diff` subcommand.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Directory for the difference tables.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub outdir: PathBuf,

    /// Minimum residue separation counted in residue aggregates.
    #[arg(short = 'r', long, value_name = "RESSEP", default_value_t = DEFAULT_RESSEP)]
    pub ressep: isize,

    /// Table to subtract from.
    pub table1: PathBuf,

    /// Table to subtract.
    pub table2: PathBuf,
}

/// Arguments for the `table-convert` subcommand.
#[derive(Args, Debug)]
pub struct TableConvertArgs {
    /// CG topology carrying the bead names.
    #[arg(long = "s1", value_name = "FILE", default_value = "cg.xplor.psf")]
    pub cg_topology: PathBuf,

    /// Fluctuation-matching topology the table refers to.
    #[arg(long = "s2", value_name = "FILE", default_value = "fluctmatch.xplor.psf")]
    pub fm_topology: PathBuf,

    /// Parameter table to convert.
    #[arg(short = 't', long, value_name = "FILE", default_value = "kb.txt")]
    pub table: PathBuf,

    /// Converted table.
    #[arg(short, long, value_name = "FILE", default_value = "kb_aa.txt")]
    pub outfile: PathBuf,
}

/// Arguments for the `bondstats` subcommand.
#[derive(Args, Debug)]
pub struct BondStatsArgs {
    /// Topology (PSF).
    #[arg(short = 's', long, value_name = "FILE")]
    pub topology: PathBuf,

    /// Trajectory (DCD).
    #[arg(short = 'f', long, value_name = "FILE")]
    pub trajectory: PathBuf,

    /// Directory for average.txt and fluct.txt.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub outdir: PathBuf,

    /// First frame (0-based).
    #[arg(short = 'b', long, value_name = "FRAME", default_value_t = 0)]
    pub start: usize,

    /// Stop before this frame.
    #[arg(short = 'e', long, value_name = "FRAME")]
    pub stop: Option<usize>,

    /// Use every N-th frame.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub step: usize,
}
