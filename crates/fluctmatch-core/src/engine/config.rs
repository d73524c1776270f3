use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_CHARMM_VERSION: u32 = 41;
pub const DEFAULT_TEMPERATURE: f64 = 300.0;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for {parameter}: {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

/// Default CHARMM topology/parameter directory for a CHARMM version.
pub fn default_toppar(version: u32) -> PathBuf {
    PathBuf::from(format!("/opt/local/charmm/c{}b1/toppar", version))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    /// Parent directory of the per-window subdirectories.
    pub data_dir: PathBuf,
    pub topology: PathBuf,
    pub trajectory: PathBuf,
    /// Gromacs index file.
    pub index: Option<PathBuf>,
    /// Output trajectory name inside each window subdirectory.
    pub outfile: String,
    /// Log file name inside each window subdirectory.
    pub logfile: String,
    /// Gromacs index group written to `trjconv`'s stdin.
    pub system: u32,
    pub toppar: PathBuf,
    pub charmm_version: u32,
    pub start: usize,
    pub stop: usize,
    pub window_size: usize,
}

#[derive(Default)]
pub struct SplitConfigBuilder {
    data_dir: Option<PathBuf>,
    topology: Option<PathBuf>,
    trajectory: Option<PathBuf>,
    index: Option<PathBuf>,
    outfile: Option<String>,
    logfile: Option<String>,
    system: Option<u32>,
    toppar: Option<PathBuf>,
    charmm_version: Option<u32>,
    start: Option<usize>,
    stop: Option<usize>,
    window_size: Option<usize>,
}

impl SplitConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_dir(mut self, path: PathBuf) -> Self {
        self.data_dir = Some(path);
        self
    }
    pub fn topology(mut self, path: PathBuf) -> Self {
        self.topology = Some(path);
        self
    }
    pub fn trajectory(mut self, path: PathBuf) -> Self {
        self.trajectory = Some(path);
        self
    }
    pub fn index(mut self, path: Option<PathBuf>) -> Self {
        self.index = path;
        self
    }
    pub fn outfile(mut self, name: &str) -> Self {
        self.outfile = Some(name.to_string());
        self
    }
    pub fn logfile(mut self, name: &str) -> Self {
        self.logfile = Some(name.to_string());
        self
    }
    pub fn system(mut self, group: u32) -> Self {
        self.system = Some(group);
        self
    }
    pub fn toppar(mut self, path: PathBuf) -> Self {
        self.toppar = Some(path);
        self
    }
    pub fn charmm_version(mut self, version: u32) -> Self {
        self.charmm_version = Some(version);
        self
    }
    pub fn start(mut self, frame: usize) -> Self {
        self.start = Some(frame);
        self
    }
    pub fn stop(mut self, frame: usize) -> Self {
        self.stop = Some(frame);
        self
    }
    pub fn window_size(mut self, size: usize) -> Self {
        self.window_size = Some(size);
        self
    }

    pub fn build(self) -> Result<SplitConfig, ConfigError> {
        let charmm_version = self.charmm_version.unwrap_or(DEFAULT_CHARMM_VERSION);
        let config = SplitConfig {
            data_dir: self
                .data_dir
                .ok_or(ConfigError::MissingParameter("data_dir"))?,
            topology: self
                .topology
                .ok_or(ConfigError::MissingParameter("topology"))?,
            trajectory: self
                .trajectory
                .ok_or(ConfigError::MissingParameter("trajectory"))?,
            index: self.index,
            outfile: self
                .outfile
                .ok_or(ConfigError::MissingParameter("outfile"))?,
            logfile: self.logfile.unwrap_or_else(|| "split.log".to_string()),
            system: self.system.unwrap_or(0),
            toppar: self
                .toppar
                .unwrap_or_else(|| default_toppar(charmm_version)),
            charmm_version,
            start: self.start.unwrap_or(1),
            stop: self.stop.unwrap_or(10_000),
            window_size: self.window_size.unwrap_or(10_000),
        };
        if config.window_size < 2 {
            return Err(ConfigError::InvalidValue {
                parameter: "window_size",
                reason: format!("must be at least 2, got {}", config.window_size),
            });
        }
        if config.stop < config.start {
            return Err(ConfigError::InvalidValue {
                parameter: "stop",
                reason: format!("{} precedes start frame {}", config.stop, config.start),
            });
        }
        Ok(config)
    }
}

/// Settings for per-window thermodynamic calculations.
///
/// File names are relative to each window subdirectory.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermoConfig {
    /// Prefix of the CHARMM files written by the setup workflow.
    pub prefix: String,
    pub trajectory: String,
    pub temperature: f64,
    pub charmm_version: u32,
}

impl Default for ThermoConfig {
    fn default() -> Self {
        Self {
            prefix: "fluctmatch".to_string(),
            trajectory: "cg.dcd".to_string(),
            temperature: DEFAULT_TEMPERATURE,
            charmm_version: DEFAULT_CHARMM_VERSION,
        }
    }
}

#[derive(Default)]
pub struct ThermoConfigBuilder {
    prefix: Option<String>,
    trajectory: Option<String>,
    temperature: Option<f64>,
    charmm_version: Option<u32>,
}

impl ThermoConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }
    pub fn trajectory(mut self, name: &str) -> Self {
        self.trajectory = Some(name.to_string());
        self
    }
    pub fn temperature(mut self, kelvin: f64) -> Self {
        self.temperature = Some(kelvin);
        self
    }
    pub fn charmm_version(mut self, version: u32) -> Self {
        self.charmm_version = Some(version);
        self
    }

    pub fn build(self) -> Result<ThermoConfig, ConfigError> {
        let defaults = ThermoConfig::default();
        let config = ThermoConfig {
            prefix: self.prefix.unwrap_or(defaults.prefix),
            trajectory: self.trajectory.unwrap_or(defaults.trajectory),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            charmm_version: self.charmm_version.unwrap_or(defaults.charmm_version),
        };
        check_temperature(config.temperature)?;
        Ok(config)
    }
}

fn check_temperature(temperature: f64) -> Result<(), ConfigError> {
    if !(temperature.is_finite() && temperature > 0.0) {
        return Err(ConfigError::InvalidValue {
            parameter: "temperature",
            reason: format!("must be positive, got {}", temperature),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetupConfig {
    pub outdir: PathBuf,
    /// File name prefix shared by every written file.
    pub prefix: String,
    pub write_traj: bool,
    /// Force the extended PSF/COR layouts.
    pub extended: bool,
    pub charmm_version: u32,
    pub temperature: f64,
    pub title: Vec<String>,
}

#[derive(Default)]
pub struct SetupConfigBuilder {
    outdir: Option<PathBuf>,
    prefix: Option<String>,
    write_traj: Option<bool>,
    extended: Option<bool>,
    charmm_version: Option<u32>,
    temperature: Option<f64>,
    title: Vec<String>,
}

impl SetupConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outdir(mut self, path: PathBuf) -> Self {
        self.outdir = Some(path);
        self
    }
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }
    pub fn write_traj(mut self, write: bool) -> Self {
        self.write_traj = Some(write);
        self
    }
    pub fn extended(mut self, extended: bool) -> Self {
        self.extended = Some(extended);
        self
    }
    pub fn charmm_version(mut self, version: u32) -> Self {
        self.charmm_version = Some(version);
        self
    }
    pub fn temperature(mut self, kelvin: f64) -> Self {
        self.temperature = Some(kelvin);
        self
    }
    pub fn title_line(mut self, line: &str) -> Self {
        self.title.push(line.to_string());
        self
    }

    pub fn build(self) -> Result<SetupConfig, ConfigError> {
        let config = SetupConfig {
            outdir: self.outdir.ok_or(ConfigError::MissingParameter("outdir"))?,
            prefix: self.prefix.ok_or(ConfigError::MissingParameter("prefix"))?,
            write_traj: self.write_traj.unwrap_or(true),
            extended: self.extended.unwrap_or(false),
            charmm_version: self.charmm_version.unwrap_or(DEFAULT_CHARMM_VERSION),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            title: self.title,
        };
        check_temperature(config.temperature)?;
        Ok(config)
    }
}

/// Settings for the iterative refinement of force constants.
///
/// File names are relative to the directory holding the setup output.
#[derive(Debug, Clone, PartialEq)]
pub struct FluctmatchConfig {
    /// Prefix of the CHARMM files written by the setup workflow.
    pub prefix: String,
    pub temperature: f64,
    /// Step size applied to the force-constant update.
    pub alpha: f64,
    pub max_cycles: usize,
    /// RMSD of bond fluctuations (Å) below which the network has converged.
    pub tolerance: f64,
    pub charmm_version: u32,
    pub title: Vec<String>,
}

impl Default for FluctmatchConfig {
    fn default() -> Self {
        Self {
            prefix: "fluctmatch".to_string(),
            temperature: DEFAULT_TEMPERATURE,
            alpha: 1.0,
            max_cycles: 300,
            tolerance: 1e-4,
            charmm_version: DEFAULT_CHARMM_VERSION,
            title: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct FluctmatchConfigBuilder {
    prefix: Option<String>,
    temperature: Option<f64>,
    alpha: Option<f64>,
    max_cycles: Option<usize>,
    tolerance: Option<f64>,
    charmm_version: Option<u32>,
    title: Vec<String>,
}

impl FluctmatchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }
    pub fn temperature(mut self, kelvin: f64) -> Self {
        self.temperature = Some(kelvin);
        self
    }
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }
    pub fn max_cycles(mut self, cycles: usize) -> Self {
        self.max_cycles = Some(cycles);
        self
    }
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
    pub fn charmm_version(mut self, version: u32) -> Self {
        self.charmm_version = Some(version);
        self
    }
    pub fn title_line(mut self, line: &str) -> Self {
        self.title.push(line.to_string());
        self
    }

    pub fn build(self) -> Result<FluctmatchConfig, ConfigError> {
        let defaults = FluctmatchConfig::default();
        let config = FluctmatchConfig {
            prefix: self.prefix.unwrap_or(defaults.prefix),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            alpha: self.alpha.unwrap_or(defaults.alpha),
            max_cycles: self.max_cycles.unwrap_or(defaults.max_cycles),
            tolerance: self.tolerance.unwrap_or(defaults.tolerance),
            charmm_version: self.charmm_version.unwrap_or(defaults.charmm_version),
            title: self.title,
        };
        check_temperature(config.temperature)?;
        if !(config.alpha.is_finite() && config.alpha > 0.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "alpha",
                reason: format!("must be positive, got {}", config.alpha),
            });
        }
        if config.max_cycles == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "max_cycles",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(config.tolerance.is_finite() && config.tolerance >= 0.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "tolerance",
                reason: format!("must not be negative, got {}", config.tolerance),
            });
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_builder_fills_defaults() {
        let config = SplitConfigBuilder::new()
            .data_dir("data".into())
            .topology("md.tpr".into())
            .trajectory("md.xtc".into())
            .outfile("aa.xtc")
            .build()
            .unwrap();

        assert_eq!(config.logfile, "split.log");
        assert_eq!(config.system, 0);
        assert_eq!((config.start, config.stop, config.window_size), (1, 10_000, 10_000));
        assert_eq!(config.toppar, PathBuf::from("/opt/local/charmm/c41b1/toppar"));
        assert_eq!(config.index, None);
    }

    #[test]
    fn split_builder_reports_missing_and_invalid_values() {
        assert_eq!(
            SplitConfigBuilder::new().build(),
            Err(ConfigError::MissingParameter("data_dir"))
        );

        let result = SplitConfigBuilder::new()
            .data_dir("data".into())
            .topology("md.tpr".into())
            .trajectory("md.xtc".into())
            .outfile("aa.xtc")
            .window_size(1)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                parameter: "window_size",
                ..
            })
        ));
    }

    #[test]
    fn setup_builder_requires_outdir_and_prefix() {
        assert_eq!(
            SetupConfigBuilder::new().prefix("cg").build(),
            Err(ConfigError::MissingParameter("outdir"))
        );
        let config = SetupConfigBuilder::new()
            .outdir("out".into())
            .prefix("cg")
            .build()
            .unwrap();
        assert!(config.write_traj);
        assert_eq!(config.temperature, 300.0);
    }

    #[test]
    fn thermo_builder_rejects_non_positive_temperature() {
        assert!(ThermoConfigBuilder::new().temperature(0.0).build().is_err());
        assert_eq!(
            ThermoConfigBuilder::new().build().unwrap(),
            ThermoConfig::default()
        );
    }

    #[test]
    fn fluctmatch_builder_validates_the_iteration() {
        assert_eq!(
            FluctmatchConfigBuilder::new().build().unwrap(),
            FluctmatchConfig::default()
        );
        assert!(matches!(
            FluctmatchConfigBuilder::new().max_cycles(0).build(),
            Err(ConfigError::InvalidValue {
                parameter: "max_cycles",
                ..
            })
        ));
        assert!(matches!(
            FluctmatchConfigBuilder::new().alpha(-0.5).build(),
            Err(ConfigError::InvalidValue {
                parameter: "alpha",
                ..
            })
        ));
    }
}
