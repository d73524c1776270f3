pub mod defaults;

use crate::error::{CliError, Result};
use defaults::DefaultsConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialCharmmConfig {
    executable: Option<String>,
    version: Option<u32>,
    toppar: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialGromacsConfig {
    executable: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialThermoConfig {
    temperature: Option<f64>,
}

/// Contents of the optional `--config` TOML file.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialFileConfig {
    charmm: Option<PartialCharmmConfig>,
    gromacs: Option<PartialGromacsConfig>,
    thermo: Option<PartialThermoConfig>,
}

/// Settings shared by the subcommands once the file and defaults are merged.
/// Command-line flags are applied on top by each command.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub charmm_executable: String,
    pub charmm_version: u32,
    /// `None` means the default directory for `charmm_version`.
    pub toppar: Option<PathBuf>,
    pub gmx_executable: String,
    pub temperature: f64,
}

impl PartialFileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::parsing(path, e))
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn resolve(self, defaults: &DefaultsConfig) -> Result<Settings> {
        let charmm = self.charmm.unwrap_or_default();
        let gromacs = self.gromacs.unwrap_or_default();
        let thermo = self.thermo.unwrap_or_default();

        let temperature = thermo.temperature.unwrap_or(defaults.temperature);
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(CliError::Config(format!(
                "`thermo.temperature` must be positive, got {}",
                temperature
            )));
        }

        Ok(Settings {
            charmm_executable: charmm
                .executable
                .unwrap_or_else(|| defaults.charmm_executable.clone()),
            charmm_version: charmm.version.unwrap_or(defaults.charmm_version),
            toppar: charmm.toppar,
            gmx_executable: gromacs
                .executable
                .unwrap_or_else(|| defaults.gmx_executable.clone()),
            temperature,
        })
    }
}
