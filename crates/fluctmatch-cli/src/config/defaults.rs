use fluctmatch::engine::config::{DEFAULT_CHARMM_VERSION, DEFAULT_TEMPERATURE};

/// Built-in values used when neither the command line nor the configuration
/// file sets them.
pub struct DefaultsConfig {
    pub charmm_executable: String,
    pub charmm_version: u32,
    pub gmx_executable: String,
    pub temperature: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            charmm_executable: "charmm".to_string(),
            charmm_version: DEFAULT_CHARMM_VERSION,
            gmx_executable: "gmx".to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}
