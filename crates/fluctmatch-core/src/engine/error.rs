use std::convert::Infallible;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::cor::CorError;
use crate::core::io::dcd::DcdError;
use crate::core::io::psf::PsfError;
use crate::core::models::system::TopologyError;
use crate::core::tables::TableError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("PSF error: {0}")]
    Psf(#[from] PsfError),

    #[error("Coordinate file error: {0}")]
    Cor(#[from] CorError),

    #[error("Trajectory error: {0}")]
    Dcd(#[from] DcdError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Frame has {found} atoms but the analysis expects {expected}")]
    AtomCount { expected: usize, found: usize },

    #[error("No frames were selected from the trajectory")]
    NoFrames,

    #[error("Frame step must be at least 1 (got {0})")]
    InvalidStep(usize),

    #[error("Unknown statistic '{0}': expected 'mean', 'std' or 'both'")]
    UnknownStatFunc(String),

    #[error("Unknown coarse-grained model '{0}'")]
    UnknownModel(String),

    #[error("Model '{model}' has no bead named '{bead}'")]
    UnknownBead { model: String, bead: String },

    #[error("Model '{model}' selected no atoms")]
    EmptyModel { model: String },

    #[error("Row {0} is missing from one of the tables")]
    MissingRow(String),

    #[error("Topologies differ in size: {left} vs {right} atoms")]
    TopologyMismatch { left: usize, right: usize },

    #[error("No residue {resid} in segment '{segid}'")]
    UnknownResidue { segid: String, resid: isize },

    #[error("Atom name '{0}' does not occur in the fluctmatch topology")]
    UnknownAtomName(String),

    #[error("Window size must be at least 2 (got {0})")]
    InvalidWindowSize(usize),

    #[error("No window subdirectories found in {0}")]
    NoWindows(PathBuf),

    #[error("Window {window} failed: {source}")]
    Window {
        window: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("Executable '{program}' not found. {hint}")]
    ExecutableNotFound { program: String, hint: &'static str },

    #[error("'{program}' exited with {status}; see {}", log.display())]
    CommandFailed {
        program: String,
        status: ExitStatus,
        log: PathBuf,
    },
}

impl From<Infallible> for EngineError {
    fn from(e: Infallible) -> Self {
        match e {}
    }
}
