use super::error::EngineError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

const GROMACS_HINT: &str =
    "Gromacs 5.0+ is required. If installed, please ensure that it is in your path.";
const CHARMM_HINT: &str = "CHARMM is required. If installed, please ensure that it is in your path.";
const GENERIC_HINT: &str = "Please ensure that it is installed and in your path.";

fn hint_for(name: &str) -> &'static str {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if stem.starts_with("gmx") {
        GROMACS_HINT
    } else if stem.contains("charmm") {
        CHARMM_HINT
    } else {
        GENERIC_HINT
    }
}

/// Resolves an executable name (or path) against `PATH`.
pub fn find_executable(name: &str) -> Result<PathBuf, EngineError> {
    which::which(name).map_err(|_| EngineError::ExecutableNotFound {
        program: name.to_string(),
        hint: hint_for(name),
    })
}

/// Runs `command` to completion with stdout and stderr redirected into
/// `log_path`, optionally feeding `stdin` to it.
pub fn run_command(
    mut command: Command,
    stdin: Option<&str>,
    log_path: &Path,
) -> Result<(), EngineError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let log = File::create(log_path)?;
    command
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log))
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

    debug!(command = ?command, log = %log_path.display(), "Running external program");
    let mut child = command.spawn()?;
    if let (Some(text), Some(mut pipe)) = (stdin, child.stdin.take()) {
        writeln!(pipe, "{}", text)?;
    }
    let status = child.wait()?;

    if !status.success() {
        return Err(EngineError::CommandFailed {
            program,
            status,
            log: log_path.to_path_buf(),
        });
    }
    info!(program = %program, "External program finished");
    Ok(())
}
