use crate::engine::config::SplitConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::runner::{find_executable, run_command};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, instrument};

/// One overlapping slice of the trajectory, written to `data_dir/<index>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub index: usize,
    /// First frame, inclusive.
    pub start: usize,
    /// Last frame, inclusive.
    pub stop: usize,
}

impl Window {
    pub fn dirname(&self) -> String {
        self.index.to_string()
    }
}

/// Half-overlapping windows of `window_size` frames between `start` and
/// `stop` (inclusive).
///
/// Consecutive windows start `window_size / 2` frames apart. When `start`
/// lies at least one full window into the trajectory, the first window
/// begins half a window earlier so that it overlaps the preceding range.
pub fn windows(start: usize, stop: usize, window_size: usize) -> Result<Vec<Window>, EngineError> {
    if window_size < 2 {
        return Err(EngineError::InvalidWindowSize(window_size));
    }
    let half = window_size / 2;
    let beg = if start >= window_size { start - half } else { start };

    let starts = (beg..=stop).step_by(half);
    let stops = (beg + window_size - 1..=stop).step_by(half);
    Ok(starts
        .zip(stops)
        .map(|(start, stop)| Window {
            index: stop / half - 1,
            start,
            stop,
        })
        .collect())
}

/// Extracts one window of a trajectory with an external program.
pub trait Splitter: Sync {
    fn program(&self) -> &Path;

    /// Writes the window's trajectory into `subdir`.
    fn split(&self, window: &Window, subdir: &Path, config: &SplitConfig) -> Result<(), EngineError>;
}

/// Splits with `gmx trjconv`.
#[derive(Debug, Clone)]
pub struct GmxSplitter {
    executable: PathBuf,
}

impl GmxSplitter {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }

    /// Resolves `name` on `PATH`.
    pub fn locate(name: &str) -> Result<Self, EngineError> {
        Ok(Self::new(find_executable(name)?))
    }

    pub fn command(&self, window: &Window, subdir: &Path, config: &SplitConfig) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .arg("trjconv")
            .arg("-s")
            .arg(&config.topology)
            .arg("-f")
            .arg(&config.trajectory);
        if let Some(index) = &config.index {
            command.arg("-n").arg(index);
        }
        command
            .arg("-o")
            .arg(subdir.join(&config.outfile))
            .arg("-b")
            .arg(window.start.to_string())
            .arg("-e")
            .arg(window.stop.to_string());
        command
    }
}

impl Splitter for GmxSplitter {
    fn program(&self) -> &Path {
        &self.executable
    }

    fn split(&self, window: &Window, subdir: &Path, config: &SplitConfig) -> Result<(), EngineError> {
        let command = self.command(window, subdir, config);
        run_command(
            command,
            Some(&config.system.to_string()),
            &subdir.join(&config.logfile),
        )
    }
}

/// Splits by merging frames with CHARMM.
#[derive(Debug, Clone)]
pub struct CharmmSplitter {
    executable: PathBuf,
}

pub const CHARMM_SPLIT_INPUT: &str = "split.inp";

impl CharmmSplitter {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }

    pub fn locate(name: &str) -> Result<Self, EngineError> {
        Ok(Self::new(find_executable(name)?))
    }

    /// CHARMM input extracting `window` from the trajectory.
    pub fn render_input(&self, window: &Window, subdir: &Path, config: &SplitConfig) -> String {
        let format = if config.charmm_version >= 36 {
            "ioformat extended\n"
        } else {
            ""
        };
        format!(
            "* Extract frames {start} to {stop} of {trajectory}\n\
             *\n\
             bomlev -2\n\
             {format}\
             set toppar = {toppar}\n\
             stream @toppar/toppar.str\n\
             \n\
             read psf card name {topology}\n\
             \n\
             open read unform unit 11 name {trajectory}\n\
             open write unform unit 12 name {outfile}\n\
             merge firstu 11 nunit 1 output 12 begin {start} stop {stop} skip 1\n\
             close unit 11\n\
             close unit 12\n\
             \n\
             stop\n",
            start = window.start,
            stop = window.stop,
            format = format,
            toppar = config.toppar.display(),
            topology = config.topology.display(),
            trajectory = config.trajectory.display(),
            outfile = subdir.join(&config.outfile).display(),
        )
    }
}

impl Splitter for CharmmSplitter {
    fn program(&self) -> &Path {
        &self.executable
    }

    fn split(&self, window: &Window, subdir: &Path, config: &SplitConfig) -> Result<(), EngineError> {
        let input = subdir.join(CHARMM_SPLIT_INPUT);
        fs::write(&input, self.render_input(window, subdir, config))?;

        let logfile = subdir.join(&config.logfile);
        let mut command = Command::new(&self.executable);
        command
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(&logfile)
            .current_dir(subdir);
        run_command(command, None, &subdir.join(format!("{}.out", config.logfile)))
    }
}

/// Runs `splitter` over every window in parallel.
///
/// Each window is written to its own subdirectory of `config.data_dir`. The
/// first failing window aborts the run and is named in the error.
#[instrument(skip_all, name = "split_workflow")]
pub fn split_trajectory(
    splitter: &dyn Splitter,
    windows: &[Window],
    config: &SplitConfig,
    reporter: &ProgressReporter,
) -> Result<Vec<PathBuf>, EngineError> {
    info!(
        program = %splitter.program().display(),
        windows = windows.len(),
        "Splitting trajectory into windows."
    );
    reporter.report(Progress::PhaseStart {
        name: "Splitting trajectory",
    });
    reporter.report(Progress::TaskStart {
        total_steps: windows.len() as u64,
    });

    let result = windows
        .par_iter()
        .map(|window| {
            let subdir = config.data_dir.join(window.dirname());
            fs::create_dir_all(&subdir)
                .map_err(EngineError::from)
                .and_then(|_| splitter.split(window, &subdir, config))
                .map_err(|e| EngineError::Window {
                    window: window.dirname(),
                    source: Box::new(e),
                })?;
            reporter.report(Progress::TaskIncrement);
            Ok(subdir)
        })
        .collect::<Result<Vec<_>, EngineError>>();

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::SplitConfigBuilder;
    use std::ffi::OsStr;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn config(data_dir: &Path) -> SplitConfig {
        SplitConfigBuilder::new()
            .data_dir(data_dir.to_path_buf())
            .topology("md.tpr".into())
            .trajectory("md.xtc".into())
            .outfile("aa.xtc")
            .system(3)
            .build()
            .unwrap()
    }

    #[test]
    fn windows_overlap_by_half() {
        let w = windows(1, 40, 20).unwrap();
        assert_eq!(
            w,
            vec![
                Window { index: 1, start: 1, stop: 20 },
                Window { index: 2, start: 11, stop: 30 },
                Window { index: 3, start: 21, stop: 40 },
            ]
        );
    }

    #[test]
    fn late_start_begins_half_a_window_early() {
        let w = windows(20, 50, 10).unwrap();
        assert_eq!(w[0], Window { index: 3, start: 15, stop: 24 });
        assert_eq!(w.last().unwrap().stop, 49);
    }

    #[test]
    fn short_ranges_and_bad_sizes() {
        assert!(windows(1, 5, 10).unwrap().is_empty());
        assert!(matches!(windows(1, 5, 1), Err(EngineError::InvalidWindowSize(1))));
    }

    #[test]
    fn gmx_command_always_uses_trjconv() {
        let dir = tempdir().unwrap();
        let mut config = config(dir.path());
        let splitter = GmxSplitter::new("gmx".into());
        let window = Window { index: 1, start: 1, stop: 20 };

        let command = splitter.command(&window, Path::new("data/1"), &config);
        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(args[0], "trjconv");
        assert!(!args.contains(&OsStr::new("-n")));

        config.index = Some("index.ndx".into());
        let command = splitter.command(&window, Path::new("data/1"), &config);
        let args: Vec<String> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "trjconv", "-s", "md.tpr", "-f", "md.xtc", "-n", "index.ndx", "-o",
                "data/1/aa.xtc", "-b", "1", "-e", "20"
            ]
        );
    }

    #[test]
    fn charmm_input_names_window_files() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        let window = Window { index: 2, start: 11, stop: 30 };
        let text = CharmmSplitter::new("charmm".into()).render_input(&window, Path::new("data/2"), &config);

        assert!(text.contains("begin 11 stop 30"));
        assert!(text.contains("name data/2/aa.xtc"));
        assert!(text.contains("ioformat extended"));
        assert!(text.contains("set toppar = /opt/local/charmm/c41b1/toppar"));
    }

    struct RecordingSplitter {
        seen: Mutex<Vec<usize>>,
        fail_on: Option<usize>,
    }

    impl Splitter for RecordingSplitter {
        fn program(&self) -> &Path {
            Path::new("record")
        }

        fn split(&self, window: &Window, subdir: &Path, _: &SplitConfig) -> Result<(), EngineError> {
            assert!(subdir.is_dir());
            self.seen.lock().unwrap().push(window.index);
            match self.fail_on {
                Some(index) if index == window.index => Err(EngineError::NoFrames),
                _ => Ok(()),
            }
        }
    }

    #[test]
    fn every_window_gets_a_subdirectory() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        let splitter = RecordingSplitter { seen: Mutex::new(Vec::new()), fail_on: None };
        let w = windows(1, 40, 20).unwrap();

        let dirs = split_trajectory(&splitter, &w, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(dirs.len(), 3);
        assert!(dir.path().join("3").is_dir());
        let mut seen = splitter.seen.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn failures_name_the_window() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        let splitter = RecordingSplitter { seen: Mutex::new(Vec::new()), fail_on: Some(2) };
        let w = windows(1, 40, 20).unwrap();

        match split_trajectory(&splitter, &w, &config, &ProgressReporter::new()) {
            Err(EngineError::Window { window, .. }) => assert_eq!(window, "2"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
