use crate::core::io::cor::{CorFile, CorOptions};
use crate::core::io::dcd::{DcdOptions, DcdWriter};
use crate::core::io::prm::{BondParameter, PrmOptions, write_prm};
use crate::core::io::psf::{PsfFile, PsfOptions};
use crate::core::io::rtf::{RtfOptions, type_labels, write_rtf};
use crate::core::io::stream::write_stream;
use crate::core::io::traits::TopologyFile;
use crate::core::models::frame::Frame;
use crate::core::models::system::MolecularSystem;
use crate::core::tables::{BondKey, Table};
use crate::engine::analysis::{FrameRange, run_analysis};
use crate::engine::config::SetupConfig;
use crate::engine::error::EngineError;
use crate::engine::fluctmatch::{B0_COLUMN, KB_COLUMN, initial_parameters};
use crate::engine::progress::ProgressReporter;
use crate::engine::stats::{AverageStructure, BOND_COLUMN, BondStats, StatFunc};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Everything computed while writing the CHARMM files.
#[derive(Debug, Clone)]
pub struct SetupOutput {
    pub files: Vec<PathBuf>,
    pub n_frames: usize,
    /// Mean bond lengths (`r_IJ`).
    pub average: Table<BondKey>,
    /// Bond-length standard deviations (`r_IJ`).
    pub fluct: Table<BondKey>,
    /// Initial `Kb` and `b0` per bond.
    pub parameters: Table<BondKey>,
}

struct OutputFiles<'a> {
    dir: &'a Path,
    prefix: &'a str,
    written: Vec<PathBuf>,
}

impl OutputFiles<'_> {
    fn path(&mut self, suffix: &str) -> PathBuf {
        let path = self.dir.join(format!("{}.{}", self.prefix, suffix));
        self.written.push(path.clone());
        path
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, EngineError> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Removes a trajectory left behind by a failed run.
fn discard_partial(path: Option<&Path>) {
    let Some(path) = path.filter(|p| p.exists()) else {
        return;
    };
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed partial trajectory."),
        Err(e) => warn!(path = %path.display(), error = %e, "Could not remove partial trajectory."),
    }
}

/// Bond parameters keyed by bead name pairs. CHARMM allows one entry per
/// type pair, so pairs occurring more than once get the mean `Kb` and `b0`.
pub fn bond_parameters(params: &Table<BondKey>) -> Result<Vec<BondParameter>, EngineError> {
    let kb = params.column(KB_COLUMN)?;
    let b0 = params.column(B0_COLUMN)?;

    let mut order: Vec<(String, String)> = Vec::new();
    let mut sums: HashMap<(String, String), (f64, f64, usize)> = HashMap::new();
    for ((key, k), (_, b)) in kb.into_iter().zip(b0) {
        let pair = if key.atom_i <= key.atom_j {
            (key.atom_i.clone(), key.atom_j.clone())
        } else {
            (key.atom_j.clone(), key.atom_i.clone())
        };
        let entry = sums.entry(pair.clone()).or_insert_with(|| {
            order.push(pair);
            (0.0, 0.0, 0)
        });
        entry.0 += k;
        entry.1 += b;
        entry.2 += 1;
    }

    Ok(order
        .into_iter()
        .filter_map(|pair| {
            let &(k, b, n) = sums.get(&pair)?;
            Some(BondParameter {
                type_i: pair.0,
                type_j: pair.1,
                kb: k / n as f64,
                b0: b / n as f64,
            })
        })
        .collect())
}

/// The XPLOR view of a CG system: atom types are the RTF type labels,
/// usually the bead names.
fn with_name_types(system: &MolecularSystem) -> MolecularSystem {
    let labels: HashMap<String, String> = type_labels(system)
        .into_iter()
        .map(|(ty, t)| (ty, t.label))
        .collect();
    let mut xplor = system.clone();
    let ids = xplor.atom_ids().to_vec();
    for id in ids {
        if let Some(atom) = xplor.atom_mut(id) {
            if let Some(label) = labels.get(&atom.atom_type) {
                atom.atom_type = label.clone();
            }
        }
    }
    xplor
}

/// Writes the CHARMM input files for fluctuation matching of `system`.
///
/// `frames` must already be in the system's coordinates (one position per
/// bead). They are read once: the trajectory is copied to `<prefix>.dcd`
/// while the average structure and bond statistics are accumulated.
#[instrument(skip_all, name = "setup_workflow")]
pub fn write_charmm_files<I, E>(
    system: &MolecularSystem,
    frames: I,
    config: &SetupConfig,
    reporter: &ProgressReporter,
) -> Result<SetupOutput, EngineError>
where
    I: IntoIterator<Item = Result<Frame, E>>,
    EngineError: From<E>,
{
    fs::create_dir_all(&config.outdir)?;
    let mut files = OutputFiles {
        dir: &config.outdir,
        prefix: &config.prefix,
        written: Vec::new(),
    };
    let n_atoms = system.n_atoms();

    let dcd_path = config.write_traj.then(|| files.path("dcd"));
    let dcd_options = DcdOptions {
        title: config.title.clone(),
        ..DcdOptions::default()
    };
    let mut writer: Option<DcdWriter<BufWriter<File>>> = None;

    let mut n_frames = 0usize;
    let frames = frames.into_iter().map(|frame| {
        let frame = frame?;
        if let Some(path) = &dcd_path {
            // The first frame decides whether unit cells are stored.
            if writer.is_none() {
                let options = DcdOptions {
                    unit_cell: frame.unit_cell.is_some(),
                    ..dcd_options.clone()
                };
                writer = Some(DcdWriter::create(path, n_atoms, &options)?);
            }
            if let Some(writer) = writer.as_mut() {
                writer.write_frame(&frame)?;
            }
        }
        n_frames += 1;
        Ok::<_, EngineError>(frame)
    });
    let analysis = (
        AverageStructure::new(n_atoms),
        BondStats::new(system, StatFunc::Both),
    );
    let analyzed = reporter.phase("Analyzing trajectory", || {
        run_analysis::<_, _, EngineError>(analysis, frames, &FrameRange::default(), reporter)
    });
    let (positions, stats) = match analyzed {
        Ok(output) => output,
        Err(e) => {
            drop(writer);
            discard_partial(dcd_path.as_deref());
            return Err(e);
        }
    };
    if let Some(writer) = writer {
        writer.finish()?;
    }
    let stats = stats?;
    let average = stats.mean().cloned().unwrap_or_default();
    let fluct = stats.std().cloned().unwrap_or_default();
    info!(frames = n_frames, bonds = average.n_rows(), "Trajectory statistics computed.");

    let mut system = system.clone();
    system.set_positions(&positions)?;

    let rtf_options = RtfOptions {
        version: config.charmm_version,
        title: config.title.clone(),
    };
    let mut rtf = create(&files.path("rtf"))?;
    write_rtf(&system, &rtf_options, &mut rtf)?;
    rtf.flush()?;

    let mut stream = create(&files.path("stream"))?;
    write_stream(&average, BOND_COLUMN, &config.title, &mut stream)?;
    stream.flush()?;

    let psf_options = PsfOptions {
        extended: config.extended,
        xplor: false,
        title: config.title.clone(),
    };
    PsfFile::write_to_path(&system, &psf_options, files.path("psf"))?;
    let xplor_options = PsfOptions {
        xplor: true,
        ..psf_options
    };
    PsfFile::write_to_path(&with_name_types(&system), &xplor_options, files.path("xplor.psf"))?;

    let cor_options = CorOptions {
        extended: config.extended,
        title: config.title.clone(),
    };
    CorFile::write_to_path(&system, &cor_options, files.path("cor"))?;

    let parameters = initial_parameters(&average, &fluct, config.temperature)?;
    let prm_options = PrmOptions {
        title: config.title.clone(),
    };
    let mut prm = create(&files.path("prm"))?;
    write_prm(&bond_parameters(&parameters)?, &prm_options, &mut prm)?;
    prm.flush()?;

    info!(outdir = %config.outdir.display(), "CHARMM files written.");
    Ok(SetupOutput {
        files: files.written,
        n_frames,
        average,
        fluct,
        parameters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::dcd::DcdReader;
    use crate::engine::cg::test_systems::solvated_dma;
    use crate::engine::cg::{CenterMethod, CgModel, dma::DmaModel};
    use crate::engine::config::SetupConfigBuilder;
    use nalgebra::Point3;
    use std::convert::Infallible;
    use std::io;
    use tempfile::tempdir;

    fn cg_frames(system: &MolecularSystem, n: usize) -> Vec<Result<Frame, Infallible>> {
        let base = system.positions();
        (0..n)
            .map(|i| {
                let stretch = 1.0 + 0.1 * i as f64;
                let positions = base
                    .iter()
                    .map(|p| Point3::new(p.x * stretch, p.y, p.z))
                    .collect();
                Ok(Frame::new(positions))
            })
            .collect()
    }

    #[test]
    fn writes_every_file_with_the_prefix() {
        let dir = tempdir().unwrap();
        let cg = DmaModel.build(&solvated_dma(), CenterMethod::Mass).unwrap().system;
        let config = SetupConfigBuilder::new()
            .outdir(dir.path().join("out"))
            .prefix("cg")
            .build()
            .unwrap();

        let output =
            write_charmm_files(&cg, cg_frames(&cg, 3), &config, &ProgressReporter::new()).unwrap();

        assert_eq!(output.n_frames, 3);
        for suffix in ["dcd", "rtf", "stream", "psf", "xplor.psf", "cor", "prm"] {
            let path = dir.path().join("out").join(format!("cg.{}", suffix));
            assert!(path.is_file(), "missing {}", path.display());
        }
        assert_eq!(output.files.len(), 7);

        let reader = DcdReader::open(dir.path().join("out/cg.dcd")).unwrap();
        assert_eq!(reader.n_frames(), 3);
        assert_eq!(reader.n_atoms(), cg.n_atoms());

        let xplor = PsfFile::read_from_path(dir.path().join("out/cg.xplor.psf")).unwrap();
        let (_, first) = xplor.atoms_iter().next().unwrap();
        assert_eq!(first.atom_type, first.name);
    }

    #[test]
    fn parameters_follow_bond_fluctuations() {
        let dir = tempdir().unwrap();
        let cg = DmaModel.build(&solvated_dma(), CenterMethod::Mass).unwrap().system;
        let config = SetupConfigBuilder::new()
            .outdir(dir.path().to_path_buf())
            .prefix("fluctmatch")
            .write_traj(false)
            .build()
            .unwrap();

        let output =
            write_charmm_files(&cg, cg_frames(&cg, 2), &config, &ProgressReporter::new()).unwrap();

        assert!(!dir.path().join("fluctmatch.dcd").exists());
        assert_eq!(output.parameters.n_rows(), output.average.n_rows());
        assert_eq!(output.parameters.columns(), [KB_COLUMN, B0_COLUMN]);
        for (key, row) in output.parameters.rows() {
            assert!(row[0] > 0.0);
            assert_eq!(Some(row[1]), output.average.value(key, BOND_COLUMN));
        }

        let prm = fs::read_to_string(dir.path().join("fluctmatch.prm")).unwrap();
        // Both residues share bead names, so three distinct bond types remain.
        let bonds: Vec<&str> = prm
            .lines()
            .skip_while(|l| *l != "BONDS")
            .skip(1)
            .take_while(|l| !l.is_empty())
            .collect();
        assert_eq!(bonds.len(), 3);
    }

    #[test]
    fn duplicate_type_pairs_are_averaged() {
        let params = {
            let mut t = Table::new(vec![KB_COLUMN.to_string(), B0_COLUMN.to_string()]);
            t.push_row(BondKey::new(("A", 1, "N"), ("A", 1, "C1")), vec![2.0, 1.0])
                .unwrap();
            t.push_row(BondKey::new(("A", 2, "C1"), ("A", 2, "N")), vec![4.0, 3.0])
                .unwrap();
            t
        };
        let bonds = bond_parameters(&params).unwrap();
        assert_eq!(
            bonds,
            vec![BondParameter {
                type_i: "C1".to_string(),
                type_j: "N".to_string(),
                kb: 3.0,
                b0: 2.0,
            }]
        );
    }

    #[test]
    fn empty_trajectory_is_an_error() {
        let dir = tempdir().unwrap();
        let cg = DmaModel.build(&solvated_dma(), CenterMethod::Mass).unwrap().system;
        let config = SetupConfigBuilder::new()
            .outdir(dir.path().to_path_buf())
            .prefix("cg")
            .build()
            .unwrap();
        let result = write_charmm_files(&cg, cg_frames(&cg, 0), &config, &ProgressReporter::new());
        assert!(matches!(result, Err(EngineError::NoFrames)));
    }

    #[test]
    fn failed_frame_leaves_no_partial_trajectory() {
        let dir = tempdir().unwrap();
        let cg = DmaModel.build(&solvated_dma(), CenterMethod::Mass).unwrap().system;
        let config = SetupConfigBuilder::new()
            .outdir(dir.path().to_path_buf())
            .prefix("cg")
            .build()
            .unwrap();
        let positions = cg.positions();
        let frames: Vec<Result<Frame, EngineError>> = vec![
            Ok(Frame::new(positions.clone())),
            Ok(Frame::new(positions)),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated frame").into()),
        ];

        let result = write_charmm_files(&cg, frames, &config, &ProgressReporter::new());

        assert!(matches!(result, Err(EngineError::Io(_))));
        assert!(!dir.path().join("cg.dcd").exists());
        assert!(!dir.path().join("cg.psf").exists());
    }

    #[test]
    fn unit_cell_is_carried_into_the_trajectory() {
        let dir = tempdir().unwrap();
        let cg = DmaModel.build(&solvated_dma(), CenterMethod::Mass).unwrap().system;
        let config = SetupConfigBuilder::new()
            .outdir(dir.path().to_path_buf())
            .prefix("cg")
            .build()
            .unwrap();
        let cell = [31.0, 32.0, 33.0, 90.0, 90.0, 90.0];
        let frames = cg_frames(&cg, 2).into_iter().map(|frame| {
            frame.map(|mut f| {
                f.unit_cell = Some(cell);
                f
            })
        });

        write_charmm_files(&cg, frames, &config, &ProgressReporter::new()).unwrap();

        let reader = DcdReader::open(dir.path().join("cg.dcd")).unwrap();
        assert!(reader.header().has_unit_cell);
        for frame in reader {
            assert_eq!(frame.unwrap().unit_cell, Some(cell));
        }
    }
}
