//! Streaming trajectory statistics: average structures and bond-length
//! statistics.

use super::analysis::FrameAnalysis;
use super::error::EngineError;
use crate::core::models::frame::Frame;
use crate::core::models::system::MolecularSystem;
use crate::core::tables::{BondKey, Table, TableError};
use nalgebra::{Point3, Vector3};
use std::str::FromStr;

/// Name of the value column of bond-length tables.
pub const BOND_COLUMN: &str = "r_IJ";

/// Per-atom mean position over the analysed frames, in file order.
pub struct AverageStructure {
    mean: Vec<Vector3<f64>>,
    count: usize,
}

impl AverageStructure {
    pub fn new(n_atoms: usize) -> Self {
        Self {
            mean: vec![Vector3::zeros(); n_atoms],
            count: 0,
        }
    }
}

impl FrameAnalysis for AverageStructure {
    type Output = Vec<Point3<f64>>;

    fn n_atoms(&self) -> usize {
        self.mean.len()
    }

    fn single_frame(&mut self, frame: &Frame) {
        self.count += 1;
        let n = self.count as f64;
        for (mean, position) in self.mean.iter_mut().zip(&frame.positions) {
            *mean += (position.coords - *mean) / n;
        }
    }

    fn conclude(self) -> Self::Output {
        self.mean.into_iter().map(Point3::from).collect()
    }
}

/// Which statistics [`BondStats`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatFunc {
    Mean,
    Std,
    Both,
}

impl FromStr for StatFunc {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(Self::Mean),
            "std" => Ok(Self::Std),
            "both" => Ok(Self::Both),
            other => Err(EngineError::UnknownStatFunc(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BondStatsOutput {
    Mean(Table<BondKey>),
    Std(Table<BondKey>),
    Both {
        mean: Table<BondKey>,
        std: Table<BondKey>,
    },
}

impl BondStatsOutput {
    pub fn mean(&self) -> Option<&Table<BondKey>> {
        match self {
            Self::Mean(t) | Self::Both { mean: t, .. } => Some(t),
            Self::Std(_) => None,
        }
    }

    pub fn std(&self) -> Option<&Table<BondKey>> {
        match self {
            Self::Std(t) | Self::Both { std: t, .. } => Some(t),
            Self::Mean(_) => None,
        }
    }
}

/// Bond-length mean and population standard deviation, accumulated with
/// Welford's algorithm so the trajectory is never held in memory.
pub struct BondStats {
    keys: Vec<BondKey>,
    pairs: Vec<(usize, usize)>,
    n_atoms: usize,
    func: StatFunc,
    count: usize,
    mean: Vec<f64>,
    m2: Vec<f64>,
}

impl BondStats {
    pub fn new(system: &MolecularSystem, func: StatFunc) -> Self {
        let (keys, pairs): (Vec<_>, Vec<_>) = labelled_bonds(system).into_iter().unzip();
        let n_bonds = keys.len();
        Self {
            keys,
            pairs,
            n_atoms: system.n_atoms(),
            func,
            count: 0,
            mean: vec![0.0; n_bonds],
            m2: vec![0.0; n_bonds],
        }
    }

    fn table(&self, values: impl Iterator<Item = f64>) -> Result<Table<BondKey>, TableError> {
        Table::from_column(BOND_COLUMN, self.keys.iter().cloned().zip(values))
    }
}

impl FrameAnalysis for BondStats {
    type Output = Result<BondStatsOutput, TableError>;

    fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    fn single_frame(&mut self, frame: &Frame) {
        self.count += 1;
        let n = self.count as f64;
        for (k, &(i, j)) in self.pairs.iter().enumerate() {
            let r = (frame.positions[i] - frame.positions[j]).norm();
            let delta = r - self.mean[k];
            self.mean[k] += delta / n;
            self.m2[k] += delta * (r - self.mean[k]);
        }
    }

    fn conclude(self) -> Self::Output {
        let n = self.count.max(1) as f64;
        let mean = || self.table(self.mean.iter().copied());
        let std = || self.table(self.m2.iter().map(|m2| (m2 / n).sqrt()));
        Ok(match self.func {
            StatFunc::Mean => BondStatsOutput::Mean(mean()?),
            StatFunc::Std => BondStatsOutput::Std(std()?),
            StatFunc::Both => BondStatsOutput::Both {
                mean: mean()?,
                std: std()?,
            },
        })
    }
}

/// Labels every bond of `system` with a [`BondKey`] and pairs it with the
/// file-order indices of its atoms.
pub fn labelled_bonds(system: &MolecularSystem) -> Vec<(BondKey, (usize, usize))> {
    system
        .bonds()
        .iter()
        .filter_map(|bond| {
            let (seg_i, res_i, _) = system.atom_labels(bond.atom1_id)?;
            let (seg_j, res_j, _) = system.atom_labels(bond.atom2_id)?;
            let atom_i = system.atom(bond.atom1_id)?;
            let atom_j = system.atom(bond.atom2_id)?;
            let key = BondKey::new(
                (seg_i, res_i, atom_i.name.as_str()),
                (seg_j, res_j, atom_j.name.as_str()),
            );
            let pair = (
                system.atom_index(bond.atom1_id)?,
                system.atom_index(bond.atom2_id)?,
            );
            Some((key, pair))
        })
        .collect()
}

/// The internal-coordinate table of a system: one row per bond with
/// `r_IJ = 0`.
pub fn create_empty_table(system: &MolecularSystem) -> Result<Table<BondKey>, TableError> {
    Table::from_column(
        BOND_COLUMN,
        labelled_bonds(system).into_iter().map(|(key, _)| (key, 0.0)),
    )
}
