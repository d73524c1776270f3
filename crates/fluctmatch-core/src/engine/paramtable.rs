use super::error::EngineError;
use crate::core::tables::{BondKey, ResidueKey, ResiduePairKey, Table};
use std::ops::Sub;
use std::path::Path;

pub const DEFAULT_RESSEP: isize = 3;

/// A bond-parameter table (one column per window) with the residue
/// separation used when aggregating it per residue.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTable {
    table: Table<BondKey>,
    ressep: isize,
}

impl ParamTable {
    pub fn new(table: Table<BondKey>, ressep: isize) -> Self {
        Self { table, ressep }
    }

    pub fn from_file<P: AsRef<Path>>(path: P, ressep: isize) -> Result<Self, EngineError> {
        Ok(Self::new(Table::read_from_path(path)?, ressep))
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), EngineError> {
        self.table.write_to_path(path)?;
        Ok(())
    }

    pub fn table(&self) -> &Table<BondKey> {
        &self.table
    }

    pub fn ressep(&self) -> isize {
        self.ressep
    }

    /// Whether a bond takes part in residue aggregations: it joins different
    /// segments or residues at least `ressep` apart.
    pub fn is_separated(&self, key: &BondKey) -> bool {
        key.segid_i != key.segid_j || (key.resid_i - key.resid_j).abs() >= self.ressep
    }

    /// Sum over separated bonds in which each residue appears, as I or J.
    pub fn per_residue(&self) -> Table<ResidueKey> {
        let mut result = Table::new(self.table.columns().to_vec());
        for (key, row) in self.table.rows() {
            if !self.is_separated(key) {
                continue;
            }
            for residue in [key.residue_i(), key.residue_j()] {
                for (col, &value) in row.iter().enumerate() {
                    result.accumulate(&residue, col, value);
                }
            }
        }
        result.sort_rows();
        result
    }

    /// Sum over separated bonds grouped by residue pair.
    pub fn interactions(&self) -> Table<ResiduePairKey> {
        let mut result = Table::new(self.table.columns().to_vec());
        for (key, row) in self.table.rows() {
            if !self.is_separated(key) {
                continue;
            }
            let pair = key.residue_pair();
            for (col, &value) in row.iter().enumerate() {
                result.accumulate(&pair, col, value);
            }
        }
        result.sort_rows();
        result
    }
}

impl Sub for &ParamTable {
    type Output = ParamTable;

    fn sub(self, other: &ParamTable) -> ParamTable {
        ParamTable::new(self.table.subtract(&other.table), self.ressep)
    }
}
