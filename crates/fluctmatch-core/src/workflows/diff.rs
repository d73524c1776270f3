use crate::core::tables::{ResidueKey, ResiduePairKey, Table};
use crate::engine::error::EngineError;
use crate::engine::paramtable::ParamTable;
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

pub const COUPLING_FILE: &str = "dcoupling.txt";
pub const PER_RESIDUE_FILE: &str = "dperres.txt";
pub const INTERACTIONS_FILE: &str = "dinteractions.txt";

#[derive(Debug, Clone, PartialEq)]
pub struct TableDifference {
    pub coupling: ParamTable,
    pub per_residue: Table<ResidueKey>,
    pub interactions: Table<ResiduePairKey>,
}

/// Compares two parameter tables.
///
/// Writes the bond-wise difference `table1 - table2` together with the
/// differences of their per-residue and residue-pair aggregates.
#[instrument(skip_all, name = "diff_workflow")]
pub fn diff_tables(
    table1: &Path,
    table2: &Path,
    ressep: isize,
    outdir: &Path,
) -> Result<TableDifference, EngineError> {
    let left = ParamTable::from_file(table1, ressep)?;
    let right = ParamTable::from_file(table2, ressep)?;
    info!(
        left = %table1.display(),
        right = %table2.display(),
        ressep,
        "Comparing parameter tables."
    );

    let coupling = &left - &right;
    let per_residue = left.per_residue().subtract(&right.per_residue());
    let interactions = left.interactions().subtract(&right.interactions());

    fs::create_dir_all(outdir)?;
    coupling.write(outdir.join(COUPLING_FILE))?;
    per_residue.write_to_path(outdir.join(PER_RESIDUE_FILE))?;
    interactions.write_to_path(outdir.join(INTERACTIONS_FILE))?;

    Ok(TableDifference {
        coupling,
        per_residue,
        interactions,
    })
}
