use crate::core::io::psf::PsfFile;
use crate::core::io::traits::TopologyFile;
use crate::core::models::system::MolecularSystem;
use crate::core::tables::{BondKey, NamedBondKey, Table};
use crate::engine::error::EngineError;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, instrument};

fn residue_name<'a>(
    cg: &'a MolecularSystem,
    segid: &str,
    resid: isize,
) -> Result<&'a str, EngineError> {
    cg.find_residue_by_label(segid, resid)
        .map(|r| r.name.as_str())
        .ok_or_else(|| EngineError::UnknownResidue {
            segid: segid.to_string(),
            resid,
        })
}

/// Relabels a fluctuation-matching table with the bead and residue names
/// of the coarse-grained topology.
///
/// `fm` is the topology the table was written against; its atom names are
/// mapped position by position onto those of `cg`.
pub fn convert_table(
    cg: &MolecularSystem,
    fm: &MolecularSystem,
    table: &Table<BondKey>,
) -> Result<Table<NamedBondKey>, EngineError> {
    if cg.n_atoms() != fm.n_atoms() {
        return Err(EngineError::TopologyMismatch {
            left: cg.n_atoms(),
            right: fm.n_atoms(),
        });
    }
    let names: HashMap<&str, &str> = fm
        .atom_ids()
        .iter()
        .zip(cg.atom_ids())
        .filter_map(|(&f, &c)| Some((fm.atom(f)?.name.as_str(), cg.atom(c)?.name.as_str())))
        .collect();
    let rename = |name: &str| {
        names
            .get(name)
            .map(|n| n.to_string())
            .ok_or_else(|| EngineError::UnknownAtomName(name.to_string()))
    };

    let mut result = Table::new(table.columns().to_vec());
    for (key, row) in table.rows() {
        let named = NamedBondKey {
            segid_i: key.segid_i.clone(),
            resid_i: key.resid_i,
            resname_i: residue_name(cg, &key.segid_i, key.resid_i)?.to_string(),
            atom_i: rename(&key.atom_i)?,
            segid_j: key.segid_j.clone(),
            resid_j: key.resid_j,
            resname_j: residue_name(cg, &key.segid_j, key.resid_j)?.to_string(),
            atom_j: rename(&key.atom_j)?,
        };
        result.push_row(named, row.to_vec())?;
    }
    Ok(result)
}

/// Reads both PSF topologies and the table, converts, and writes `outfile`.
#[instrument(skip_all, name = "table_convert_workflow")]
pub fn convert_table_file(
    cg_topology: &Path,
    fm_topology: &Path,
    table: &Path,
    outfile: &Path,
) -> Result<Table<NamedBondKey>, EngineError> {
    let cg = PsfFile::read_from_path(cg_topology)?;
    let fm = PsfFile::read_from_path(fm_topology)?;
    info!(table = %table.display(), "Loading table.");
    let table = Table::read_from_path(table)?;

    let converted = convert_table(&cg, &fm, &table)?;
    converted.write_to_path(outfile)?;
    info!(outfile = %outfile.display(), rows = converted.n_rows(), "Converted table written.");
    Ok(converted)
}
