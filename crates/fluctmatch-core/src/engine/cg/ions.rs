use super::CgModel;
use crate::core::models::system::TopologyError;
use crate::engine::error::EngineError;
use crate::core::models::ids::AtomId;
use crate::core::models::system::MolecularSystem;
use crate::core::selection::Selection;
use std::collections::BTreeSet;

const TYPE_OFFSET: usize = 10;

/// Monatomic solvent ions: one bead per ion, typed by residue name.
pub struct IonsModel;

impl CgModel for IonsModel {
    fn name(&self) -> &'static str {
        "ions"
    }

    fn description(&self) -> &'static str {
        "Common ions within solvent (Li K Na F Cl Br I)"
    }

    fn mapping(&self) -> Vec<(&'static str, Selection)> {
        vec![("ION", Selection::Ions)]
    }

    fn atom_types(&self, system: &MolecularSystem) -> Result<Vec<String>, EngineError> {
        let resnames: BTreeSet<&str> = system
            .residues_iter()
            .map(|(_, r)| r.name.as_str())
            .collect();
        let resnames: Vec<&str> = resnames.into_iter().collect();
        system
            .atoms_iter()
            .map(|(id, _)| -> Result<String, EngineError> {
                let resname = system
                    .residue_of(id)
                    .map(|r| r.name.as_str())
                    .ok_or(TopologyError::NoResidue)?;
                let index = resnames
                    .binary_search(&resname)
                    .map_err(|_| TopologyError::NoResidue)?;
                Ok((index + TYPE_OFFSET).to_string())
            })
            .collect()
    }

    fn bonds(&self, _system: &MolecularSystem) -> Vec<(AtomId, AtomId)> {
        Vec::new()
    }

    fn guess_bonds(&self) -> bool {
        false
    }
}
