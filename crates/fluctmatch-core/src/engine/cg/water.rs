use super::CgModel;
use crate::engine::error::EngineError;
use crate::core::models::ids::AtomId;
use crate::core::models::system::MolecularSystem;
use crate::core::selection::Selection;

/// United-atom water: one bead per molecule.
pub struct WaterModel;

impl CgModel for WaterModel {
    fn name(&self) -> &'static str {
        "water"
    }

    fn description(&self) -> &'static str {
        "c.o.m./c.o.g. of whole water molecule"
    }

    fn mapping(&self) -> Vec<(&'static str, Selection)> {
        vec![("OW", Selection::Water)]
    }

    fn atom_types(&self, system: &MolecularSystem) -> Result<Vec<String>, EngineError> {
        Ok(vec!["1".to_string(); system.n_atoms()])
    }

    fn bonds(&self, _system: &MolecularSystem) -> Vec<(AtomId, AtomId)> {
        Vec::new()
    }

    fn guess_bonds(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cg::CenterMethod;
    use crate::engine::cg::test_systems::solvated_dma;

    #[test]
    fn one_unbonded_bead_per_water() {
        let cg = WaterModel.build(&solvated_dma(), CenterMethod::Mass).unwrap();

        assert_eq!(cg.n_beads(), 1);
        assert!(cg.system.bonds().is_empty());
        let (id, bead) = cg.system.atoms_iter().next().unwrap();
        assert_eq!(bead.atom_type, "1");
        assert_eq!(cg.system.atom_labels(id), Some(("SOLV", 1, "TIP3")));
    }
}
