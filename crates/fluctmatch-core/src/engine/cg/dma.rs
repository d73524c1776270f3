use super::CgModel;
use crate::engine::error::EngineError;
use crate::core::models::ids::AtomId;
use crate::core::models::system::MolecularSystem;
use crate::core::selection::Selection;

const BEADS: [&str; 4] = ["C1", "N", "C2", "C3"];
const TYPE_OFFSET: usize = 4;

/// N,N-dimethylacetamide solvent: four beads per molecule.
pub struct DmaModel;

impl CgModel for DmaModel {
    fn name(&self) -> &'static str {
        "dma"
    }

    fn description(&self) -> &'static str {
        "c.o.m./c.o.g. of C1, N, C2, and C3 of DMA"
    }

    fn mapping(&self) -> Vec<(&'static str, Selection)> {
        vec![
            ("C1", Selection::residue("DMA", &["C1", "H1*"])),
            ("N", Selection::residue("DMA", &["C", "N", "O"])),
            ("C2", Selection::residue("DMA", &["C2", "H2*"])),
            ("C3", Selection::residue("DMA", &["C3", "H3*"])),
        ]
    }

    fn atom_types(&self, system: &MolecularSystem) -> Result<Vec<String>, EngineError> {
        system
            .atoms_iter()
            .map(|(_, atom)| -> Result<String, EngineError> {
                let position = BEADS.iter().position(|&b| b == atom.name).ok_or_else(|| {
                    EngineError::UnknownBead {
                        model: self.name().to_string(),
                        bead: atom.name.clone(),
                    }
                })?;
                Ok((position + TYPE_OFFSET).to_string())
            })
            .collect()
    }

    /// C1-N, N-C2 and N-C3 within each molecule.
    fn bonds(&self, system: &MolecularSystem) -> Vec<(AtomId, AtomId)> {
        let mut bonds = Vec::new();
        for (_, residue) in system.residues_iter() {
            let find = |name: &str| {
                residue
                    .atoms()
                    .iter()
                    .copied()
                    .find(|&id| system.atom(id).is_some_and(|a| a.name == name))
            };
            let n = find("N");
            for other in ["C1", "C2", "C3"] {
                if let (Some(n), Some(c)) = (n, find(other)) {
                    if other == "C1" {
                        bonds.push((c, n));
                    } else {
                        bonds.push((n, c));
                    }
                }
            }
        }
        bonds
    }
}
