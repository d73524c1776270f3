//! Coarse-grained models.
//!
//! A model maps groups of all-atom atoms to beads. Each mapping entry pairs a
//! bead name with a [`Selection`]; every residue yields one bead per entry
//! that selects at least one of its atoms. Bead positions are the mass- or
//! geometry-weighted centres of the selected atoms.

pub mod dma;
pub mod ions;
pub mod water;

use super::error::EngineError;
use crate::core::models::atom::Atom;
use crate::core::models::frame::Frame;
use crate::core::models::ids::{AtomId, ResidueId};
use crate::core::models::system::{MolecularSystem, MolecularSystemBuilder, TopologyError};
use crate::core::selection::Selection;
use nalgebra::{Point3, Vector3};
use tracing::debug;

/// How bead positions are derived from their atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CenterMethod {
    #[default]
    Mass,
    Geometry,
}

#[derive(Debug, Clone, PartialEq)]
struct Bead {
    atoms: Vec<usize>,
    weights: Vec<f64>,
}

impl Bead {
    fn center(&self, positions: &[Point3<f64>]) -> Point3<f64> {
        let sum = self
            .atoms
            .iter()
            .zip(&self.weights)
            .fold(Vector3::zeros(), |acc, (&i, &w)| acc + positions[i].coords * w);
        Point3::from(sum)
    }
}

/// A coarse-grained system together with the atom-to-bead mapping that
/// produced it.
#[derive(Debug, Clone)]
pub struct CgMapping {
    pub system: MolecularSystem,
    beads: Vec<Bead>,
    n_source_atoms: usize,
}

impl CgMapping {
    pub fn n_beads(&self) -> usize {
        self.beads.len()
    }

    /// File-order indices of the all-atom atoms forming each bead.
    pub fn bead_atoms(&self, bead: usize) -> Option<&[usize]> {
        self.beads.get(bead).map(|b| b.atoms.as_slice())
    }

    /// Maps an all-atom frame onto bead positions. The unit cell is kept.
    pub fn transform(&self, frame: &Frame) -> Result<Frame, EngineError> {
        if frame.n_atoms() != self.n_source_atoms {
            return Err(EngineError::AtomCount {
                expected: self.n_source_atoms,
                found: frame.n_atoms(),
            });
        }
        Ok(Frame {
            positions: self
                .beads
                .iter()
                .map(|b| b.center(&frame.positions))
                .collect(),
            unit_cell: frame.unit_cell,
        })
    }

    /// Concatenates several mappings of the same all-atom system into one.
    /// Beads keep the order of `parts`.
    pub fn merge(parts: Vec<CgMapping>) -> Result<CgMapping, EngineError> {
        let n_source_atoms = parts.first().map_or(0, |p| p.n_source_atoms);
        let mut builder = MolecularSystemBuilder::new();
        let mut beads = Vec::new();
        let mut offset = 0usize;

        for part in parts {
            if part.n_source_atoms != n_source_atoms {
                return Err(EngineError::TopologyMismatch {
                    left: n_source_atoms,
                    right: part.n_source_atoms,
                });
            }
            let mut current: Option<ResidueId> = None;
            for (index, (atom_id, atom)) in part.system.atoms_iter().enumerate() {
                if current != Some(atom.residue_id) {
                    let (segid, resid, resname) = part
                        .system
                        .atom_labels(atom_id)
                        .ok_or(TopologyError::NoResidue)?;
                    builder.start_segment(segid);
                    builder.start_residue(resid, resname)?;
                    current = Some(atom.residue_id);
                }
                builder.add_atom(offset + index + 1, atom.clone())?;
            }
            for (i, j) in part.system.bonded_pairs() {
                builder.add_bond(offset + i + 1, offset + j + 1)?;
            }
            offset += part.system.n_atoms();
            beads.extend(part.beads);
        }

        Ok(CgMapping {
            system: builder.build(),
            beads,
            n_source_atoms,
        })
    }
}

/// A coarse-grained model definition.
pub trait CgModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Ordered bead definitions: bead name and the atoms it covers.
    fn mapping(&self) -> Vec<(&'static str, Selection)>;

    /// Atom types of the beads of a CG system built by this model, in file
    /// order.
    fn atom_types(&self, system: &MolecularSystem) -> Result<Vec<String>, EngineError>;

    /// Bonds between beads of a CG system built by this model.
    fn bonds(&self, system: &MolecularSystem) -> Vec<(AtomId, AtomId)>;

    /// Whether the model connects its beads. Solvent models do not.
    fn guess_bonds(&self) -> bool {
        true
    }

    /// Builds the CG system for `aa`.
    fn build(&self, aa: &MolecularSystem, center: CenterMethod) -> Result<CgMapping, EngineError> {
        let mapping = self.mapping();
        let positions = aa.positions();
        let mut builder = MolecularSystemBuilder::new();
        let mut beads = Vec::new();

        for (_, segment) in aa.segments_iter() {
            for &residue_id in segment.residues() {
                let Some(residue) = aa.residue(residue_id) else {
                    continue;
                };
                let mut started = false;
                for (bead_name, selection) in &mapping {
                    let selected: Vec<(usize, &Atom)> = residue
                        .atoms()
                        .iter()
                        .filter_map(|&id| Some((aa.atom_index(id)?, aa.atom(id)?)))
                        .filter(|(_, atom)| selection.matches(atom, residue))
                        .collect();
                    if selected.is_empty() {
                        continue;
                    }
                    if !started {
                        builder.start_segment(&segment.id);
                        builder.start_residue(residue.number, &residue.name)?;
                        started = true;
                    }

                    let mass: f64 = selected.iter().map(|(_, a)| a.mass).sum();
                    let charge: f64 = selected.iter().map(|(_, a)| a.charge).sum();
                    let weights: Vec<f64> = match center {
                        CenterMethod::Mass if mass > 0.0 => {
                            selected.iter().map(|(_, a)| a.mass / mass).collect()
                        }
                        _ => vec![1.0 / selected.len() as f64; selected.len()],
                    };
                    let bead = Bead {
                        atoms: selected.iter().map(|&(i, _)| i).collect(),
                        weights,
                    };
                    let position = bead.center(&positions);
                    let atom = Atom::new(bead_name, ResidueId::default(), position)
                        .with_mass(mass)
                        .with_charge(charge);
                    builder.add_atom(beads.len() + 1, atom)?;
                    beads.push(bead);
                }
            }
        }

        if beads.is_empty() {
            return Err(EngineError::EmptyModel {
                model: self.name().to_string(),
            });
        }

        let mut system = builder.build();
        let types = self.atom_types(&system)?;
        let ids = system.atom_ids().to_vec();
        for (id, atom_type) in ids.into_iter().zip(types) {
            if let Some(atom) = system.atom_mut(id) {
                atom.atom_type = atom_type;
            }
        }
        if self.guess_bonds() {
            for (a, b) in self.bonds(&system) {
                system.add_bond(a, b);
            }
        }
        debug!(
            model = self.name(),
            beads = beads.len(),
            bonds = system.bonds().len(),
            "Built coarse-grained system"
        );

        Ok(CgMapping {
            system,
            beads,
            n_source_atoms: aa.n_atoms(),
        })
    }
}

/// All available models, in listing order.
pub fn available_models() -> Vec<Box<dyn CgModel>> {
    vec![
        Box::new(dma::DmaModel),
        Box::new(ions::IonsModel),
        Box::new(water::WaterModel),
    ]
}

pub fn model_by_name(name: &str) -> Result<Box<dyn CgModel>, EngineError> {
    available_models()
        .into_iter()
        .find(|m| m.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| EngineError::UnknownModel(name.to_string()))
}

/// Builds each named model on `aa` and merges the results in the given order.
pub fn build_models(
    aa: &MolecularSystem,
    names: &[String],
    center: CenterMethod,
) -> Result<CgMapping, EngineError> {
    let parts = names
        .iter()
        .map(|name| model_by_name(name)?.build(aa, center))
        .collect::<Result<Vec<_>, _>>()?;
    CgMapping::merge(parts)
}

#[cfg(test)]
pub(crate) mod test_systems {
    use crate::core::models::atom::Atom;
    use crate::core::models::ids::ResidueId;
    use crate::core::models::system::{MolecularSystem, MolecularSystemBuilder};
    use nalgebra::Point3;

    /// Two DMA molecules, one TIP3 water and a sodium/chloride pair.
    pub fn solvated_dma() -> MolecularSystem {
        let mut builder = MolecularSystemBuilder::new();
        let mut serial = 0;
        let mut add = |b: &mut MolecularSystemBuilder, name: &str, mass: f64, x: f64| {
            serial += 1;
            let atom = Atom::new(name, ResidueId::default(), Point3::new(x, 0.0, 0.0))
                .with_mass(mass)
                .with_charge(0.1);
            b.add_atom(serial, atom).unwrap();
        };

        builder.start_segment("DMA");
        for resid in 1..=2 {
            let x0 = 10.0 * resid as f64;
            builder.start_residue(resid, "DMA").unwrap();
            add(&mut builder, "C1", 12.0, x0);
            add(&mut builder, "H11", 1.0, x0 + 1.0);
            add(&mut builder, "C", 12.0, x0 + 2.0);
            add(&mut builder, "O", 16.0, x0 + 3.0);
            add(&mut builder, "N", 14.0, x0 + 4.0);
            add(&mut builder, "C2", 12.0, x0 + 5.0);
            add(&mut builder, "C3", 12.0, x0 + 6.0);
        }
        builder.start_segment("SOLV");
        builder.start_residue(1, "TIP3").unwrap();
        add(&mut builder, "OH2", 16.0, 50.0);
        add(&mut builder, "H1", 1.0, 51.0);
        add(&mut builder, "H2", 1.0, 52.0);
        builder.start_segment("IONS");
        builder.start_residue(1, "SOD").unwrap();
        add(&mut builder, "SOD", 23.0, 60.0);
        builder.start_residue(2, "CLA").unwrap();
        add(&mut builder, "CLA", 35.45, 70.0);
        builder.build()
    }
}
