use super::atom::Atom;
use super::ids::{AtomId, ResidueId, SegmentId};
use super::residue::Residue;
use super::segment::Segment;
use super::topology::Bond;
use nalgebra::Point3;
use slotmap::{SecondaryMap, SlotMap};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("A segment must be started before adding residues")]
    NoSegment,
    #[error("A residue must be started before adding atoms")]
    NoResidue,
    #[error("Atom serial {0} is not defined")]
    UnknownSerial(usize),
    #[error("Duplicate atom serial: {0}")]
    DuplicateSerial(usize),
    #[error("Expected {expected} positions, got {found}")]
    PositionCount { expected: usize, found: usize },
}

/// A complete molecular topology: segments, residues, atoms and bonds.
///
/// Atoms are stored in a slot map for stable IDs, while `atom_order` keeps the
/// order in which they were read from (or will be written to) a file. That
/// order is the one trajectories and coordinate files index into.
#[derive(Debug, Clone, Default)]
pub struct MolecularSystem {
    atoms: SlotMap<AtomId, Atom>,
    residues: SlotMap<ResidueId, Residue>,
    segments: SlotMap<SegmentId, Segment>,
    bonds: Vec<Bond>,
    /// Atom IDs in file order.
    atom_order: Vec<AtomId>,
    /// Segment IDs in file order.
    segment_order: Vec<SegmentId>,
    /// Lookup map for finding residues by segment and residue number.
    residue_id_map: HashMap<(SegmentId, isize), ResidueId>,
    /// Lookup map for finding segments by their identifier.
    segment_id_map: HashMap<String, SegmentId>,
    /// File-order index of each atom.
    atom_index: SecondaryMap<AtomId, usize>,
    /// Cached adjacency list for bond connectivity, indexed by atom ID.
    bond_adjacency: SecondaryMap<AtomId, Vec<AtomId>>,
}

impl MolecularSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Returns the atom IDs in file order.
    pub fn atom_ids(&self) -> &[AtomId] {
        &self.atom_order
    }

    /// Iterates over atoms in file order.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atom_order.iter().map(|&id| (id, &self.atoms[id]))
    }

    pub fn n_atoms(&self) -> usize {
        self.atom_order.len()
    }

    /// Returns the zero-based file-order index of an atom.
    pub fn atom_index(&self, id: AtomId) -> Option<usize> {
        self.atom_index.get(id).copied()
    }

    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    /// Iterates over residues segment by segment, in file order.
    pub fn residues_iter(&self) -> impl Iterator<Item = (ResidueId, &Residue)> {
        self.segment_order
            .iter()
            .flat_map(|&sid| self.segments[sid].residues.iter())
            .map(|&rid| (rid, &self.residues[rid]))
    }

    pub fn n_residues(&self) -> usize {
        self.residues.len()
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id)
    }

    /// Iterates over segments in file order.
    pub fn segments_iter(&self) -> impl Iterator<Item = (SegmentId, &Segment)> {
        self.segment_order.iter().map(|&id| (id, &self.segments[id]))
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn find_segment(&self, id: &str) -> Option<SegmentId> {
        self.segment_id_map.get(id).copied()
    }

    pub fn find_residue(&self, segment_id: SegmentId, number: isize) -> Option<ResidueId> {
        self.residue_id_map.get(&(segment_id, number)).copied()
    }

    /// Finds a residue by segment identifier and residue number.
    pub fn find_residue_by_label(&self, segid: &str, number: isize) -> Option<&Residue> {
        let segment_id = self.find_segment(segid)?;
        let residue_id = self.find_residue(segment_id, number)?;
        self.residues.get(residue_id)
    }

    /// Returns the residue that owns an atom.
    pub fn residue_of(&self, atom_id: AtomId) -> Option<&Residue> {
        let atom = self.atoms.get(atom_id)?;
        self.residues.get(atom.residue_id)
    }

    /// Returns the segment that owns a residue.
    pub fn segment_of(&self, residue: &Residue) -> Option<&Segment> {
        self.segments.get(residue.segment_id)
    }

    /// Returns `(segid, resnum, resname)` for an atom.
    pub fn atom_labels(&self, atom_id: AtomId) -> Option<(&str, isize, &str)> {
        let residue = self.residue_of(atom_id)?;
        let segment = self.segment_of(residue)?;
        Some((segment.id.as_str(), residue.number, residue.name.as_str()))
    }

    pub fn get_bonded_neighbors(&self, atom_id: AtomId) -> Option<&[AtomId]> {
        self.bond_adjacency.get(atom_id).map(|v| v.as_slice())
    }

    /// Adds a segment or returns the existing one with the same identifier.
    pub fn add_segment(&mut self, id: &str) -> SegmentId {
        if let Some(&existing) = self.segment_id_map.get(id) {
            return existing;
        }
        let segment_id = self.segments.insert(Segment::new(id));
        self.segment_order.push(segment_id);
        self.segment_id_map.insert(id.to_string(), segment_id);
        segment_id
    }

    /// Adds a residue to a segment, or returns the existing residue with the
    /// same number. Returns `None` if the segment does not exist.
    pub fn add_residue(
        &mut self,
        segment_id: SegmentId,
        number: isize,
        name: &str,
    ) -> Option<ResidueId> {
        let segment = self.segments.get_mut(segment_id)?;
        let key = (segment_id, number);

        let residue_id = *self.residue_id_map.entry(key).or_insert_with(|| {
            let residue = Residue::new(number, name, segment_id);
            self.residues.insert(residue)
        });

        if !segment.residues.contains(&residue_id) {
            segment.residues.push(residue_id);
        }

        Some(residue_id)
    }

    /// Appends an atom to a residue. The atom's file-order index is the
    /// number of atoms already in the system.
    pub fn add_atom_to_residue(&mut self, residue_id: ResidueId, mut atom: Atom) -> Option<AtomId> {
        if !self.residues.contains_key(residue_id) {
            return None;
        }
        atom.residue_id = residue_id;

        let atom_id = self.atoms.insert(atom);
        self.bond_adjacency.insert(atom_id, Vec::new());
        self.atom_index.insert(atom_id, self.atom_order.len());
        self.atom_order.push(atom_id);
        self.residues[residue_id].add_atom(atom_id);

        Some(atom_id)
    }

    /// Adds a bond between two atoms. Adding an existing bond is a no-op.
    pub fn add_bond(&mut self, atom1_id: AtomId, atom2_id: AtomId) -> Option<()> {
        if !self.atoms.contains_key(atom1_id) || !self.atoms.contains_key(atom2_id) {
            return None;
        }

        if let Some(neighbors) = self.bond_adjacency.get(atom1_id) {
            if neighbors.contains(&atom2_id) {
                return Some(());
            }
        }

        self.bonds.push(Bond::new(atom1_id, atom2_id));
        self.bond_adjacency[atom1_id].push(atom2_id);
        self.bond_adjacency[atom2_id].push(atom1_id);
        Some(())
    }

    /// Returns the file-order index pairs of all bonds, in bond order.
    pub fn bonded_pairs(&self) -> Vec<(usize, usize)> {
        self.bonds
            .iter()
            .filter_map(|bond| {
                Some((
                    self.atom_index(bond.atom1_id)?,
                    self.atom_index(bond.atom2_id)?,
                ))
            })
            .collect()
    }

    /// Returns the positions of all atoms in file order.
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms_iter().map(|(_, atom)| atom.position).collect()
    }

    /// Overwrites the positions of all atoms, in file order.
    pub fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), TopologyError> {
        if positions.len() != self.atom_order.len() {
            return Err(TopologyError::PositionCount {
                expected: self.atom_order.len(),
                found: positions.len(),
            });
        }
        for (&id, position) in self.atom_order.iter().zip(positions) {
            self.atoms[id].position = *position;
        }
        Ok(())
    }
}

/// Sequential construction of a [`MolecularSystem`] from file records.
///
/// Atoms are addressed by their file serial numbers so that bond records can
/// refer to them before the system is finalised.
#[derive(Default)]
pub struct MolecularSystemBuilder {
    system: MolecularSystem,
    serial_map: HashMap<usize, AtomId>,
    current_segment: Option<SegmentId>,
    current_residue: Option<ResidueId>,
}

impl MolecularSystemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_segment(&mut self, id: &str) -> &mut Self {
        let segment_id = self.system.add_segment(id);
        if self.current_segment != Some(segment_id) {
            self.current_residue = None;
        }
        self.current_segment = Some(segment_id);
        self
    }

    pub fn start_residue(&mut self, number: isize, name: &str) -> Result<&mut Self, TopologyError> {
        let segment_id = self.current_segment.ok_or(TopologyError::NoSegment)?;
        let residue_id = self
            .system
            .add_residue(segment_id, number, name)
            .ok_or(TopologyError::NoSegment)?;
        self.current_residue = Some(residue_id);
        Ok(self)
    }

    pub fn add_atom(&mut self, serial: usize, atom: Atom) -> Result<AtomId, TopologyError> {
        let residue_id = self.current_residue.ok_or(TopologyError::NoResidue)?;
        if self.serial_map.contains_key(&serial) {
            return Err(TopologyError::DuplicateSerial(serial));
        }
        let atom_id = self
            .system
            .add_atom_to_residue(residue_id, atom)
            .ok_or(TopologyError::NoResidue)?;
        self.serial_map.insert(serial, atom_id);
        Ok(atom_id)
    }

    pub fn add_bond(&mut self, serial1: usize, serial2: usize) -> Result<&mut Self, TopologyError> {
        let a1 = *self
            .serial_map
            .get(&serial1)
            .ok_or(TopologyError::UnknownSerial(serial1))?;
        let a2 = *self
            .serial_map
            .get(&serial2)
            .ok_or(TopologyError::UnknownSerial(serial2))?;
        self.system.add_bond(a1, a2);
        Ok(self)
    }

    pub fn build(self) -> MolecularSystem {
        self.system
    }
}
