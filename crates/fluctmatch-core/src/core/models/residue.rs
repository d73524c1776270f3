use super::ids::{AtomId, SegmentId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    pub number: isize,                // Residue number (CHARMM RESID)
    pub name: String,                 // Residue name (e.g., "ALA", "TIP3")
    pub segment_id: SegmentId,        // ID of the parent segment
    pub(crate) atoms: Vec<AtomId>,    // Atoms in file order
}

impl Residue {
    pub(crate) fn new(number: isize, name: &str, segment_id: SegmentId) -> Self {
        Self {
            number,
            name: name.to_string(),
            segment_id,
            atoms: Vec::new(),
        }
    }

    pub(crate) fn add_atom(&mut self, atom_id: AtomId) {
        self.atoms.push(atom_id);
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }
}
