use super::ids::ResidueId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub id: String,                      // Segment identifier (e.g., "PROA", "WAT")
    pub(crate) residues: Vec<ResidueId>, // Ordered list of residue IDs belonging to this segment
}

impl Segment {
    pub(crate) fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            residues: Vec::new(),
        }
    }

    pub fn residues(&self) -> &[ResidueId] {
        &self.residues
    }
}
