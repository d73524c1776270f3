use crate::core::models::atom::Atom;
use crate::core::models::residue::Residue;
use phf::{Set, phf_set};

static WATER_RESIDUE_NAMES: Set<&'static str> = phf_set! {
    "HOH", "WAT", "SOL", "TIP3", "TIP4", "TIP5", "SPC", "SPCE", "T3P", "T4P", "H2O",
};

static ION_ATOM_NAMES: Set<&'static str> = phf_set! {
    "LI", "LIT", "K", "NA", "F", "CL", "BR", "I",
    "SOD", "POT", "CLA", "CES", "CAL",
};

pub fn is_water_residue(resname: &str) -> bool {
    WATER_RESIDUE_NAMES.contains(resname.trim())
}

pub fn is_ion_atom(atom_name: &str) -> bool {
    ION_ATOM_NAMES.contains(atom_name.trim())
}

/// Matches an atom name against a pattern where a trailing `*` matches any
/// suffix (`H1*` matches `H11`, `H12`, ...).
pub fn name_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}

/// Atom selections used to define coarse-grained beads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Atom name matches any of the patterns.
    Names(Vec<String>),
    /// Residue name equals `resname` and the atom name matches any pattern.
    Residue { resname: String, names: Vec<String> },
    /// Every atom of a water residue.
    Water,
    /// Monatomic ions, by atom name.
    Ions,
}

impl Selection {
    pub fn names(patterns: &[&str]) -> Self {
        Self::Names(patterns.iter().map(|p| p.to_string()).collect())
    }

    pub fn residue(resname: &str, patterns: &[&str]) -> Self {
        Self::Residue {
            resname: resname.to_string(),
            names: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn matches(&self, atom: &Atom, residue: &Residue) -> bool {
        let any_name = |names: &[String]| names.iter().any(|p| name_matches(p, &atom.name));
        match self {
            Self::Names(names) => any_name(names),
            Self::Residue { resname, names } => residue.name == *resname && any_name(names),
            Self::Water => is_water_residue(&residue.name),
            Self::Ions => is_ion_atom(&atom.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::{ResidueId, SegmentId};
    use nalgebra::Point3;

    fn atom(name: &str) -> Atom {
        Atom::new(name, ResidueId::default(), Point3::origin())
    }

    #[test]
    fn trailing_wildcard_matches_prefix_only() {
        assert!(name_matches("H1*", "H11"));
        assert!(name_matches("H1*", "H1"));
        assert!(!name_matches("H1*", "H21"));
        assert!(name_matches("C1", "C1"));
        assert!(!name_matches("C1", "C11"));
    }

    #[test]
    fn residue_selection_requires_matching_resname() {
        let dma = Residue::new(1, "DMA", SegmentId::default());
        let other = Residue::new(1, "ALA", SegmentId::default());
        let sel = Selection::residue("DMA", &["C", "N", "O"]);

        assert!(sel.matches(&atom("N"), &dma));
        assert!(!sel.matches(&atom("N"), &other));
        assert!(!sel.matches(&atom("C1"), &dma));
    }

    #[test]
    fn water_and_ion_sets_cover_charmm_names() {
        let tip3 = Residue::new(7, "TIP3", SegmentId::default());
        let sod = Residue::new(1, "SOD", SegmentId::default());

        assert!(Selection::Water.matches(&atom("OH2"), &tip3));
        assert!(!Selection::Water.matches(&atom("SOD"), &sod));
        assert!(Selection::Ions.matches(&atom("SOD"), &sod));
        assert!(Selection::Ions.matches(&atom("CL"), &sod));
        assert!(!Selection::Ions.matches(&atom("OH2"), &tip3));
    }
}
