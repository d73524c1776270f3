use super::ids::ResidueId;
use nalgebra::Point3;

/// An atom (or coarse-grained bead) of a molecular system.
///
/// CHARMM PSF files carry either numeric atom types (CHARMM format) or
/// textual ones (XPLOR format), so the type is always kept as text.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "CA", "OW").
    pub name: String,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
    /// Force field atom type.
    pub atom_type: String,
    /// Partial charge in elementary charge units.
    pub charge: f64,
    /// Mass in atomic mass units.
    pub mass: f64,
    /// Cartesian coordinates in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    /// Creates a new `Atom` with zero charge and mass and an empty type.
    pub fn new(name: &str, residue_id: ResidueId, position: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            residue_id,
            atom_type: String::new(),
            charge: 0.0,
            mass: 0.0,
            position,
        }
    }

    pub fn with_type(mut self, atom_type: &str) -> Self {
        self.atom_type = atom_type.to_string();
        self
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_has_expected_default_fields() {
        let residue_id = ResidueId::default();
        let atom = Atom::new("CA", residue_id, Point3::new(1.0, 2.0, 3.0));

        assert_eq!(atom.name, "CA");
        assert_eq!(atom.residue_id, residue_id);
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.atom_type, "");
        assert_eq!(atom.charge, 0.0);
        assert_eq!(atom.mass, 0.0);
    }

    #[test]
    fn builder_style_setters_fill_fields() {
        let atom = Atom::new("OW", ResidueId::default(), Point3::origin())
            .with_type("1")
            .with_charge(-0.834)
            .with_mass(15.9994);

        assert_eq!(atom.atom_type, "1");
        assert_eq!(atom.charge, -0.834);
        assert_eq!(atom.mass, 15.9994);
    }
}
