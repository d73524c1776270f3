use crate::core::io::traits::write_charmm_title;
use crate::core::models::system::MolecularSystem;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

/// Writer options for CHARMM residue topology files.
#[derive(Debug, Clone, PartialEq)]
pub struct RtfOptions {
    /// CHARMM major version written on the version line.
    pub version: u32,
    pub title: Vec<String>,
}

impl Default for RtfOptions {
    fn default() -> Self {
        Self {
            version: 41,
            title: Vec::new(),
        }
    }
}

/// A CHARMM atom type as declared on a `MASS` line.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeLabel {
    pub code: i64,
    pub label: String,
    pub mass: f64,
}

/// One label per distinct atom type of `system`, in order of first
/// appearance.
///
/// The label is the name of the first atom carrying the type. When another
/// type already claimed that name, the code is appended (two ion species both
/// named `ION` become `ION` and `ION11`). Codes come from numeric types when
/// they parse, or are numbered sequentially otherwise.
pub fn type_labels(system: &MolecularSystem) -> Vec<(String, TypeLabel)> {
    let mut labels: Vec<(String, TypeLabel)> = Vec::new();
    let mut claimed = HashSet::new();
    for (_, atom) in system.atoms_iter() {
        if labels.iter().any(|(ty, _)| *ty == atom.atom_type) {
            continue;
        }
        let code = atom
            .atom_type
            .parse::<i64>()
            .unwrap_or(labels.len() as i64 + 1);
        let label = if claimed.contains(&atom.name) {
            format!("{}{}", atom.name, code)
        } else {
            atom.name.clone()
        };
        claimed.insert(label.clone());
        labels.push((
            atom.atom_type.clone(),
            TypeLabel {
                code,
                label,
                mass: atom.mass,
            },
        ));
    }
    labels
}

/// Writes a residue topology file describing every distinct residue of
/// `system`.
///
/// Each distinct atom type gets one `MASS` line, labelled as in
/// [`type_labels`]; the XPLOR PSF written alongside uses the same labels.
/// Only bonds between atoms of the same residue are listed.
pub fn write_rtf(
    system: &MolecularSystem,
    options: &RtfOptions,
    writer: &mut impl Write,
) -> io::Result<()> {
    write_charmm_title(writer, &options.title)?;
    writeln!(writer, "{:>5}{:>5}", options.version, 1)?;
    writeln!(writer)?;

    let types = type_labels(system);
    for (_, ty) in &types {
        writeln!(writer, "MASS {:>5} {:<6} {:>12.5}", ty.code, ty.label, ty.mass)?;
    }
    let labels: HashMap<&str, &str> = types
        .iter()
        .map(|(ty, t)| (ty.as_str(), t.label.as_str()))
        .collect();
    writeln!(writer)?;
    writeln!(writer, "DEFA FIRS NONE LAST NONE")?;
    writeln!(writer, "AUTOGENERATE ANGLES DIHEDRALS")?;
    writeln!(writer)?;

    let mut bonds_by_residue: HashMap<_, Vec<(&str, &str)>> = HashMap::new();
    for bond in system.bonds() {
        let (Some(a), Some(b)) = (system.atom(bond.atom1_id), system.atom(bond.atom2_id)) else {
            continue;
        };
        if a.residue_id == b.residue_id {
            bonds_by_residue
                .entry(a.residue_id)
                .or_default()
                .push((a.name.as_str(), b.name.as_str()));
        }
    }

    let mut seen_residues = HashSet::new();
    for (residue_id, residue) in system.residues_iter() {
        if !seen_residues.insert(residue.name.as_str()) {
            continue;
        }
        let atoms: Vec<_> = residue
            .atoms()
            .iter()
            .filter_map(|&id| system.atom(id))
            .collect();
        let charge: f64 = atoms.iter().map(|a| a.charge).sum();

        writeln!(writer, "RESI {:<6} {:>8.4}", residue.name, charge)?;
        writeln!(writer, "GROUP")?;
        for atom in &atoms {
            let label = labels
                .get(atom.atom_type.as_str())
                .copied()
                .unwrap_or(atom.name.as_str());
            writeln!(writer, "ATOM {:<6} {:<6} {:>8.4}", atom.name, label, atom.charge)?;
        }
        if let Some(bonds) = bonds_by_residue.get(&residue_id) {
            for (i, j) in bonds {
                writeln!(writer, "BOND {:<6} {:<6}", i, j)?;
            }
        }
        writeln!(writer)?;
    }

    writeln!(writer, "END")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::ids::ResidueId;
    use crate::core::models::system::MolecularSystemBuilder;
    use nalgebra::Point3;

    fn two_dma() -> MolecularSystem {
        let mut builder = MolecularSystemBuilder::new();
        builder.start_segment("DMA");
        let mut serial = 1;
        for resid in 1..=2 {
            builder.start_residue(resid, "DMA").unwrap();
            for (name, ty, charge) in [("C1", "4", 0.1), ("N", "5", -0.2), ("C2", "6", 0.1)] {
                let atom = Atom::new(name, ResidueId::default(), Point3::origin())
                    .with_type(ty)
                    .with_charge(charge)
                    .with_mass(15.0);
                builder.add_atom(serial, atom).unwrap();
                serial += 1;
            }
            let base = serial - 3;
            builder.add_bond(base, base + 1).unwrap();
            builder.add_bond(base + 1, base + 2).unwrap();
        }
        builder.build()
    }

    #[test]
    fn writes_one_mass_line_per_type_and_one_resi_per_name() {
        let mut buffer = Vec::new();
        write_rtf(&two_dma(), &RtfOptions::default(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.starts_with("* Written by fluctmatch.\n*\n   41    1\n"));
        assert_eq!(text.matches("MASS").count(), 3);
        assert!(text.contains("MASS     4 C1     "));
        assert_eq!(text.matches("RESI").count(), 1);
        assert!(text.contains("RESI DMA      0.0000"));
        assert!(text.contains("ATOM N      N       -0.2000"));
        assert_eq!(text.matches("BOND").count(), 2);
        assert!(text.trim_end().ends_with("END"));
    }

    #[test]
    fn non_numeric_types_are_numbered_sequentially() {
        let mut system = two_dma();
        let ids = system.atom_ids().to_vec();
        for id in ids {
            if let Some(atom) = system.atom_mut(id) {
                atom.atom_type = atom.name.clone();
            }
        }
        let mut buffer = Vec::new();
        write_rtf(&system, &RtfOptions::default(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("MASS     1 C1"));
        assert!(text.contains("MASS     2 N "));
        assert!(text.contains("MASS     3 C2"));
    }

    #[test]
    fn ion_species_sharing_a_name_get_their_own_mass_line() {
        let mut builder = MolecularSystemBuilder::new();
        builder.start_segment("ION");
        for (serial, (resname, ty, mass)) in [("SOD", "10", 22.99), ("CLA", "11", 35.45)]
            .into_iter()
            .enumerate()
        {
            builder.start_residue(serial as isize + 1, resname).unwrap();
            let atom = Atom::new("ION", ResidueId::default(), Point3::origin())
                .with_type(ty)
                .with_mass(mass);
            builder.add_atom(serial + 1, atom).unwrap();
        }
        let system = builder.build();

        let mut buffer = Vec::new();
        write_rtf(&system, &RtfOptions::default(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert_eq!(text.matches("MASS").count(), 2);
        assert!(text.contains("MASS    10 ION        22.99000"));
        assert!(text.contains("MASS    11 ION11      35.45000"));
        assert!(text.contains("ATOM ION    ION11"));
    }
}
