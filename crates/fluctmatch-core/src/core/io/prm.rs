use crate::core::io::traits::write_charmm_title;
use std::collections::HashSet;
use std::io::{self, Write};

/// A harmonic bond term `Kb (r - b0)^2` between two atom types.
#[derive(Debug, Clone, PartialEq)]
pub struct BondParameter {
    pub type_i: String,
    pub type_j: String,
    /// Force constant in kcal/(mol·Å²).
    pub kb: f64,
    /// Equilibrium distance in Å.
    pub b0: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrmOptions {
    pub title: Vec<String>,
}

/// Writes a CHARMM parameter file holding bond terms plus zero Lennard-Jones
/// terms for every atom type that appears in a bond.
pub fn write_prm(
    bonds: &[BondParameter],
    options: &PrmOptions,
    writer: &mut impl Write,
) -> io::Result<()> {
    write_charmm_title(writer, &options.title)?;
    writeln!(writer)?;

    writeln!(writer, "BONDS")?;
    for bond in bonds {
        writeln!(
            writer,
            "{:<6} {:<6} {:>10.4} {:>10.4}",
            bond.type_i, bond.type_j, bond.kb, bond.b0
        )?;
    }
    writeln!(writer)?;

    writeln!(
        writer,
        "NONBONDED nbxmod 5 atom cdiel shift vatom vdistance vswitch -"
    )?;
    writeln!(
        writer,
        "cutnb 14.0 ctofnb 12.0 ctonnb 10.0 eps 1.0 e14fac 1.0 wmin 1.5"
    )?;
    writeln!(writer)?;
    let mut seen = HashSet::new();
    for name in bonds.iter().flat_map(|b| [&b.type_i, &b.type_j]) {
        if seen.insert(name.as_str()) {
            writeln!(writer, "{:<6} {:>10.6} {:>10.6} {:>10.6}", name, 0.0, -0.0, 0.0)?;
        }
    }
    writeln!(writer)?;
    writeln!(writer, "END")
}
