use crate::core::io::traits::{DEFAULT_TITLE, TopologyFile, parse_resid};
use crate::core::models::atom::Atom;
use crate::core::models::ids::ResidueId;
use crate::core::models::system::{MolecularSystem, MolecularSystemBuilder, TopologyError};
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PsfError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PsfParseErrorKind },
    #[error("Inconsistent topology: {0}")]
    Topology(#[from] TopologyError),
    #[error("Missing required section: {0}")]
    MissingSection(&'static str),
}

#[derive(Debug, Error)]
pub enum PsfParseErrorKind {
    #[error("File does not start with a PSF header")]
    MissingHeader,
    #[error("Invalid integer in field '{field}' (value: '{value}')")]
    InvalidInt { field: &'static str, value: String },
    #[error("Invalid float in field '{field}' (value: '{value}')")]
    InvalidFloat { field: &'static str, value: String },
    #[error("Atom record has {0} fields, expected at least 8")]
    ShortAtomRecord(usize),
    #[error("Unexpected end of file inside the {0} section")]
    Truncated(&'static str),
}

/// Writer options for PSF files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PsfOptions {
    /// Use the wide `EXT` column layout.
    pub extended: bool,
    /// Write atom types as text (XPLOR) instead of integers (CHARMM).
    pub xplor: bool,
    /// Title lines, without the leading `*`.
    pub title: Vec<String>,
}

pub struct PsfFile;

fn section_count(line: &str) -> Option<usize> {
    line.split_whitespace().next()?.parse().ok()
}

impl TopologyFile for PsfFile {
    type Options = PsfOptions;
    type Error = PsfError;

    fn read_from(reader: &mut impl BufRead) -> Result<MolecularSystem, Self::Error> {
        let mut lines = reader
            .lines()
            .enumerate()
            .map(|(i, l)| l.map(|content| (i + 1, content)));

        match lines.next().transpose()? {
            Some((_, header)) if header.trim_start().starts_with("PSF") => {}
            _ => {
                return Err(PsfError::Parse {
                    line: 1,
                    kind: PsfParseErrorKind::MissingHeader,
                });
            }
        }

        let mut builder = MolecularSystemBuilder::new();
        let mut n_atoms_read = 0usize;
        let mut seen_atoms = false;

        while let Some((line_num, line)) = lines.next().transpose()? {
            if line.contains("!NTITLE") {
                let n = section_count(&line).unwrap_or(0);
                for _ in 0..n {
                    lines.next().transpose()?;
                }
            } else if line.contains("!NATOM") {
                seen_atoms = true;
                let n = section_count(&line).ok_or_else(|| PsfError::Parse {
                    line: line_num,
                    kind: PsfParseErrorKind::InvalidInt {
                        field: "NATOM",
                        value: line.trim().to_string(),
                    },
                })?;
                let mut current: Option<(String, isize)> = None;
                for _ in 0..n {
                    let (line_num, record) =
                        lines.next().transpose()?.ok_or(PsfError::Parse {
                            line: line_num,
                            kind: PsfParseErrorKind::Truncated("NATOM"),
                        })?;
                    let fields: Vec<&str> = record.split_whitespace().collect();
                    if fields.len() < 8 {
                        return Err(PsfError::Parse {
                            line: line_num,
                            kind: PsfParseErrorKind::ShortAtomRecord(fields.len()),
                        });
                    }
                    let int_err = |field: &'static str, value: &str| PsfError::Parse {
                        line: line_num,
                        kind: PsfParseErrorKind::InvalidInt {
                            field,
                            value: value.to_string(),
                        },
                    };
                    let float_err = |field: &'static str, value: &str| PsfError::Parse {
                        line: line_num,
                        kind: PsfParseErrorKind::InvalidFloat {
                            field,
                            value: value.to_string(),
                        },
                    };

                    let serial: usize = fields[0]
                        .parse()
                        .map_err(|_| int_err("serial", fields[0]))?;
                    let segid = fields[1];
                    let resid = parse_resid(fields[2]).ok_or_else(|| int_err("resid", fields[2]))?;
                    let charge: f64 = fields[6]
                        .parse()
                        .map_err(|_| float_err("charge", fields[6]))?;
                    let mass: f64 = fields[7]
                        .parse()
                        .map_err(|_| float_err("mass", fields[7]))?;

                    let key = (segid.to_string(), resid);
                    if current.as_ref() != Some(&key) {
                        builder.start_segment(segid);
                        builder.start_residue(resid, fields[3])?;
                        current = Some(key);
                    }
                    let atom = Atom::new(fields[4], ResidueId::default(), Point3::origin())
                        .with_type(fields[5])
                        .with_charge(charge)
                        .with_mass(mass);
                    builder.add_atom(serial, atom)?;
                    n_atoms_read += 1;
                }
            } else if line.contains("!NBOND") {
                let n = section_count(&line).unwrap_or(0);
                let mut indices: Vec<usize> = Vec::with_capacity(2 * n);
                while indices.len() < 2 * n {
                    let (line_num, record) =
                        lines.next().transpose()?.ok_or(PsfError::Parse {
                            line: line_num,
                            kind: PsfParseErrorKind::Truncated("NBOND"),
                        })?;
                    for value in record.split_whitespace() {
                        indices.push(value.parse().map_err(|_| PsfError::Parse {
                            line: line_num,
                            kind: PsfParseErrorKind::InvalidInt {
                                field: "bond",
                                value: value.to_string(),
                            },
                        })?);
                    }
                }
                for pair in indices.chunks_exact(2).take(n) {
                    builder.add_bond(pair[0], pair[1])?;
                }
                break;
            }
        }

        if !seen_atoms || n_atoms_read == 0 {
            return Err(PsfError::MissingSection("!NATOM"));
        }
        Ok(builder.build())
    }

    fn write_to(
        system: &MolecularSystem,
        options: &Self::Options,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let extended = options.extended || needs_extended(system);
        let width = if extended { 10 } else { 8 };

        writeln!(writer, "PSF{}", if extended { " EXT" } else { "" })?;
        writeln!(writer)?;

        let title: Vec<&str> = if options.title.is_empty() {
            vec![DEFAULT_TITLE]
        } else {
            options.title.iter().map(String::as_str).collect()
        };
        writeln!(writer, "{:>width$} !NTITLE", title.len())?;
        for line in &title {
            writeln!(writer, "* {}", line)?;
        }
        writeln!(writer)?;

        writeln!(writer, "{:>width$} !NATOM", system.n_atoms())?;
        for (index, (atom_id, atom)) in system.atoms_iter().enumerate() {
            let (segid, resid, resname) = system.atom_labels(atom_id).ok_or_else(|| {
                PsfError::Topology(TopologyError::NoResidue)
            })?;
            let atom_type = format_atom_type(&atom.atom_type, options.xplor);
            if extended {
                writeln!(
                    writer,
                    "{:>10} {:<8} {:<8} {:<8} {:<8} {:<6} {:>14.6}{:>14.6}{:>8}",
                    index + 1,
                    segid,
                    resid,
                    resname,
                    atom.name,
                    atom_type,
                    atom.charge,
                    atom.mass,
                    0
                )?;
            } else {
                writeln!(
                    writer,
                    "{:>8} {:<4} {:<4} {:<4} {:<4} {:>4} {:>14.6}{:>14.6}{:>8}",
                    index + 1,
                    segid,
                    resid,
                    resname,
                    atom.name,
                    atom_type,
                    atom.charge,
                    atom.mass,
                    0
                )?;
            }
        }
        writeln!(writer)?;

        let pairs = system.bonded_pairs();
        writeln!(writer, "{:>width$} !NBOND: bonds", pairs.len())?;
        for chunk in pairs.chunks(4) {
            for (i, j) in chunk {
                write!(writer, "{:>width$}{:>width$}", i + 1, j + 1)?;
            }
            writeln!(writer)?;
        }
        writeln!(writer)?;

        for section in [
            "!NTHETA: angles",
            "!NPHI: dihedrals",
            "!NIMPHI: impropers",
            "!NDON: donors",
            "!NACC: acceptors",
        ] {
            writeln!(writer, "{:>width$} {}", 0, section)?;
            writeln!(writer)?;
            writeln!(writer)?;
        }

        writeln!(writer, "{:>width$} !NNB", 0)?;
        writeln!(writer)?;
        let zeros = vec![0usize; system.n_atoms()];
        for chunk in zeros.chunks(8) {
            for value in chunk {
                write!(writer, "{:>width$}", value)?;
            }
            writeln!(writer)?;
        }
        writeln!(writer)?;

        writeln!(writer, "{:>width$}{:>width$} !NGRP", 1, 0)?;
        writeln!(writer, "{:>width$}{:>width$}{:>width$}", 0, 0, 0)?;
        writeln!(writer)?;
        Ok(())
    }
}

/// Segment IDs, residue names or atom names longer than four characters, or
/// more than 99999 atoms, do not fit in the standard layout.
fn needs_extended(system: &MolecularSystem) -> bool {
    if system.n_atoms() > 99_999 {
        return true;
    }
    system.atoms_iter().any(|(id, atom)| {
        atom.name.len() > 4
            || system
                .atom_labels(id)
                .is_some_and(|(segid, _, resname)| segid.len() > 4 || resname.len() > 4)
    })
}

fn format_atom_type(atom_type: &str, xplor: bool) -> String {
    if xplor {
        return atom_type.to_string();
    }
    // CHARMM PSFs require integer types; anything else becomes 0.
    atom_type.parse::<i64>().unwrap_or(0).to_string()
}
