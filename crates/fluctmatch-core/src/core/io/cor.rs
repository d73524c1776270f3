use crate::core::io::traits::{TopologyFile, parse_resid, write_charmm_title};
use std::ops::Range;
use crate::core::models::atom::Atom;
use crate::core::models::ids::ResidueId;
use crate::core::models::system::{MolecularSystem, MolecularSystemBuilder, TopologyError};
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: CorParseErrorKind },
    #[error("Inconsistent topology: {0}")]
    Topology(#[from] TopologyError),
    #[error("Atom count line declares {declared} atoms but {found} were read")]
    CountMismatch { declared: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum CorParseErrorKind {
    #[error("Missing atom count line after the title")]
    MissingCount,
    #[error("Invalid integer in field '{field}' (value: '{value}')")]
    InvalidInt { field: &'static str, value: String },
    #[error("Invalid float in field '{field}' (value: '{value}')")]
    InvalidFloat { field: &'static str, value: String },
    #[error("Coordinate record is {length} characters long, expected at least {expected}")]
    ShortRecord { length: usize, expected: usize },
}

/// Writer options for CHARMM coordinate files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorOptions {
    /// Use the extended `(2I10,2X,A8,2X,A8,3F20.10,2X,A8,2X,A8,F20.10)` layout.
    pub extended: bool,
    /// Title lines, without the leading `*`.
    pub title: Vec<String>,
}

/// Column ranges of one coordinate record.
struct Layout {
    atomno: Range<usize>,
    resname: Range<usize>,
    name: Range<usize>,
    coords: [Range<usize>; 3],
    segid: Range<usize>,
    resid: Range<usize>,
}

/// `(2I5,1X,A4,1X,A4,3F10.5,1X,A4,1X,A4,F10.5)`
const STANDARD: Layout = Layout {
    atomno: 0..5,
    resname: 11..15,
    name: 16..20,
    coords: [20..30, 30..40, 40..50],
    segid: 51..55,
    resid: 56..60,
};

/// `(2I10,2X,A8,2X,A8,3F20.10,2X,A8,2X,A8,F20.10)`
const EXTENDED: Layout = Layout {
    atomno: 0..10,
    resname: 22..30,
    name: 32..40,
    coords: [40..60, 60..80, 80..100],
    segid: 102..110,
    resid: 112..120,
};

/// The trimmed text in `range`, clipped to the line length.
fn column<'a>(line: &'a str, range: &Range<usize>) -> &'a str {
    let end = range.end.min(line.len());
    line.get(range.start.min(end)..end).unwrap_or("").trim()
}

/// Whether any label overflows the four-character columns of the standard layout.
fn has_wide_labels(system: &MolecularSystem) -> bool {
    system.atoms_iter().any(|(id, atom)| {
        atom.name.len() > 4
            || system.atom_labels(id).is_some_and(|(segid, resid, resname)| {
                segid.len() > 4 || resname.len() > 4 || resid.to_string().len() > 4
            })
    })
}

/// CHARMM coordinate (CRD/COR) files.
pub struct CorFile;

impl CorFile {
    /// Reads only the positions of a coordinate file, in file order.
    pub fn read_positions(reader: &mut impl BufRead) -> Result<Vec<Point3<f64>>, CorError> {
        Ok(Self::read_from(reader)?.positions())
    }
}

impl TopologyFile for CorFile {
    type Options = CorOptions;
    type Error = CorError;

    fn read_from(reader: &mut impl BufRead) -> Result<MolecularSystem, Self::Error> {
        let mut builder = MolecularSystemBuilder::new();
        let mut declared: Option<usize> = None;
        let mut layout: Option<&Layout> = None;
        let mut found = 0usize;
        let mut current: Option<(String, isize)> = None;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            if line.starts_with('*') {
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
            let Some(layout) = layout else {
                let count = line.split_whitespace().next().unwrap_or("");
                declared = Some(count.parse().map_err(|_| CorError::Parse {
                    line: line_num,
                    kind: CorParseErrorKind::InvalidInt {
                        field: "natom",
                        value: count.to_string(),
                    },
                })?);
                layout = Some(if line.contains("EXT") {
                    &EXTENDED
                } else {
                    &STANDARD
                });
                continue;
            };

            let expected = layout.coords[2].end;
            if line.len() < expected {
                return Err(CorError::Parse {
                    line: line_num,
                    kind: CorParseErrorKind::ShortRecord {
                        length: line.len(),
                        expected,
                    },
                });
            }
            let int_err = |field: &'static str, value: &str| CorError::Parse {
                line: line_num,
                kind: CorParseErrorKind::InvalidInt {
                    field,
                    value: value.to_string(),
                },
            };

            let atomno = column(&line, &layout.atomno);
            let serial: usize = atomno.parse().map_err(|_| int_err("atomno", atomno))?;
            let mut coords = [0.0f64; 3];
            for (k, field) in ["x", "y", "z"].into_iter().enumerate() {
                let value = column(&line, &layout.coords[k]);
                coords[k] = value.parse().map_err(|_| CorError::Parse {
                    line: line_num,
                    kind: CorParseErrorKind::InvalidFloat {
                        field,
                        value: value.to_string(),
                    },
                })?;
            }
            let segid = column(&line, &layout.segid);
            let resid_text = column(&line, &layout.resid);
            let resid = parse_resid(resid_text).ok_or_else(|| int_err("resid", resid_text))?;
            let resname = column(&line, &layout.resname);
            let name = column(&line, &layout.name);

            let key = (segid.to_string(), resid);
            if current.as_ref() != Some(&key) {
                builder.start_segment(segid);
                builder.start_residue(resid, resname)?;
                current = Some(key);
            }
            let atom = Atom::new(
                name,
                ResidueId::default(),
                Point3::new(coords[0], coords[1], coords[2]),
            );
            builder.add_atom(serial, atom)?;
            found += 1;
        }

        match declared {
            None => Err(CorError::Parse {
                line: 1,
                kind: CorParseErrorKind::MissingCount,
            }),
            Some(declared) if declared != found => Err(CorError::CountMismatch { declared, found }),
            Some(_) => Ok(builder.build()),
        }
    }

    fn write_to(
        system: &MolecularSystem,
        options: &Self::Options,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let extended = options.extended || system.n_atoms() > 99_999 || has_wide_labels(system);

        write_charmm_title(writer, &options.title)?;
        if extended {
            writeln!(writer, "{:>10}  EXT", system.n_atoms())?;
        } else {
            writeln!(writer, "{:>5}", system.n_atoms())?;
        }

        let mut residue_ordinal = 0usize;
        let mut last_residue: Option<ResidueId> = None;
        for (index, (atom_id, atom)) in system.atoms_iter().enumerate() {
            if last_residue != Some(atom.residue_id) {
                residue_ordinal += 1;
                last_residue = Some(atom.residue_id);
            }
            let (segid, resid, resname) = system
                .atom_labels(atom_id)
                .ok_or(TopologyError::NoResidue)?;
            let p = &atom.position;
            if extended {
                writeln!(
                    writer,
                    "{:>10}{:>10}  {:<8}  {:<8}{:>20.10}{:>20.10}{:>20.10}  {:<8}  {:<8}{:>20.10}",
                    index + 1,
                    residue_ordinal,
                    resname,
                    atom.name,
                    p.x,
                    p.y,
                    p.z,
                    segid,
                    resid,
                    0.0
                )?;
            } else {
                writeln!(
                    writer,
                    "{:>5}{:>5} {:<4} {:<4}{:>10.5}{:>10.5}{:>10.5} {:<4} {:<4}{:>10.5}",
                    index + 1,
                    residue_ordinal,
                    resname,
                    atom.name,
                    p.x,
                    p.y,
                    p.z,
                    segid,
                    resid,
                    0.0
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "* small test
*
    3
    1    1 ALA  CA     1.00000   2.00000   3.00000 PROA 1      0.00000
    2    2 GLY  CA     4.50000   5.00000   6.00000 PROA 2      0.00000
    3    3 TIP3 OW    -1.00000  -2.00000  -3.00000 WAT  1      0.00000
";

    #[test]
    fn reads_positions_and_labels() {
        let system = CorFile::read_from(&mut Cursor::new(SAMPLE)).unwrap();

        assert_eq!(system.n_atoms(), 3);
        assert_eq!(system.positions()[1], Point3::new(4.5, 5.0, 6.0));
        assert_eq!(
            system.atom_labels(system.atom_ids()[2]),
            Some(("WAT", 1, "TIP3"))
        );
    }

    #[test]
    fn count_mismatch_is_reported() {
        let broken = SAMPLE.replace("    3\n", "    4\n");
        let result = CorFile::read_from(&mut Cursor::new(broken));
        assert!(matches!(
            result,
            Err(CorError::CountMismatch {
                declared: 4,
                found: 3
            })
        ));
    }

    #[test]
    fn standard_and_extended_layouts_read_back() {
        let system = CorFile::read_from(&mut Cursor::new(SAMPLE)).unwrap();

        for extended in [false, true] {
            let mut buffer = Vec::new();
            let options = CorOptions {
                extended,
                title: vec!["round trip".to_string()],
            };
            CorFile::write_to(&system, &options, &mut buffer).unwrap();
            let text = String::from_utf8(buffer).unwrap();
            assert!(text.starts_with("* round trip\n*\n"));
            assert_eq!(text.contains("EXT"), extended);

            let positions = CorFile::read_positions(&mut Cursor::new(text)).unwrap();
            assert_eq!(positions, system.positions());
        }
    }

    #[test]
    fn wide_coordinates_do_not_fuse_with_neighbours() {
        let mut system = CorFile::read_from(&mut Cursor::new(SAMPLE)).unwrap();
        let positions = vec![
            Point3::new(1.0, -100.12345, 3.0),
            Point3::new(1234.5, -999.99999, 0.5),
            Point3::new(-1.0, -2.0, -3.0),
        ];
        system.set_positions(&positions).unwrap();

        let mut buffer = Vec::new();
        CorFile::write_to(&system, &CorOptions::default(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("   1.00000-100.12345   3.00000"));

        let read_back = CorFile::read_positions(&mut Cursor::new(text)).unwrap();
        assert_eq!(read_back, positions);
    }

    #[test]
    fn extended_records_are_read_by_column() {
        let text = format!(
            "* wide\n*\n{:>10}  EXT\n{:>10}{:>10}  {:<8}  {:<8}{:>20.10}{:>20.10}{:>20.10}  {:<8}  {:<8}{:>20.10}\n",
            1, 1, 1, "TIP3", "OH2", -1000.25, 2.0, 12345.5, "SOLVENT1", "27A", 0.0
        );
        let system = CorFile::read_from(&mut Cursor::new(text)).unwrap();
        assert_eq!(system.positions(), vec![Point3::new(-1000.25, 2.0, 12345.5)]);
        assert_eq!(
            system.atom_labels(system.atom_ids()[0]),
            Some(("SOLVENT1", 27, "TIP3"))
        );
    }

    #[test]
    fn resid_insertion_codes_keep_their_number() {
        let text = SAMPLE.replace("PROA 2   ", "PROA 2B  ");
        let system = CorFile::read_from(&mut Cursor::new(text)).unwrap();
        assert_eq!(
            system.atom_labels(system.atom_ids()[1]),
            Some(("PROA", 2, "GLY"))
        );
    }

    #[test]
    fn long_labels_switch_to_the_extended_layout() {
        let text = SAMPLE.replace("WAT  1", "WATR 1");
        let mut system = CorFile::read_from(&mut Cursor::new(text)).unwrap();
        let id = system.atom_ids()[0];
        system.atom_mut(id).unwrap().name = "CA123".to_string();

        let mut buffer = Vec::new();
        CorFile::write_to(&system, &CorOptions::default(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("EXT"));
        let read_back = CorFile::read_from(&mut Cursor::new(text)).unwrap();
        assert_eq!(read_back.atom(read_back.atom_ids()[0]).unwrap().name, "CA123");
    }

    #[test]
    fn truncated_record_is_rejected() {
        let text = "* t\n*\n    1\n    1    1 ALA  CA     1.00000   2.00000\n";
        assert!(matches!(
            CorFile::read_from(&mut Cursor::new(text)),
            Err(CorError::Parse {
                line: 4,
                kind: CorParseErrorKind::ShortRecord { expected: 50, .. }
            })
        ));
    }
}
