use crate::core::models::system::MolecularSystem;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing topology-bearing file formats.
///
/// Implementors handle format-specific parsing and serialization. Format
/// variants (extended columns, XPLOR atom types, titles) are selected through
/// the associated `Options` type.
pub trait TopologyFile {
    /// Writer options for the format.
    type Options: Default;

    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a molecular system from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead) -> Result<MolecularSystem, Self::Error>;

    /// Writes a molecular system to a writer using the given options.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(
        system: &MolecularSystem,
        options: &Self::Options,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Reads a molecular system from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<MolecularSystem, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes a molecular system to a file path.
    fn write_to_path<P: AsRef<Path>>(
        system: &MolecularSystem,
        options: &Self::Options,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(system, options, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Title lines written at the top of CHARMM files when none are given.
pub(crate) const DEFAULT_TITLE: &str = "Written by fluctmatch.";

/// Writes CHARMM title lines (`* ...`) followed by the closing `*`.
pub(crate) fn write_charmm_title(writer: &mut impl Write, title: &[String]) -> io::Result<()> {
    if title.is_empty() {
        writeln!(writer, "* {}", DEFAULT_TITLE)?;
    }
    for line in title {
        writeln!(writer, "* {}", line)?;
    }
    writeln!(writer, "*")
}

/// Parses a CHARMM RESID. Insertion codes (e.g. `27A`) keep their numeric part.
pub(crate) fn parse_resid(value: &str) -> Option<isize> {
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
        .map_or(value.len(), |(i, _)| i);
    value[..end].parse().ok()
}

