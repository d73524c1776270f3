use crate::core::io::traits::write_charmm_title;
use crate::core::tables::{BondKey, RowKey, Table, TableError};
use std::io::{BufRead, Write};

/// Tokens on an entry of a CHARMM `write ic ... resid` table: the entry
/// number, segid/resid/atom for I, J, K and L, then `r_IJ`, two angles, the
/// dihedral and `r_KL`.
const IC_ENTRY_TOKENS: usize = 18;
const IC_DISTANCE: usize = 13;

/// Writes one column of an internal-coordinate table as a CHARMM stream
/// file that edits bond distances (`IC EDIT ... END`).
pub fn write_stream(
    table: &Table<BondKey>,
    column: &str,
    title: &[String],
    writer: &mut impl Write,
) -> Result<(), TableError> {
    let values = table.column(column)?;

    write_charmm_title(writer, title)?;
    writeln!(writer, "IC EDIT")?;
    for (key, value) in values {
        writeln!(
            writer,
            "DIST {:<4} {:>5} {:<4} {:<4} {:>5} {:<4} {:>9.4}",
            key.segid_i, key.resid_i, key.atom_i, key.segid_j, key.resid_j, key.atom_j, value
        )?;
    }
    writeln!(writer, "END")?;
    writeln!(writer)?;
    writeln!(writer, "RETURN")?;
    Ok(())
}

/// Reads the `r_IJ` distances of an internal-coordinate table written by
/// CHARMM with `write ic card resid`.
///
/// Title lines and the count lines are skipped; every entry line becomes a
/// row keyed by its I and J atoms. The result has a single column named
/// `column`.
pub fn read_ic_distances(reader: impl BufRead, column: &str) -> Result<Table<BondKey>, TableError> {
    let mut table = Table::new(vec![column.to_string()]);
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = index as u64 + 1;
        if line.starts_with('*') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != IC_ENTRY_TOKENS {
            continue;
        }
        let key = BondKey::from_fields(&tokens[1..7]).map_err(|source| TableError::Key {
            line: line_number,
            source,
        })?;
        let value = tokens[IC_DISTANCE]
            .parse::<f64>()
            .map_err(|_| TableError::InvalidValue {
                line: line_number,
                value: tokens[IC_DISTANCE].to_string(),
            })?;
        table.push_row(key, vec![value])?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_dist_line_per_bond() {
        let table = Table::from_column(
            "r_IJ",
            [
                (BondKey::new(("DMA", 1, "C1"), ("DMA", 1, "N")), 1.4712),
                (BondKey::new(("DMA", 1, "N"), ("DMA", 1, "C2")), 1.3301),
            ],
        )
        .unwrap();
        let mut buffer = Vec::new();
        write_stream(&table, "r_IJ", &[], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert_eq!(
            text,
            "* Written by fluctmatch.\n*\nIC EDIT\n\
             DIST DMA      1 C1   DMA      1 N       1.4712\n\
             DIST DMA      1 N    DMA      1 C2      1.3301\n\
             END\n\nRETURN\n"
        );
    }

    #[test]
    fn unknown_column_is_an_error() {
        let table = Table::<BondKey>::new(vec!["r_IJ".into()]);
        let result = write_stream(&table, "kb", &[], &mut Vec::new());
        assert!(matches!(result, Err(TableError::UnknownColumn(_))));
    }

    const IC_TABLE: &str = "\
* Bond fluctuations
*
  30   2
     2     1
         1 DMA      1        C1         DMA      1        N          DMA      1        ??         DMA      1        ??           0.1200    0.00    0.00    0.00    0.0000
         2 DMA      1        N          DMA      1        C2         DMA      1        ??         DMA      1        ??           0.0850    0.00    0.00    0.00    0.0000
";

    #[test]
    fn ic_distances_are_keyed_by_the_bonded_atoms() {
        let table = read_ic_distances(IC_TABLE.as_bytes(), "r_IJ").unwrap();

        assert_eq!(table.n_rows(), 2);
        let key = BondKey::new(("DMA", 1, "N"), ("DMA", 1, "C2"));
        assert_eq!(table.value(&key, "r_IJ"), Some(0.085));
    }

    #[test]
    fn malformed_ic_distance_names_its_line() {
        let text = IC_TABLE.replace("0.1200", "0.1x00");
        match read_ic_distances(text.as_bytes(), "r_IJ") {
            Err(TableError::InvalidValue { line, value }) => {
                assert_eq!(line, 5);
                assert_eq!(value, "0.1x00");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
