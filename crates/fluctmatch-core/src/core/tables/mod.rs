//! Labelled numeric tables.
//!
//! Every tabular result of the pipeline (bond statistics, force constants,
//! per-residue sums, thermodynamic quantities) is a [`Table`]: rows indexed by
//! a typed [`RowKey`], plus any number of named `f64` columns. Tables are
//! exchanged as whitespace-delimited text with a single header line, the
//! index columns first, and values printed with four decimals.

pub mod keys;

pub use keys::{BondKey, KeyParseError, NamedBondKey, ResidueKey, ResiduePairKey, RowKey};

use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Table has no header line")]
    MissingHeader,
    #[error("Unexpected index columns: expected {expected:?}, found {found:?}")]
    Header {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("Row on line {line}: {source}")]
    Key {
        line: u64,
        #[source]
        source: KeyParseError,
    },
    #[error("Row on line {line} has {found} values, expected {expected}")]
    RowLength {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("Invalid value '{value}' on line {line}")]
    InvalidValue { line: u64, value: String },
    #[error("Duplicate row: {0}")]
    DuplicateRow(String),
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}

/// A table of `f64` values with typed row keys and named columns.
///
/// Rows keep their insertion order until [`Table::sort_rows`] is called.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<K: RowKey> {
    columns: Vec<String>,
    keys: Vec<K>,
    values: Vec<Vec<f64>>,
    lookup: HashMap<K, usize>,
}

impl<K: RowKey> Default for Table<K> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<K: RowKey> Table<K> {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            keys: Vec::new(),
            values: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Creates a table with one column from `(key, value)` pairs.
    pub fn from_column(
        name: &str,
        rows: impl IntoIterator<Item = (K, f64)>,
    ) -> Result<Self, TableError> {
        let mut table = Self::new(vec![name.to_string()]);
        for (key, value) in rows {
            table.push_row(key, vec![value])?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn n_rows(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&K, &[f64])> {
        self.keys
            .iter()
            .zip(self.values.iter().map(Vec::as_slice))
    }

    pub fn row(&self, key: &K) -> Option<&[f64]> {
        self.lookup.get(key).map(|&i| self.values[i].as_slice())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, key: &K, column: &str) -> Option<f64> {
        let col = self.column_index(column)?;
        self.row(key).map(|row| row[col])
    }

    /// Returns one column as `(key, value)` pairs in row order.
    pub fn column(&self, name: &str) -> Result<Vec<(&K, f64)>, TableError> {
        let col = self
            .column_index(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))?;
        Ok(self
            .keys
            .iter()
            .zip(&self.values)
            .map(|(k, row)| (k, row[col]))
            .collect())
    }

    pub fn push_row(&mut self, key: K, values: Vec<f64>) -> Result<(), TableError> {
        if values.len() != self.columns.len() {
            return Err(TableError::RowLength {
                line: 0,
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        if self.lookup.contains_key(&key) {
            return Err(TableError::DuplicateRow(key.to_fields().join(" ")));
        }
        self.lookup.insert(key.clone(), self.keys.len());
        self.keys.push(key);
        self.values.push(values);
        Ok(())
    }

    /// Adds `amount` to a cell, creating the row (zero-filled) if needed.
    pub fn accumulate(&mut self, key: &K, column: usize, amount: f64) {
        let index = match self.lookup.get(key) {
            Some(&i) => i,
            None => {
                let i = self.keys.len();
                self.lookup.insert(key.clone(), i);
                self.keys.push(key.clone());
                self.values.push(vec![0.0; self.columns.len()]);
                i
            }
        };
        self.values[index][column] += amount;
    }

    /// Outer-joins a column of `other` into this table under `name`.
    ///
    /// Rows missing on either side are filled with 0.0. An existing column
    /// with the same name is overwritten.
    pub fn join_column(&mut self, name: &str, other: &Table<K>, column: &str) -> Result<(), TableError> {
        let source = other.column(column)?;
        self.insert_column(name, source.into_iter().map(|(k, v)| (k.clone(), v)));
        Ok(())
    }

    /// Inserts (or overwrites) a column from `(key, value)` pairs. Rows absent
    /// from `values` get 0.0; keys not yet in the table add zero-filled rows.
    pub fn insert_column(&mut self, name: &str, values: impl IntoIterator<Item = (K, f64)>) {
        let col = match self.column_index(name) {
            Some(col) => col,
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.values {
                    row.push(0.0);
                }
                self.columns.len() - 1
            }
        };
        for row in &mut self.values {
            row[col] = 0.0;
        }
        for (key, value) in values {
            self.accumulate(&key, col, value);
        }
    }

    /// Combines two tables cell by cell after aligning rows and columns.
    ///
    /// The result has this table's rows and columns followed by those only
    /// present in `other`. Missing cells count as 0.0.
    pub fn zip_with(&self, other: &Table<K>, f: impl Fn(f64, f64) -> f64) -> Table<K> {
        let mut columns = self.columns.clone();
        for c in &other.columns {
            if !columns.contains(c) {
                columns.push(c.clone());
            }
        }
        let mut keys = self.keys.clone();
        keys.extend(
            other
                .keys
                .iter()
                .filter(|k| !self.lookup.contains_key(*k))
                .cloned(),
        );

        let self_cols: Vec<Option<usize>> = columns.iter().map(|c| self.column_index(c)).collect();
        let other_cols: Vec<Option<usize>> =
            columns.iter().map(|c| other.column_index(c)).collect();

        let mut result = Table::new(columns);
        for key in keys {
            let left = self.row(&key);
            let right = other.row(&key);
            let row = self_cols
                .iter()
                .zip(&other_cols)
                .map(|(lc, rc)| {
                    let a = lc.zip(left).map_or(0.0, |(c, r)| r[c]);
                    let b = rc.zip(right).map_or(0.0, |(c, r)| r[c]);
                    f(a, b)
                })
                .collect();
            result.lookup.insert(key.clone(), result.keys.len());
            result.keys.push(key);
            result.values.push(row);
        }
        result
    }

    /// Aligned difference `self - other`, filling missing cells with 0.0.
    pub fn subtract(&self, other: &Table<K>) -> Table<K> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Sorts rows by key.
    pub fn sort_rows(&mut self) {
        let mut order: Vec<usize> = (0..self.keys.len()).collect();
        order.sort_by(|&a, &b| self.keys[a].cmp(&self.keys[b]));
        self.reorder_rows(&order);
    }

    fn reorder_rows(&mut self, order: &[usize]) {
        let keys: Vec<K> = order.iter().map(|&i| self.keys[i].clone()).collect();
        let values: Vec<Vec<f64>> = order.iter().map(|&i| self.values[i].clone()).collect();
        self.lookup = keys.iter().cloned().enumerate().map(|(i, k)| (k, i)).collect();
        self.keys = keys;
        self.values = values;
    }

    /// Sorts columns numerically when every name is an integer (window
    /// numbers), lexicographically otherwise.
    pub fn sort_columns(&mut self) {
        let numeric: Option<Vec<i64>> = self.columns.iter().map(|c| c.parse().ok()).collect();
        let mut order: Vec<usize> = (0..self.columns.len()).collect();
        match numeric {
            Some(numbers) => order.sort_by_key(|&i| numbers[i]),
            None => order.sort_by(|&a, &b| self.columns[a].cmp(&self.columns[b])),
        }
        self.columns = order.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.values {
            *row = order.iter().map(|&i| row[i]).collect();
        }
    }

    /// Parses a whitespace-delimited table with a header line.
    pub fn read_from(reader: impl Read) -> Result<Self, TableError> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let n_index = K::INDEX.len();
        let mut table: Option<Table<K>> = None;

        for record in csv_reader.records() {
            let record = record?;
            let line = record.position().map_or(0, |p| p.line());
            let fields: Vec<&str> = record.iter().filter(|f| !f.is_empty()).collect();
            if fields.is_empty() {
                continue;
            }

            let Some(table) = table.as_mut() else {
                let found: Vec<String> = fields.iter().take(n_index).map(|s| s.to_string()).collect();
                if found != K::INDEX {
                    return Err(TableError::Header {
                        expected: K::INDEX.iter().map(|s| s.to_string()).collect(),
                        found,
                    });
                }
                let columns = fields[n_index..].iter().map(|s| s.to_string()).collect();
                table = Some(Table::new(columns));
                continue;
            };

            if fields.len() != n_index + table.columns.len() {
                return Err(TableError::RowLength {
                    line,
                    expected: n_index + table.columns.len(),
                    found: fields.len(),
                });
            }
            let key = K::from_fields(&fields[..n_index])
                .map_err(|source| TableError::Key { line, source })?;
            let values = fields[n_index..]
                .iter()
                .map(|v| {
                    v.parse::<f64>().map_err(|_| TableError::InvalidValue {
                        line,
                        value: v.to_string(),
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            table.push_row(key, values)?;
        }

        table.ok_or(TableError::MissingHeader)
    }

    /// Writes the table as space-separated text with four decimals.
    pub fn write_to(&self, writer: impl Write) -> Result<(), TableError> {
        let mut csv_writer = WriterBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .from_writer(writer);

        let header = K::INDEX
            .iter()
            .map(|s| s.to_string())
            .chain(self.columns.iter().cloned());
        csv_writer.write_record(header)?;

        for (key, row) in self.keys.iter().zip(&self.values) {
            let record = key
                .to_fields()
                .into_iter()
                .chain(row.iter().map(|v| format!("{:.4}", v)));
            csv_writer.write_record(record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }
}
