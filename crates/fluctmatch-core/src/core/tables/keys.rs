use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("Expected {expected} index fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("Invalid residue number '{0}'")]
    InvalidResidue(String),
}

/// The typed index of a [`super::Table`] row.
///
/// `INDEX` names the leading index columns in the order they appear in a
/// table file's header.
pub trait RowKey: Ord + Hash + Clone + Debug {
    const INDEX: &'static [&'static str];

    fn to_fields(&self) -> Vec<String>;

    fn from_fields(fields: &[&str]) -> Result<Self, KeyParseError>;
}

fn check_len(fields: &[&str], expected: usize) -> Result<(), KeyParseError> {
    if fields.len() != expected {
        return Err(KeyParseError::FieldCount {
            expected,
            found: fields.len(),
        });
    }
    Ok(())
}

fn parse_resid(value: &str) -> Result<isize, KeyParseError> {
    value
        .parse()
        .map_err(|_| KeyParseError::InvalidResidue(value.to_string()))
}

/// A bond between two named atoms: `segidI resI I segidJ resJ J`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BondKey {
    pub segid_i: String,
    pub resid_i: isize,
    pub atom_i: String,
    pub segid_j: String,
    pub resid_j: isize,
    pub atom_j: String,
}

impl BondKey {
    pub fn new(i: (&str, isize, &str), j: (&str, isize, &str)) -> Self {
        Self {
            segid_i: i.0.to_string(),
            resid_i: i.1,
            atom_i: i.2.to_string(),
            segid_j: j.0.to_string(),
            resid_j: j.1,
            atom_j: j.2.to_string(),
        }
    }

    pub fn residue_i(&self) -> ResidueKey {
        ResidueKey::new(&self.segid_i, self.resid_i)
    }

    pub fn residue_j(&self) -> ResidueKey {
        ResidueKey::new(&self.segid_j, self.resid_j)
    }

    pub fn residue_pair(&self) -> ResiduePairKey {
        ResiduePairKey {
            segid_i: self.segid_i.clone(),
            resid_i: self.resid_i,
            segid_j: self.segid_j.clone(),
            resid_j: self.resid_j,
        }
    }
}

impl RowKey for BondKey {
    const INDEX: &'static [&'static str] = &["segidI", "resI", "I", "segidJ", "resJ", "J"];

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.segid_i.clone(),
            self.resid_i.to_string(),
            self.atom_i.clone(),
            self.segid_j.clone(),
            self.resid_j.to_string(),
            self.atom_j.clone(),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, KeyParseError> {
        check_len(fields, Self::INDEX.len())?;
        Ok(Self {
            segid_i: fields[0].to_string(),
            resid_i: parse_resid(fields[1])?,
            atom_i: fields[2].to_string(),
            segid_j: fields[3].to_string(),
            resid_j: parse_resid(fields[4])?,
            atom_j: fields[5].to_string(),
        })
    }
}

/// A residue: `segidI resI`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResidueKey {
    pub segid: String,
    pub resid: isize,
}

impl ResidueKey {
    pub fn new(segid: &str, resid: isize) -> Self {
        Self {
            segid: segid.to_string(),
            resid,
        }
    }
}

impl RowKey for ResidueKey {
    const INDEX: &'static [&'static str] = &["segidI", "resI"];

    fn to_fields(&self) -> Vec<String> {
        vec![self.segid.clone(), self.resid.to_string()]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, KeyParseError> {
        check_len(fields, Self::INDEX.len())?;
        Ok(Self::new(fields[0], parse_resid(fields[1])?))
    }
}

/// A residue-residue interaction: `segidI resI segidJ resJ`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResiduePairKey {
    pub segid_i: String,
    pub resid_i: isize,
    pub segid_j: String,
    pub resid_j: isize,
}

impl RowKey for ResiduePairKey {
    const INDEX: &'static [&'static str] = &["segidI", "resI", "segidJ", "resJ"];

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.segid_i.clone(),
            self.resid_i.to_string(),
            self.segid_j.clone(),
            self.resid_j.to_string(),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, KeyParseError> {
        check_len(fields, Self::INDEX.len())?;
        Ok(Self {
            segid_i: fields[0].to_string(),
            resid_i: parse_resid(fields[1])?,
            segid_j: fields[2].to_string(),
            resid_j: parse_resid(fields[3])?,
        })
    }
}

/// A bond annotated with residue names:
/// `segidI resI resnI I segidJ resJ resnJ J`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NamedBondKey {
    pub segid_i: String,
    pub resid_i: isize,
    pub resname_i: String,
    pub atom_i: String,
    pub segid_j: String,
    pub resid_j: isize,
    pub resname_j: String,
    pub atom_j: String,
}

impl RowKey for NamedBondKey {
    const INDEX: &'static [&'static str] = &[
        "segidI", "resI", "resnI", "I", "segidJ", "resJ", "resnJ", "J",
    ];

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.segid_i.clone(),
            self.resid_i.to_string(),
            self.resname_i.clone(),
            self.atom_i.clone(),
            self.segid_j.clone(),
            self.resid_j.to_string(),
            self.resname_j.clone(),
            self.atom_j.clone(),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, KeyParseError> {
        check_len(fields, Self::INDEX.len())?;
        Ok(Self {
            segid_i: fields[0].to_string(),
            resid_i: parse_resid(fields[1])?,
            resname_i: fields[2].to_string(),
            atom_i: fields[3].to_string(),
            segid_j: fields[4].to_string(),
            resid_j: parse_resid(fields[5])?,
            resname_j: fields[6].to_string(),
            atom_j: fields[7].to_string(),
        })
    }
}
