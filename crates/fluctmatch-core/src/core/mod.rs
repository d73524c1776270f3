//! # Core Module
//!
//! Stateless building blocks of the fluctuation-matching pipeline: the
//! molecular topology model, the CHARMM file formats, labelled numeric
//! tables and atom selections.
//!
//! - **Molecular Representation** ([`models`]) - Segments, residues, atoms, bonds and frames
//! - **File I/O** ([`io`]) - PSF, COR, RTF, PRM, IC stream and DCD files
//! - **Tables** ([`tables`]) - Row-keyed numeric tables and their algebra
//! - **Selections** ([`selection`]) - Atom selections that define coarse-grained beads

pub mod io;
pub mod models;
pub mod selection;
pub mod tables;
