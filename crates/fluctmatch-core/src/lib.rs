//! # fluctmatch
//!
//! Coarse-grained elastic network models parameterised from all-atom
//! molecular dynamics by fluctuation matching. Normal-mode analysis and
//! trajectory manipulation are delegated to CHARMM and Gromacs; this crate
//! prepares their inputs, drives them, and aggregates their outputs.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`MolecularSystem`, `Frame`),
//!   CHARMM file formats (PSF, COR, DCD, RTF, PRM, IC streams), labelled numeric
//!   tables, and atom selections.
//!
//! - **[`engine`]: The Logic Core.** Streaming frame analyses, bond statistics,
//!   coarse-grained model builders, fluctuation-matching parameter updates,
//!   `ParamTable` aggregation, and the runner for external programs.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures used by the command
//!   line: CHARMM setup, fluctuation matching, trajectory splitting,
//!   thermodynamic tables, table differences and table name conversion.

pub mod core;
pub mod engine;
pub mod workflows;
