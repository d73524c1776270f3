//! # Core Models Module
//!
//! Data structures describing a molecular topology as exchanged with CHARMM:
//! atoms grouped into residues, residues grouped into segments, and the bonds
//! between atoms. Coordinates live on the atoms; trajectories supply further
//! frames through [`crate::core::io::dcd`].
//!
//! - [`atom`] - Individual atom with name, type, charge, mass and position
//! - [`frame`] - A single set of coordinates taken from a trajectory
//! - [`residue`] - Residue with its number, name and ordered atoms
//! - [`segment`] - Segment (CHARMM `SEGID`) with its ordered residues
//! - [`system`] - Complete molecular system, plus a sequential builder
//! - [`topology`] - Bond connectivity
//! - [`ids`] - Stable identifier types for atoms, residues and segments

pub mod atom;
pub mod frame;
pub mod ids;
pub mod residue;
pub mod segment;
pub mod system;
pub mod topology;
