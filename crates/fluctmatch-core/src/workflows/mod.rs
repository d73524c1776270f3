//! # Workflows Module
//!
//! Complete procedures built on the [`engine`](crate::engine) and
//! [`core`](crate::core) layers. Each workflow validates its inputs, reports
//! progress, and writes its results to disk.
//!
//! - **Setup** ([`setup`]) - CHARMM topology, coordinate, trajectory and parameter files for a CG system
//! - **Fluctuation matching** ([`fluctmatch`]) - Iterative force-constant refinement against CHARMM normal modes
//! - **Trajectory splitting** ([`split`]) - Overlapping windows extracted with Gromacs or CHARMM
//! - **Thermodynamics** ([`thermo`]) - Per-residue entropy, enthalpy, heat capacity and free energy tables
//! - **Table difference** ([`diff`]) - Bond, per-residue and residue-pair differences of two parameter tables
//! - **Table conversion** ([`convert`]) - Relabelling tables with coarse-grained bead and residue names

pub mod convert;
pub mod diff;
pub mod fluctmatch;
pub mod setup;
pub mod split;
pub mod thermo;
