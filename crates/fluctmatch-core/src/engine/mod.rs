//! # Engine Module
//!
//! Stateful computations over molecular systems and trajectories: the
//! streaming frame-analysis driver, bond statistics, coarse-grained model
//! construction, fluctuation-matching parameter estimation, and the
//! plumbing needed to drive external CHARMM and Gromacs binaries.
//!
//! ## Architecture
//!
//! - **Frame analysis** ([`analysis`]) - `FrameAnalysis` trait and the driver that feeds it frames
//! - **Statistics** ([`stats`]) - Average structures and Welford bond-length statistics
//! - **Coarse graining** ([`cg`]) - `CgModel` implementations and all-atom to bead mappings
//! - **Parameters** ([`fluctmatch`], [`paramtable`]) - Force constants and their residue aggregates
//! - **External programs** ([`runner`]) - Executable lookup and logged command execution
//! - **Configuration** ([`config`]) - Validated settings for each workflow
//! - **Progress Monitoring** ([`progress`]) - Progress events for front ends
//! - **Error Handling** ([`error`]) - `EngineError` and its conversions

pub mod analysis;
pub mod cg;
pub mod config;
pub mod error;
pub mod fluctmatch;
pub mod paramtable;
pub mod progress;
pub mod runner;
pub mod stats;
