//! Provides input/output for the CHARMM file formats exchanged by the
//! fluctuation-matching pipeline.
//!
//! Topology-bearing formats (PSF, COR) share the [`traits::TopologyFile`]
//! interface. The remaining CHARMM inputs (RTF, PRM, IC stream) are
//! write-only, except for the IC tables CHARMM writes back. DCD
//! trajectories are streamed frame by frame.

pub mod cor;
pub mod dcd;
pub mod prm;
pub mod psf;
pub mod rtf;
pub mod stream;
pub mod traits;
