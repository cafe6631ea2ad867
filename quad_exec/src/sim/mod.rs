//! Simulation collaborators
//!
//! Stand-ins for the game engine that normally hosts locomotion control: terrain to probe, IK
//! endpoints to drive and a rig to attach to.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod endpoint;
mod rig;
mod terrain;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use endpoint::*;
pub use rig::*;
pub use terrain::*;
