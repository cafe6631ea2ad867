//! # Communications interface crate.
//!
//! Provides the interfaces shared between the locomotion controller, the
//! equipment it drives and the sources of telecommands.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod tc;

/// Interfaces to external equipment (ground probes and IK endpoints)
pub mod eqpt;
