//! # Quadruped library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access items defined
//! inside the quadruped executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data store - holds the state shared between modules during a cycle
pub mod data_store;

/// Locomotion control module - turns movement intent into foot targets and a body pose
pub mod loco_ctrl;

/// Executable parameters
pub mod params;

/// Simulation - terrain, IK endpoints and the rig used in place of a game engine
pub mod sim;

/// Telecommand processor - executes telecommands against the data store
pub mod tc_processor;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Period of one control cycle.
///
/// Units: seconds
pub const CYCLE_PERIOD_S: f64 = 0.02;
