//! # Equipment Interface
//!
//! This module defines the interfaces through which locomotion control talks to the equipment it
//! does not own: the terrain probe and the per-limb IK solver endpoints.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod ik;
pub mod probe;
