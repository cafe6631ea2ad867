//! # Locomotion control telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A movement intent for locomotion control.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum MoveCmd {
    /// Walk along a direction in the horizontal plane.
    ///
    /// Only the X and Z components are used. A zero direction requests that the gait settles to
    /// rest at its next safe point, rather than stopping immediately.
    Move {
        /// The direction to walk in, in the world frame. Need not be normalised.
        direction: Vector3<f64>,
    },

    /// Stop immediately, leaving the limbs where they are.
    Stop,
}
