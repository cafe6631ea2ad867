//! Locomotion control module
//!
//! Procedurally animates a legged character: every cycle the controller works out where each foot
//! should be and reconstructs the body pose from the feet. Movement intent is given as a planar
//! direction, which the controller first turns to face (recentering) before walking with a
//! staggered gait.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod body_pose;
mod curve;
mod gait_cycle;
mod limb;
mod params;
mod recenter;
mod rest_pose;
mod state;
mod swing;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use body_pose::*;
pub use curve::*;
pub use gait_cycle::*;
pub use limb::*;
pub use params::*;
pub use recenter::*;
pub use rest_pose::*;
pub use state::*;
pub use swing::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during LocoCtrl initialisation.
#[derive(Debug, thiserror::Error)]
pub enum LocoCtrlError {
    #[error("No limbs were provided")]
    NoLimbs,

    #[error("Expected an even number of limbs, found {0}")]
    OddLimbCount(usize),

    #[error("Expected half of the limbs on each side, found {left} left and {right} right")]
    UnbalancedSides { left: usize, right: usize },

    #[error("The tip of limb {0} is not ready")]
    TipNotReady(usize),

    #[error("The core reference pose has not been set")]
    CoreNotSet,

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParam { name: &'static str, reason: String },

    #[error("Failed to initialise the archive: {0}")]
    ArchiveError(#[from] util::archive::ArchiveError),
}
