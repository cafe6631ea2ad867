//! # IK endpoint interface
//!
//! Each limb of the character is driven through an IK endpoint: locomotion control writes the
//! target position and attitude of the foot, the external solver works out the joint angles.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{UnitQuaternion, Vector3};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A read/write foot target of an external IK solver.
pub trait IkEndpoint {
    /// Current target position in the world frame.
    fn position_m(&self) -> Vector3<f64>;

    /// Set the target position in the world frame.
    fn set_position_m(&mut self, position_m: Vector3<f64>);

    /// Current target attitude in the world frame.
    fn attitude_q(&self) -> UnitQuaternion<f64>;

    /// Set the target attitude in the world frame.
    fn set_attitude_q(&mut self, attitude_q: UnitQuaternion<f64>);

    /// Position of the tip of the limb's bone chain, or `None` if the chain is not yet available.
    fn tip_position_m(&self) -> Option<Vector3<f64>>;
}
