//! Simulated IK endpoint
//!
//! Holds the foot target in the world frame. There is no solver behind it, the target is taken to
//! be reached immediately.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::ik::IkEndpoint;
use nalgebra::{UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimEndpoint {
    position_m: Vector3<f64>,
    attitude_q: UnitQuaternion<f64>,

    /// Tip of the bone chain, `None` until the chain is built
    tip_m: Option<Vector3<f64>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimEndpoint {
    /// An endpoint whose bone chain ends at `tip_m`.
    pub fn with_tip(tip_m: Vector3<f64>) -> Self {
        Self {
            tip_m: Some(tip_m),
            ..Default::default()
        }
    }
}

impl Default for SimEndpoint {
    fn default() -> Self {
        Self {
            position_m: Vector3::zeros(),
            attitude_q: UnitQuaternion::identity(),
            tip_m: None,
        }
    }
}

impl IkEndpoint for SimEndpoint {
    fn position_m(&self) -> Vector3<f64> {
        self.position_m
    }

    fn set_position_m(&mut self, position_m: Vector3<f64>) {
        self.position_m = position_m;
    }

    fn attitude_q(&self) -> UnitQuaternion<f64> {
        self.attitude_q
    }

    fn set_attitude_q(&mut self, attitude_q: UnitQuaternion<f64>) {
        self.attitude_q = attitude_q;
    }

    fn tip_position_m(&self) -> Option<Vector3<f64>> {
        self.tip_m
    }
}
