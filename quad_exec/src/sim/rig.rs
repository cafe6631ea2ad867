//! Simulated quadruped rig
//!
//! A box-shaped body with a foot at each corner. Limbs are ordered front left, front right, hind
//! left, hind right, with the left side on the body's +X axis.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use super::SimEndpoint;
use crate::loco_ctrl::{BodyPose, Limb, LimbSide, LimbSpec, LocoCtrlError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Geometry of the rig.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RigParams {
    /// Height of the core above the feet.
    ///
    /// Units: meters
    pub body_height_m: f64,

    /// Lateral distance of the feet from the core.
    ///
    /// Units: meters
    pub half_width_m: f64,

    /// Longitudinal distance of the feet from the core.
    ///
    /// Units: meters
    pub half_length_m: f64,

    /// Initial height of the feet.
    ///
    /// Units: meters
    pub ground_height_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RigParams {
    fn default() -> Self {
        Self {
            body_height_m: 1.0,
            half_width_m: 0.6,
            half_length_m: 0.8,
            ground_height_m: 0.0,
        }
    }
}

impl RigParams {
    pub fn core_position_m(&self) -> Vector3<f64> {
        Vector3::new(0.0, self.ground_height_m + self.body_height_m, 0.0)
    }

    /// Pose of the core facing the world's +Z axis.
    pub fn core_pose(&self) -> BodyPose {
        BodyPose::new(self.core_position_m(), UnitQuaternion::identity())
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the limb descriptions for the rig.
pub fn quadruped_limb_specs(rig: &RigParams) -> Vec<LimbSpec> {
    let corners = [
        (LimbSide::Left, 1.0),
        (LimbSide::Right, 1.0),
        (LimbSide::Left, -1.0),
        (LimbSide::Right, -1.0),
    ];

    corners
        .iter()
        .map(|&(side, fore)| LimbSpec {
            side,
            endpoint: Box::new(SimEndpoint::with_tip(Vector3::new(
                side.sign() * rig.half_width_m,
                rig.ground_height_m,
                fore * rig.half_length_m,
            ))),
        })
        .collect()
}

/// Build the rig's limbs attached to the given core.
pub fn quadruped_limbs(rig: &RigParams, core: &BodyPose) -> Result<Vec<Limb>, LocoCtrlError> {
    quadruped_limb_specs(rig)
        .into_iter()
        .enumerate()
        .map(|(i, s)| Limb::new(i, s, core))
        .collect()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rig_layout() {
        let rig = RigParams::default();
        let limbs = quadruped_limbs(&rig, &rig.core_pose()).unwrap();

        assert_eq!(limbs.len(), 4);

        // Front limbs ahead, left limbs on +X
        assert!(limbs[0].position_m().z > 0.0 && limbs[1].position_m().z > 0.0);
        assert!(limbs[2].position_m().z < 0.0 && limbs[3].position_m().z < 0.0);
        for l in limbs.iter() {
            assert_eq!(l.position_m().x > 0.0, l.side() == LimbSide::Left);
            assert_relative_eq!(l.rest_radius_m(), 1.0, epsilon = 1e-12);
        }

        // Reference angles mirror across the body
        assert_relative_eq!(
            limbs[0].reference_angle_rad(),
            -limbs[1].reference_angle_rad(),
            epsilon = 1e-12
        );
    }
}
