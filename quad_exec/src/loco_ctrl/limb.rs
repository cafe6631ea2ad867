//! Per-limb state
//!
//! A limb wraps the IK endpoint of one foot together with its last stable (planted) position and
//! the two geometric constants measured when the controller attaches to the skeleton.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::ik::IkEndpoint;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use util::maths::{planar_norm, yaw_between};

use super::{BodyPose, LocoCtrlError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Description of a limb given to the controller at initialisation.
pub struct LimbSpec {
    pub side: LimbSide,
    pub endpoint: Box<dyn IkEndpoint>,
}

/// A limb under the control of LocoCtrl.
pub struct Limb {
    id: usize,
    side: LimbSide,
    endpoint: Box<dyn IkEndpoint>,

    /// Last known ground contact position
    stable_position_m: Vector3<f64>,

    /// Offset of the limb's initial position from the core
    default_offset_m: Vector3<f64>,

    /// Signed planar angle from the core's forward axis to `default_offset_m`
    reference_angle_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The side of the body a limb is attached to.
///
/// Left limbs sit on the body's +X side.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum LimbSide {
    Left,
    Right,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LimbSide {
    /// +1 for left limbs, -1 for right limbs.
    pub fn sign(&self) -> f64 {
        match self {
            LimbSide::Left => 1.0,
            LimbSide::Right => -1.0,
        }
    }
}

impl Limb {
    /// Attach to a limb, placing its endpoint on the tip of the bone chain and measuring its
    /// offset from the core.
    pub fn new(id: usize, spec: LimbSpec, core: &BodyPose) -> Result<Self, LocoCtrlError> {
        let LimbSpec { side, mut endpoint } = spec;

        let tip_m = endpoint
            .tip_position_m()
            .ok_or(LocoCtrlError::TipNotReady(id))?;
        endpoint.set_position_m(tip_m);

        let default_offset_m = tip_m - core.position_m;
        let reference_angle_rad = yaw_between(&core.forward(), &default_offset_m);

        Ok(Self {
            id,
            side,
            endpoint,
            stable_position_m: tip_m,
            default_offset_m,
            reference_angle_rad,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn side(&self) -> LimbSide {
        self.side
    }

    /// Current target position of the foot.
    pub fn position_m(&self) -> Vector3<f64> {
        self.endpoint.position_m()
    }

    pub fn set_position_m(&mut self, position_m: Vector3<f64>) {
        self.endpoint.set_position_m(position_m)
    }

    /// Last known ground contact position of the foot.
    pub fn stable_position_m(&self) -> Vector3<f64> {
        self.stable_position_m
    }

    /// Mark the foot as planted at its current position.
    pub fn mark_stable(&mut self) {
        self.stable_position_m = self.endpoint.position_m();
    }

    /// Seed the stable position, for instance with a rest pose.
    pub fn set_stable_position_m(&mut self, position_m: Vector3<f64>) {
        self.stable_position_m = position_m;
    }

    pub fn default_offset_m(&self) -> Vector3<f64> {
        self.default_offset_m
    }

    /// Horizontal distance of the foot from the core at rest.
    pub fn rest_radius_m(&self) -> f64 {
        planar_norm(&self.default_offset_m)
    }

    pub fn reference_angle_rad(&self) -> f64 {
        self.reference_angle_rad
    }
}

impl std::fmt::Debug for Limb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Limb")
            .field("id", &self.id)
            .field("side", &self.side)
            .field("position_m", &self.position_m())
            .field("stable_position_m", &self.stable_position_m)
            .field("reference_angle_rad", &self.reference_angle_rad)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::SimEndpoint;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn test_limb_constants() {
        let core = BodyPose::new(Vector3::new(0.0, 1.0, 0.0), UnitQuaternion::identity());
        let spec = LimbSpec {
            side: LimbSide::Left,
            endpoint: Box::new(SimEndpoint::with_tip(Vector3::new(1.0, 0.0, 1.0))),
        };

        let limb = Limb::new(0, spec, &core).unwrap();

        assert_eq!(limb.position_m(), Vector3::new(1.0, 0.0, 1.0));
        assert_eq!(limb.stable_position_m(), limb.position_m());
        assert_relative_eq!(limb.reference_angle_rad(), FRAC_PI_4, epsilon = 1e-12);
        assert_relative_eq!(limb.rest_radius_m(), 2f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_tip_not_ready() {
        let core = BodyPose::new(Vector3::zeros(), UnitQuaternion::identity());
        let spec = LimbSpec {
            side: LimbSide::Right,
            endpoint: Box::new(SimEndpoint::default()),
        };

        assert!(matches!(
            Limb::new(3, spec, &core),
            Err(LocoCtrlError::TipNotReady(3))
        ));
    }

    #[test]
    fn test_mark_stable_only_on_request() {
        let core = BodyPose::new(Vector3::zeros(), UnitQuaternion::identity());
        let spec = LimbSpec {
            side: LimbSide::Left,
            endpoint: Box::new(SimEndpoint::with_tip(Vector3::new(0.5, 0.0, 0.5))),
        };
        let mut limb = Limb::new(0, spec, &core).unwrap();

        limb.set_position_m(Vector3::new(0.5, 0.2, 1.0));
        assert_eq!(limb.stable_position_m(), Vector3::new(0.5, 0.0, 0.5));

        limb.mark_stable();
        assert_eq!(limb.stable_position_m(), Vector3::new(0.5, 0.2, 1.0));
    }
}
