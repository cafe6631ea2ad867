//! Rest pose solver
//!
//! The rest position of a limb for a heading is where the foot would stand if the body were at
//! rest facing that heading: the limb's initial offset from the core, rotated to the heading and
//! dropped onto the ground.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::probe::GroundProbe;
use nalgebra::Vector3;
use util::maths::{planar_direction, planar_yaw};

use super::{Limb, Params};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the rest position of a limb for the given heading.
///
/// The heading need not be normalised. If the ground probe finds no contact the limb's current
/// position is returned.
pub fn rest_position(
    limb: &Limb,
    core_position_m: &Vector3<f64>,
    heading: &Vector3<f64>,
    probe: &dyn GroundProbe,
    params: &Params,
) -> Vector3<f64> {
    let psi_rad = limb.reference_angle_rad() + planar_yaw(heading);

    let origin_m = core_position_m
        + planar_direction(psi_rad) * limb.rest_radius_m()
        + Vector3::y() * params.probe_clearance_m;

    match probe.probe(
        &origin_m,
        &-Vector3::y(),
        params.probe_max_distance_m,
        params.ground_layers,
    ) {
        Some(hit) => hit.point_m,
        None => limb.position_m(),
    }
}

/// Get the rest positions of all limbs for the given heading.
pub fn rest_pose(
    limbs: &[Limb],
    core_position_m: &Vector3<f64>,
    heading: &Vector3<f64>,
    probe: &dyn GroundProbe,
    params: &Params,
) -> Vec<Vector3<f64>> {
    limbs
        .iter()
        .map(|l| rest_position(l, core_position_m, heading, probe, params))
        .collect()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::loco_ctrl::{BodyPose, LimbSide, LimbSpec};
    use crate::sim::{FlatGround, PerlinGround, SimEndpoint};
    use approx::assert_relative_eq;
    use comms_if::eqpt::probe::{LayerMask, ProbeHit};
    use nalgebra::UnitQuaternion;

    struct NoGround;

    impl GroundProbe for NoGround {
        fn probe(
            &self,
            _: &Vector3<f64>,
            _: &Vector3<f64>,
            _: f64,
            _: LayerMask,
        ) -> Option<ProbeHit> {
            None
        }
    }

    fn limb_at(tip: Vector3<f64>) -> Limb {
        let core = BodyPose::new(Vector3::new(0.0, 1.0, 0.0), UnitQuaternion::identity());
        Limb::new(
            0,
            LimbSpec {
                side: LimbSide::Left,
                endpoint: Box::new(SimEndpoint::with_tip(tip)),
            },
            &core,
        )
        .unwrap()
    }

    #[test]
    fn test_rest_position_rotates_with_heading() {
        let limb = limb_at(Vector3::new(0.5, 0.0, 1.0));
        let ground = FlatGround::new(0.0);
        let params = Params::default();
        let core = Vector3::new(0.0, 1.0, 0.0);

        // Facing the reference axis gives back the initial position
        let p = rest_position(&limb, &core, &Vector3::z(), &ground, &params);
        assert_relative_eq!(p, Vector3::new(0.5, 0.0, 1.0), epsilon = 1e-9);

        // Facing +X rotates the offset a quarter turn, heading magnitude is ignored
        let p = rest_position(&limb, &core, &Vector3::new(3.0, 0.0, 0.0), &ground, &params);
        assert_relative_eq!(p, Vector3::new(1.0, 0.0, -0.5), epsilon = 1e-9);
    }

    #[test]
    fn test_rest_position_is_pure() {
        let limb = limb_at(Vector3::new(-0.4, 0.0, -0.9));
        let ground = PerlinGround::new(7, 0.3, 4.0, 0.0);
        let params = Params::default();
        let core = Vector3::new(0.2, 1.0, 0.1);
        let heading = Vector3::new(0.3, 0.0, -0.8);

        let first = rest_position(&limb, &core, &heading, &ground, &params);
        for _ in 0..10 {
            assert_eq!(rest_position(&limb, &core, &heading, &ground, &params), first);
        }
    }

    #[test]
    fn test_rest_position_no_contact() {
        let mut limb = limb_at(Vector3::new(0.5, 0.0, 1.0));
        limb.set_position_m(Vector3::new(2.0, 0.3, 2.0));

        let p = rest_position(
            &limb,
            &Vector3::zeros(),
            &Vector3::x(),
            &NoGround,
            &Params::default(),
        );
        assert_eq!(p, Vector3::new(2.0, 0.3, 2.0));
    }
}
