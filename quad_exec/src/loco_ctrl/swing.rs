//! Swing trajectory synthesis
//!
//! A swing moves a foot from its stable position towards a landing point found ahead of it. The
//! straight-line step is expressed relative to the body's forward axis, shaped by the step curves
//! and turned back into the world frame.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::probe::GroundProbe;
use nalgebra::Vector3;
use util::maths::{planar_norm, planar_yaw, wrap_pi};

use super::{CurveSample, Params};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Planar magnitude below which a vector has no meaningful yaw.
const DEGENERATE_PLANAR_M: f64 = 1e-9;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The kind of step being taken.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StepKind {
    /// A full stride
    Full,

    /// A half stride, used to stagger the feet before walking
    Offset,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Find where a foot planted at `reference_m` should land when stepping along `forward`.
///
/// Returns `None` if there is no ground under the landing point, or if the landing point is
/// higher than the maximum step height above the reference.
pub fn find_landing(
    reference_m: &Vector3<f64>,
    forward: &Vector3<f64>,
    kind: StepKind,
    probe: &dyn GroundProbe,
    params: &Params,
) -> Option<Vector3<f64>> {
    let stride_m = match kind {
        StepKind::Full => params.stride_length_m,
        StepKind::Offset => params.stride_length_m / 2.0,
    };

    let origin_m = reference_m + forward * stride_m + Vector3::y() * params.probe_clearance_m;

    let hit = probe.probe(
        &origin_m,
        &-Vector3::y(),
        params.probe_max_distance_m,
        params.ground_layers,
    )?;

    if hit.point_m.y - reference_m.y > params.max_step_height_m {
        None
    } else {
        Some(hit.point_m)
    }
}

/// Shape a straight-line world step with the curve sample, returning the animated world step.
///
/// With a neutral sample (progress of one and zero offset) the world step is returned unchanged.
pub fn animate_step(
    world_step_m: &Vector3<f64>,
    forward: &Vector3<f64>,
    sample: &CurveSample,
) -> Vector3<f64> {
    // Express the step relative to forward
    let step_mag_m = planar_norm(world_step_m);
    let step_angle_rad = yaw_offset(forward, world_step_m);
    let local_step_m = Vector3::new(
        step_angle_rad.sin() * step_mag_m,
        world_step_m.y,
        step_angle_rad.cos() * step_mag_m,
    );

    // Apply the curves
    let animated_local_m = local_step_m.component_mul(&sample.progress) + sample.offset;

    // Rotate back into the world frame
    let animated_mag_m = planar_norm(&animated_local_m);
    let animation_angle_rad = yaw_offset(&local_step_m, &animated_local_m);
    let forward_angle_rad = planar_yaw(forward);
    let total_angle_rad = wrap_pi(step_angle_rad + animation_angle_rad + forward_angle_rad);

    Vector3::new(
        total_angle_rad.sin() * animated_mag_m,
        animated_local_m.y,
        total_angle_rad.cos() * animated_mag_m,
    )
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Yaw from `from` to `to`, or zero if either has no planar extent.
fn yaw_offset(from: &Vector3<f64>, to: &Vector3<f64>) -> f64 {
    if planar_norm(from) < DEGENERATE_PLANAR_M || planar_norm(to) < DEGENERATE_PLANAR_M {
        0.0
    } else {
        wrap_pi(planar_yaw(to) - planar_yaw(from))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::loco_ctrl::{LimbSide, StepCurves};
    use crate::sim::{FlatGround, StepGround};
    use approx::assert_relative_eq;
    use util::maths::planar_direction;

    fn neutral() -> CurveSample {
        CurveSample {
            progress: Vector3::new(1.0, 1.0, 1.0),
            offset: Vector3::zeros(),
        }
    }

    #[test]
    fn test_neutral_sample_keeps_step() {
        let sample = neutral();

        for &stride in [0.1, 0.75, 2.5].iter() {
            for i in 0..12 {
                let forward = planar_direction(i as f64 * 0.55 - 3.0);
                for j in 0..8 {
                    let step = planar_direction(j as f64 * 0.8 - 3.1) * stride
                        + Vector3::y() * (0.1 * j as f64 - 0.3);

                    assert_relative_eq!(
                        animate_step(&step, &forward, &sample),
                        step,
                        epsilon = 1e-9
                    );
                }
            }
        }
    }

    #[test]
    fn test_default_curves_start_and_end_neutral() {
        let curves = StepCurves::default();

        for i in 0..8 {
            let forward = planar_direction(i as f64 * 0.8);
            let step = forward * 1.3 + Vector3::y() * 0.2;

            for &side in [LimbSide::Left, LimbSide::Right].iter() {
                let start = animate_step(&step, &forward, &curves.sample(0.0, side));
                let end = animate_step(&step, &forward, &curves.sample(1.0, side));

                assert_relative_eq!(start, Vector3::zeros(), epsilon = 1e-9);
                assert_relative_eq!(end, step, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_mid_swing_lifts_and_splays() {
        let curves = StepCurves::default();
        let forward = Vector3::z();
        let step = forward * 1.0;

        let left = animate_step(&step, &forward, &curves.sample(0.5, LimbSide::Left));
        let right = animate_step(&step, &forward, &curves.sample(0.5, LimbSide::Right));

        assert!(left.y > 0.3);
        assert!(left.x > 0.0);
        assert!(right.x < 0.0);
        assert_relative_eq!(left.z, right.z, epsilon = 1e-12);
    }

    #[test]
    fn test_find_landing() {
        let params = Params::default();
        let ground = FlatGround::new(0.0);
        let reference = Vector3::new(1.0, 0.0, 0.0);

        let full = find_landing(&reference, &Vector3::x(), StepKind::Full, &ground, &params);
        assert_relative_eq!(full.unwrap(), Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-9);

        let half = find_landing(&reference, &Vector3::x(), StepKind::Offset, &ground, &params);
        assert_relative_eq!(half.unwrap(), Vector3::new(1.5, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_find_landing_rejects_high_step() {
        let params = Params::default();
        let reference = Vector3::zeros();

        // A ledge lower than the max step height can be climbed
        let low = StepGround::new(0.0, 0.4, 0.5);
        assert!(find_landing(&reference, &Vector3::z(), StepKind::Full, &low, &params).is_some());

        // A higher one cannot
        let high = StepGround::new(0.0, 0.6, 0.5);
        assert!(find_landing(&reference, &Vector3::z(), StepKind::Full, &high, &params).is_none());

        // Stepping down is always allowed
        let down = StepGround::new(0.0, -2.0, 0.5);
        assert!(find_landing(&reference, &Vector3::z(), StepKind::Full, &down, &params).is_some());
    }
}
