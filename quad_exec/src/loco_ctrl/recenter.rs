//! Turn-in-place recentering
//!
//! A recenter turns the body to face a target heading without walking. The turn is split into
//! fixed-size sub-steps, each with its own rest pose (a waypoint). For each waypoint the feet are
//! moved in two passes, even limbs first and then all limbs, with each pair of limbs starting a
//! little after the previous one. Once the last waypoint is reached the feet are brought onto
//! their stable positions and snapped there.
//!
//! The recenter is advanced once per cycle by [`Recenter::step`], which reports progress through
//! [`RecenterStatus`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::probe::GroundProbe;
use log::debug;
use nalgebra::Vector3;
use util::maths::{move_towards, planar_direction, planar_norm, planar_yaw, yaw_between};

use super::{rest_pose, Limb, Params};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Slack when dividing a turn into sub-steps, so that an exact multiple of the sub-step angle is
/// not lost to rounding.
const SUBSTEP_SLACK_RAD: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An intermediate rest pose of a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    /// Heading the body faces at this waypoint
    pub heading: Vector3<f64>,

    /// Rest position of each limb for the heading
    pub positions_m: Vec<Vector3<f64>>,
}

/// An in-flight turn towards a target heading.
#[derive(Debug, Clone)]
pub struct Recenter {
    target: Vector3<f64>,
    waypoints: Vec<Waypoint>,
    stage: Stage,
    pass: Pass,

    /// Time since the start of the current pass
    pass_time_s: f64,

    /// Movement request generation this recenter was started under
    generation: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Progress of a recenter after one step.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RecenterStatus {
    /// Feet are still moving
    Moving,

    /// A waypoint has been reached, the body now faces the given heading
    WaypointReached(Vector3<f64>),

    /// The feet are on their stable positions, the body faces the target heading
    Aligned(Vector3<f64>),

    /// Movement was cancelled, the turn ended at the given heading
    Aborted(Vector3<f64>),
}

/// Which part of the turn is being executed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Stage {
    /// Moving towards a waypoint
    Waypoint(usize),

    /// Moving towards the stable positions
    Final,
}

/// Which limbs move in a pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Pass {
    /// Even limbs only
    Even,

    /// All limbs
    All,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Recenter {
    /// Plan a turn from the body's current `forward` axis to `target`.
    ///
    /// The limbs' stable positions should already have been seeded with the rest pose for the
    /// target.
    pub fn plan(
        forward: &Vector3<f64>,
        target: &Vector3<f64>,
        limbs: &[Limb],
        core_position_m: &Vector3<f64>,
        probe: &dyn GroundProbe,
        params: &Params,
        generation: u64,
    ) -> Self {
        let turn_rad = yaw_between(forward, target);

        let num_waypoints = if params.turn_substeps_enabled {
            ((turn_rad.abs() + SUBSTEP_SLACK_RAD) / params.turn_substep_angle_rad).floor() as usize
        } else {
            0
        };

        let start_yaw_rad = planar_yaw(target) - turn_rad;
        let step_rad = params.turn_substep_angle_rad * turn_rad.signum();

        let waypoints: Vec<Waypoint> = (1..=num_waypoints)
            .map(|i| {
                let heading = planar_direction(start_yaw_rad + i as f64 * step_rad);
                let positions_m = rest_pose(limbs, core_position_m, &heading, probe, params);
                Waypoint {
                    heading,
                    positions_m,
                }
            })
            .collect();

        debug!(
            "Recenter planned: turn of {:.3} rad in {} waypoints",
            turn_rad,
            waypoints.len()
        );

        let stage = if waypoints.is_empty() {
            Stage::Final
        } else {
            Stage::Waypoint(0)
        };

        Self {
            target: *target,
            waypoints,
            stage,
            pass: Pass::Even,
            pass_time_s: 0.0,
            generation,
        }
    }

    /// Heading this recenter finishes on.
    pub fn target(&self) -> Vector3<f64> {
        self.target
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn pass(&self) -> Pass {
        self.pass
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Advance the recenter by one cycle.
    ///
    /// `cancelled` is checked only when a waypoint is reached. A cancelled recenter ends at that
    /// waypoint, the final move onto the stable positions always completes.
    pub fn step(
        &mut self,
        limbs: &mut [Limb],
        cancelled: bool,
        params: &Params,
        dt_s: f64,
    ) -> RecenterStatus {
        let targets_m: Vec<Vector3<f64>> = match self.stage {
            Stage::Waypoint(i) => self.waypoints[i].positions_m.clone(),
            Stage::Final => limbs.iter().map(|l| l.stable_position_m()).collect(),
        };

        let max_delta_m = params.recenter_speed_ms() * dt_s;
        let mut settled = true;

        for (i, (limb, target_m)) in limbs.iter_mut().zip(targets_m.iter()).enumerate() {
            if !self.pass.includes(i) {
                continue;
            }

            if self.pass_time_s >= (i / 2) as f64 * params.recenter_stagger_s {
                let next_m = approach(&limb.position_m(), target_m, max_delta_m, params);
                limb.set_position_m(next_m);
            }

            settled &= (limb.position_m() - target_m).norm() <= params.arrival_tolerance_m;
        }

        self.pass_time_s += dt_s;

        if !settled {
            return RecenterStatus::Moving;
        }

        self.pass_time_s = 0.0;

        if self.pass == Pass::Even {
            self.pass = Pass::All;
            return RecenterStatus::Moving;
        }
        self.pass = Pass::Even;

        match self.stage {
            Stage::Waypoint(i) => {
                let heading = self.waypoints[i].heading;

                if cancelled {
                    debug!("Recenter cancelled at waypoint {}", i);
                    return RecenterStatus::Aborted(heading);
                }

                self.stage = if i + 1 < self.waypoints.len() {
                    Stage::Waypoint(i + 1)
                } else {
                    Stage::Final
                };

                RecenterStatus::WaypointReached(heading)
            }
            Stage::Final => {
                for limb in limbs.iter_mut() {
                    let stable_m = limb.stable_position_m();
                    limb.set_position_m(stable_m);
                }

                RecenterStatus::Aligned(self.target)
            }
        }
    }
}

impl Pass {
    /// True if the limb moves during this pass.
    pub fn includes(&self, limb_index: usize) -> bool {
        match self {
            Pass::Even => limb_index % 2 == 0,
            Pass::All => true,
        }
    }
}

impl RecenterStatus {
    /// True if the recenter has ended.
    pub fn is_done(&self) -> bool {
        matches!(self, RecenterStatus::Aligned(_) | RecenterStatus::Aborted(_))
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Move a foot towards its target, lifting it while it is still far away.
fn approach(
    position_m: &Vector3<f64>,
    target_m: &Vector3<f64>,
    max_delta_m: f64,
    params: &Params,
) -> Vector3<f64> {
    let lifted_m = target_m + Vector3::y() * params.recenter_lift_m;

    if planar_norm(&(position_m - target_m)) > params.recenter_lift_threshold_m
        && position_m.y < lifted_m.y
    {
        move_towards(position_m, &lifted_m, max_delta_m)
    } else {
        move_towards(position_m, target_m, max_delta_m)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::loco_ctrl::{rest_pose, BodyPose};
    use crate::sim::{quadruped_limbs, FlatGround, RigParams};
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_6, PI};

    const DT: f64 = 0.02;

    fn setup(target: &Vector3<f64>) -> (Vec<Limb>, Vector3<f64>, FlatGround, Params) {
        let rig = RigParams::default();
        let body = BodyPose::new(rig.core_position_m(), UnitQuaternion::identity());
        let mut limbs = quadruped_limbs(&rig, &body).unwrap();
        let ground = FlatGround::new(0.0);
        let params = Params::default();

        let stable = rest_pose(&limbs, &body.position_m, target, &ground, &params);
        for (l, s) in limbs.iter_mut().zip(stable) {
            l.set_stable_position_m(s);
        }

        (limbs, body.position_m, ground, params)
    }

    fn run_to_end(
        recenter: &mut Recenter,
        limbs: &mut [Limb],
        params: &Params,
        cancelled: bool,
    ) -> (RecenterStatus, Vec<Vector3<f64>>) {
        let mut reached = Vec::new();

        for _ in 0..100_000 {
            let status = recenter.step(limbs, cancelled, params, DT);
            if status.is_done() {
                return (status, reached);
            }
            if let RecenterStatus::WaypointReached(h) = status {
                reached.push(h);
            }
        }

        panic!("Recenter did not finish");
    }

    #[test]
    fn test_status_done() {
        let h = Vector3::z();

        assert!(!RecenterStatus::Moving.is_done());
        assert!(!RecenterStatus::WaypointReached(h).is_done());
        assert!(RecenterStatus::Aligned(h).is_done());
        assert!(RecenterStatus::Aborted(h).is_done());
    }

    #[test]
    fn test_quarter_turn_waypoints() {
        let target = Vector3::x();
        let (mut limbs, core, ground, params) = setup(&target);

        let mut recenter = Recenter::plan(&Vector3::z(), &target, &limbs, &core, &ground, &params, 0);

        let yaws: Vec<f64> = recenter.waypoints().iter().map(|w| planar_yaw(&w.heading)).collect();
        assert_eq!(yaws.len(), 3);
        assert_relative_eq!(yaws[0], FRAC_PI_6, epsilon = 1e-9);
        assert_relative_eq!(yaws[1], 2.0 * FRAC_PI_6, epsilon = 1e-9);
        assert_relative_eq!(yaws[2], FRAC_PI_2, epsilon = 1e-9);

        let (status, reached) = run_to_end(&mut recenter, &mut limbs, &params, false);

        assert_eq!(reached.len(), 3);
        match status {
            RecenterStatus::Aligned(h) => assert_relative_eq!(h, target),
            s => panic!("Unexpected status {:?}", s),
        }
        for l in limbs.iter() {
            assert_eq!(l.position_m(), l.stable_position_m());
        }
    }

    #[test]
    fn test_negative_turn() {
        let target = planar_direction(-0.8 * PI);
        let (mut limbs, core, ground, params) = setup(&target);

        let mut recenter = Recenter::plan(&Vector3::z(), &target, &limbs, &core, &ground, &params, 0);
        let yaws: Vec<f64> = recenter.waypoints().iter().map(|w| planar_yaw(&w.heading)).collect();

        // 144 degrees to the right is four 30 degree steps
        assert_eq!(yaws.len(), 4);
        for (i, y) in yaws.iter().enumerate() {
            assert_relative_eq!(*y, -((i + 1) as f64) * FRAC_PI_6, epsilon = 1e-9);
        }

        let (status, _) = run_to_end(&mut recenter, &mut limbs, &params, false);
        assert!(matches!(status, RecenterStatus::Aligned(_)));
    }

    #[test]
    fn test_aligned_has_no_waypoints() {
        let target = Vector3::z();
        let (mut limbs, core, ground, params) = setup(&target);

        let mut recenter = Recenter::plan(&Vector3::z(), &target, &limbs, &core, &ground, &params, 0);
        assert!(recenter.waypoints().is_empty());
        assert_eq!(recenter.stage(), Stage::Final);

        let (status, reached) = run_to_end(&mut recenter, &mut limbs, &params, false);
        assert!(reached.is_empty());
        assert!(matches!(status, RecenterStatus::Aligned(_)));
    }

    #[test]
    fn test_substeps_disabled() {
        let target = Vector3::x();
        let (mut limbs, core, ground, mut params) = setup(&target);
        params.turn_substeps_enabled = false;

        let mut recenter = Recenter::plan(&Vector3::z(), &target, &limbs, &core, &ground, &params, 0);
        assert!(recenter.waypoints().is_empty());

        let (status, _) = run_to_end(&mut recenter, &mut limbs, &params, false);
        assert!(matches!(status, RecenterStatus::Aligned(_)));
        for l in limbs.iter() {
            assert_eq!(l.position_m(), l.stable_position_m());
        }
    }

    #[test]
    fn test_cancel_stops_at_waypoint() {
        let target = Vector3::x();
        let (mut limbs, core, ground, params) = setup(&target);

        let mut recenter = Recenter::plan(&Vector3::z(), &target, &limbs, &core, &ground, &params, 0);
        let first = recenter.waypoints()[0].clone();

        let (status, reached) = run_to_end(&mut recenter, &mut limbs, &params, true);

        assert!(reached.is_empty());
        match status {
            RecenterStatus::Aborted(h) => assert_relative_eq!(h, first.heading),
            s => panic!("Unexpected status {:?}", s),
        }

        // Feet stay on the waypoint rather than snapping to the stable positions
        for (l, p) in limbs.iter().zip(first.positions_m.iter()) {
            assert_relative_eq!(l.position_m(), *p, epsilon = params.arrival_tolerance_m);
        }
    }

    #[test]
    fn test_passes_are_interleaved() {
        let target = Vector3::z();
        let (mut limbs, core, ground, params) = setup(&target);

        // Displace all feet so that every limb has to move
        for l in limbs.iter_mut() {
            let p = l.position_m();
            l.set_position_m(p + Vector3::new(0.0, 0.0, -0.3));
        }
        let start: Vec<_> = limbs.iter().map(|l| l.position_m()).collect();

        let mut recenter = Recenter::plan(&Vector3::z(), &target, &limbs, &core, &ground, &params, 0);

        // First tick: only limb 0 may move, limb 2 is staggered and odd limbs wait for their pass
        recenter.step(&mut limbs, false, &params, DT);
        assert_ne!(limbs[0].position_m(), start[0]);
        assert_eq!(limbs[1].position_m(), start[1]);
        assert_eq!(limbs[2].position_m(), start[2]);
        assert_eq!(limbs[3].position_m(), start[3]);

        // Run until the even pass is done, odd limbs still untouched
        while recenter.pass() == Pass::Even {
            recenter.step(&mut limbs, false, &params, DT);
        }
        assert_eq!(limbs[0].position_m(), limbs[0].stable_position_m());
        assert_eq!(limbs[2].position_m(), limbs[2].stable_position_m());
        assert_eq!(limbs[1].position_m(), start[1]);
        assert_eq!(limbs[3].position_m(), start[3]);
    }

    #[test]
    fn test_feet_lift_while_far() {
        let target = Vector3::z();
        let (mut limbs, core, ground, params) = setup(&target);

        let p = limbs[0].position_m();
        limbs[0].set_position_m(p + Vector3::new(0.0, 0.0, -1.0));

        let mut recenter = Recenter::plan(&Vector3::z(), &target, &limbs, &core, &ground, &params, 0);
        recenter.step(&mut limbs, false, &params, DT);

        assert!(limbs[0].position_m().y > 0.0);
    }
}
